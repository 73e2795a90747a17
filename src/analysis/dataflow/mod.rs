//! Data flow analysis framework for three-address code.
//!
//! This module computes properties that propagate along control flow edges.
//! Every analysis is a bit-vector problem over one of the universes kept by
//! [`AnalysisState`](crate::ir::AnalysisState), solved by round-robin sweeps
//! in block order until nothing changes.
//!
//! # Architecture
//!
//! - [`compute_local_sets`] rebuilds the derived tables and every block's
//!   local sets (`gen`/`kill`, `uses`/`defs`, ...)
//! - [`DataFlowAnalysis`] specifies the universe, boundary, seed and transfer
//!   function of a global analysis
//! - [`DataFlowSolver`] iterates an analysis to its fixpoint and stores the
//!   result into the block facts
//!
//! # Analyses Provided
//!
//! | Analysis                  | Direction | Meet         | Facts           |
//! |---------------------------|-----------|--------------|-----------------|
//! | [`ReachingDefinitions`]   | forward   | union        | `in_rd`/`out_rd`|
//! | [`LiveVariables`]         | backward  | union        | `in_lv`/`out_lv`|
//! | [`AvailableExpressions`]  | forward   | intersection | `e_in`/`e_out`  |
//! | [`Dominators`]            | forward   | intersection | `dom`           |
//! | [`ReachingCopies`]        | forward   | intersection | `c_in`/`c_out`  |
//! | [`DefinitionUseChains`]   | backward  | union        | `du_in`/`du_out`|
//!
//! The local sets must be recomputed after any IR mutation; a global analysis
//! run against stale local sets fails with a length mismatch instead of
//! producing wrong facts.

mod available;
mod copies;
mod dominators;
mod framework;
mod liveness;
mod local;
mod reaching;
mod solver;

pub use available::{compute_available_expressions, AvailableExpressions};
pub use copies::{compute_du_chains, compute_reaching_copies, DefinitionUseChains, ReachingCopies};
pub use dominators::{compute_dominators, dominates, Dominators};
pub use framework::{AnalysisResults, DataFlowAnalysis, Direction, Meet};
pub use liveness::{compute_live_variables, LiveVariables};
pub use local::compute_local_sets;
pub use reaching::{advance_reaching, compute_reaching_definitions, reaching_before, ReachingDefinitions};
pub use solver::DataFlowSolver;

/// Runs the `SETS` bundle: local sets, reaching copies and du-chains.
///
/// # Errors
///
/// Returns [`crate::Error::InvariantViolation`] for a dangling handle or a
/// table inconsistency.
pub fn compute_sets(state: &mut crate::ir::AnalysisState) -> crate::Result<()> {
    compute_local_sets(state)?;
    compute_reaching_copies(state)?;
    compute_du_chains(state)?;
    Ok(())
}
