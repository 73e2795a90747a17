//! Program analysis infrastructure for three-address code.
//!
//! This module computes the fact sets the optimizations rely on and provides
//! the structural rewrites they are built from.
//!
//! # Architecture
//!
//! The analysis module is organized into focused sub-modules:
//!
//! - [`cfg`] - block splitting and merging, preheaders, natural loops
//! - [`dataflow`] - local sets and the bit-vector fixpoint analyses
//! - `invariant` - loop-invariant computation detection
//! - `induction` - induction-variable classification
//!
//! Every analysis reads and writes the facts stored in
//! [`AnalysisState`](crate::ir::AnalysisState). Facts are only valid for the
//! IR they were computed on: after any rewrite, [`compute_local_sets`] must
//! run before any global analysis.
//!
//! # Usage
//!
//! ```rust
//! use tacflow::analysis::{
//!     compute_dominators, compute_local_sets, compute_reaching_definitions, induction_variables,
//!     natural_loops,
//! };
//! use tacflow::ir::{BinaryOp, CfgBuilder, Operand};
//!
//! let mut builder = CfgBuilder::new();
//! let (init, body, tail) = (builder.block(), builder.block(), builder.block());
//! let (i, j) = (builder.var("i"), builder.var("j"));
//! builder.assign(init, i, Operand::Const(0))?;
//! builder.label(body, "L1")?;
//! builder.compute(body, i, BinaryOp::Add, i, Operand::Const(1))?;
//! builder.compute(body, j, BinaryOp::Mul, i, Operand::Const(4))?;
//! builder.branch(body, BinaryOp::Lt, i, Operand::Const(10), "L1", "L2")?;
//! builder.label(tail, "L2")?;
//! builder.ret(tail, j)?;
//! let (entry, exit) = (builder.entry(), builder.exit());
//! builder.edge(entry, init).edge(init, body).edge(body, body).edge(body, tail).edge(tail, exit);
//! let mut state = builder.finish()?;
//!
//! compute_local_sets(&mut state)?;
//! compute_reaching_definitions(&mut state)?;
//! compute_dominators(&mut state)?;
//! let loops = natural_loops(&state)?;
//!
//! let vars = induction_variables(&state, &loops[&body])?;
//! let j = state.lookup_name("j").unwrap();
//! let record = vars.iter().find(|v| v.var == j).unwrap();
//! assert_eq!((record.c, record.d), (4, 0));
//! # Ok::<(), tacflow::Error>(())
//! ```

pub mod cfg;
pub mod dataflow;
mod induction;
mod invariant;

pub use cfg::{
    back_edges, compute_natural_loops, insert_preheader, merge_blocks, natural_loops,
    split_blocks,
};
pub use dataflow::{
    advance_reaching, compute_available_expressions, compute_dominators, compute_du_chains,
    compute_live_variables, compute_local_sets, compute_reaching_copies,
    compute_reaching_definitions, compute_sets, dominates, reaching_before, AnalysisResults,
    AvailableExpressions, DataFlowAnalysis, DataFlowSolver, DefinitionUseChains, Direction,
    Dominators, LiveVariables, Meet, ReachingCopies, ReachingDefinitions,
};
pub(crate) use induction::basic_update;
pub use induction::{compute_induction_variables, induction_variables, InductionVar};
pub use invariant::{compute_loop_invariants, loop_invariants};
