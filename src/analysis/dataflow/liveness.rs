//! Live variable analysis.
//!
//! A variable is live at a point if its current value may be read before it
//! is overwritten.
//!
//! # Algorithm
//!
//! For each block B:
//! - `USE[B]` = variables read in B before any write in B
//! - `DEF[B]` = variables written in B
//! - `OUT[B]` = ∪{IN[S] | S is a successor of B}
//! - `IN[B]` = USE[B] ∪ (OUT[B] - DEF[B])
//!
//! `Exit` is the boundary with an empty `IN`.

use crate::{
    analysis::dataflow::{
        framework::{DataFlowAnalysis, Direction, Meet},
        solver::DataFlowSolver,
    },
    ir::{AnalysisState, BlockFacts, BlockId},
    utils::BitSet,
    Result,
};

/// Live variables over the interned names.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveVariables;

impl DataFlowAnalysis for LiveVariables {
    const DIRECTION: Direction = Direction::Backward;
    const MEET: Meet = Meet::Union;

    fn name(&self) -> &'static str {
        "live variables"
    }

    fn universe(&self, state: &AnalysisState) -> usize {
        state.name_count()
    }

    fn initial(&self, _state: &AnalysisState, _block: BlockId, universe: usize) -> Result<BitSet> {
        Ok(BitSet::new(universe))
    }

    fn transfer(&self, state: &AnalysisState, block: BlockId, input: &BitSet) -> Result<BitSet> {
        let facts = state.block(block)?.facts();
        facts.uses.union(&input.difference(&facts.defs)?)
    }

    fn store(&self, facts: &mut BlockFacts, in_set: BitSet, out_set: BitSet) {
        facts.in_lv = in_set;
        facts.out_lv = out_set;
    }
}

/// Computes `in_lv`/`out_lv` for every block.
///
/// # Errors
///
/// Returns [`crate::Error::InvariantViolation`] if the local sets are stale.
pub fn compute_live_variables(state: &mut AnalysisState) -> Result<usize> {
    DataFlowSolver::new(LiveVariables).solve_into(state)
}
