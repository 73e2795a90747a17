//! Dominator sets as a forward data flow problem.
//!
//! Block A dominates block B if every path from `Entry` to B passes through
//! A. Every block dominates itself.
//!
//! - `DOM[Entry]` = {Entry}
//! - `DOM[B]` = {B} ∪ ∩{DOM[P] | P is a predecessor of B}
//!
//! Every block starts at "all live blocks" so the intersection converges
//! from above. Sets are indexed by the raw [`BlockId`] over the block arena.

use crate::{
    analysis::dataflow::{
        framework::{DataFlowAnalysis, Direction, Meet},
        solver::DataFlowSolver,
    },
    ir::{AnalysisState, BlockFacts, BlockId},
    utils::BitSet,
    Result,
};

/// Dominator sets over the block arena.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dominators;

impl DataFlowAnalysis for Dominators {
    const DIRECTION: Direction = Direction::Forward;
    const MEET: Meet = Meet::Intersection;

    fn name(&self) -> &'static str {
        "dominators"
    }

    fn universe(&self, state: &AnalysisState) -> usize {
        state.block_capacity()
    }

    fn boundary(&self, state: &AnalysisState, universe: usize) -> BitSet {
        let mut set = BitSet::new(universe);
        set.insert(state.entry().index());
        set
    }

    fn initial(&self, state: &AnalysisState, _block: BlockId, _universe: usize) -> Result<BitSet> {
        Ok(state.live_blocks())
    }

    fn transfer(&self, _state: &AnalysisState, block: BlockId, input: &BitSet) -> Result<BitSet> {
        let mut out = input.clone();
        out.set(block.index(), true)?;
        Ok(out)
    }

    fn store(&self, facts: &mut BlockFacts, _in_set: BitSet, out_set: BitSet) {
        facts.dom = out_set;
    }
}

/// Computes `dom` for every block.
///
/// Does not depend on the local sets, only on the block graph.
///
/// # Errors
///
/// Returns [`crate::Error::InvariantViolation`] for a dangling handle.
pub fn compute_dominators(state: &mut AnalysisState) -> Result<usize> {
    let sweeps = DataFlowSolver::new(Dominators).solve_into(state)?;
    state.mark_dominators_current();
    Ok(sweeps)
}

/// Returns `true` if `a` dominates `b` according to the stored `dom` sets.
///
/// # Errors
///
/// Returns [`crate::Error::InvariantViolation`] if `b` is dangling, its
/// `dom` set does not cover `a`, or the block graph changed since the
/// dominators were computed.
pub fn dominates(state: &AnalysisState, a: BlockId, b: BlockId) -> Result<bool> {
    if !state.dominators_current() {
        return Err(invariant_error!("dominators are stale"));
    }
    state.block(b)?.facts().dom.get(a.index())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{counting_loop, diamond};

    #[test]
    fn test_every_block_dominates_itself() {
        let mut fixture = counting_loop();
        let state = &mut fixture.state;
        compute_dominators(state).unwrap();
        for &block in state.block_order() {
            if state.block(block).unwrap().predecessors().is_empty() && block != state.entry() {
                continue;
            }
            assert!(dominates(state, block, block).unwrap());
        }
    }

    #[test]
    fn test_meet_inclusion() {
        let mut fixture = diamond();
        let state = &mut fixture.state;
        compute_dominators(state).unwrap();
        for &block in state.block_order() {
            let bb = state.block(block).unwrap();
            let dom = &bb.facts().dom;
            for &pred in bb.predecessors() {
                let mut expected = state.block(pred).unwrap().facts().dom.clone();
                expected.insert(block.index());
                assert!(dom.is_subset(&expected).unwrap());
            }
        }
    }

    #[test]
    fn test_diamond_join_dominated_by_split_only() {
        let mut fixture = diamond();
        let state = &mut fixture.state;
        compute_dominators(state).unwrap();
        assert!(dominates(state, fixture.split, fixture.join).unwrap());
        assert!(!dominates(state, fixture.left, fixture.join).unwrap());
        assert!(!dominates(state, fixture.right, fixture.join).unwrap());
        assert!(dominates(state, state.entry(), fixture.join).unwrap());
    }

    #[test]
    fn test_loop_header_dominates_body() {
        let mut fixture = counting_loop();
        let state = &mut fixture.state;
        compute_dominators(state).unwrap();
        assert!(dominates(state, fixture.header, fixture.body).unwrap());
        assert!(!dominates(state, fixture.body, fixture.header).unwrap());
    }
}
