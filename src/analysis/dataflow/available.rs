//! Available expressions analysis.
//!
//! An expression is available at a point if it has been computed on every
//! path reaching that point and none of its operands was written since.
//!
//! # Algorithm
//!
//! - `IN[B]` = ∩{OUT[P] | P is a predecessor of B}, or ∅ without predecessors
//! - `OUT[B]` = E_GEN[B] ∪ (IN[B] - E_KILL[B])
//!
//! Every `OUT` starts at "all expressions minus E_KILL" so the intersection
//! converges from above; sets only shrink from one sweep to the next.

use crate::{
    analysis::dataflow::{
        framework::{DataFlowAnalysis, Direction, Meet},
        solver::DataFlowSolver,
    },
    ir::{AnalysisState, BlockFacts, BlockId},
    utils::BitSet,
    Result,
};

/// Available expressions over the `expressions` universe.
#[derive(Debug, Clone, Copy, Default)]
pub struct AvailableExpressions;

impl DataFlowAnalysis for AvailableExpressions {
    const DIRECTION: Direction = Direction::Forward;
    const MEET: Meet = Meet::Intersection;

    fn name(&self) -> &'static str {
        "available expressions"
    }

    fn universe(&self, state: &AnalysisState) -> usize {
        state.expressions().len()
    }

    fn initial(&self, state: &AnalysisState, block: BlockId, universe: usize) -> Result<BitSet> {
        BitSet::full(universe).difference(&state.block(block)?.facts().e_kill)
    }

    fn transfer(&self, state: &AnalysisState, block: BlockId, input: &BitSet) -> Result<BitSet> {
        let facts = state.block(block)?.facts();
        facts.e_gen.union(&input.difference(&facts.e_kill)?)
    }

    fn store(&self, facts: &mut BlockFacts, in_set: BitSet, out_set: BitSet) {
        facts.e_in = in_set;
        facts.e_out = out_set;
    }
}

/// Computes `e_in`/`e_out` for every block.
///
/// # Errors
///
/// Returns [`crate::Error::InvariantViolation`] if the local sets are stale.
pub fn compute_available_expressions(state: &mut AnalysisState) -> Result<usize> {
    DataFlowSolver::new(AvailableExpressions).solve_into(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::compute_local_sets,
        test::{counting_loop, diamond},
    };

    #[test]
    fn test_available_on_both_paths() {
        let mut fixture = diamond();
        let state = &mut fixture.state;
        compute_local_sets(state).unwrap();
        compute_available_expressions(state).unwrap();

        let sum = state
            .instr(fixture.joined_sum)
            .unwrap()
            .binary_expr()
            .copied()
            .unwrap();
        let index = state.expression_index(&sum).unwrap();
        assert!(state.block(fixture.join).unwrap().facts().e_in.contains(index));
        assert!(!state.block(fixture.split).unwrap().facts().e_in.contains(index));
    }

    #[test]
    fn test_sets_only_shrink_between_sweeps() {
        let mut fixture = counting_loop();
        let state = &mut fixture.state;
        compute_local_sets(state).unwrap();

        let results = DataFlowSolver::new(AvailableExpressions)
            .with_history()
            .solve(state)
            .unwrap();
        assert!(results.history.len() >= 2);
        for pair in results.history.windows(2) {
            for &block in state.block_order() {
                let before = &pair[0][block.index()];
                let after = &pair[1][block.index()];
                assert!(after.is_subset(before).unwrap());
            }
        }
    }

    #[test]
    fn test_no_predecessor_means_nothing_available() {
        let mut fixture = counting_loop();
        let state = &mut fixture.state;
        compute_local_sets(state).unwrap();
        compute_available_expressions(state).unwrap();

        let init = state.block(fixture.init).unwrap().facts();
        assert!(init.e_in.is_empty());
    }
}
