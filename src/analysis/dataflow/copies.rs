//! Reaching copies and definition-use chains.
//!
//! The two analyses copy propagation relies on:
//!
//! - [`ReachingCopies`]: forward, intersection over the `definitions`
//!   universe. A copy `x = y` reaches a point if it is on every path and
//!   neither `x` nor `y` was written since.
//! - [`DefinitionUseChains`]: backward, union over the `du_chains` universe.
//!   A use reaches a point backwards if it may read the value a definition at
//!   that point would write.

use crate::{
    analysis::dataflow::{
        framework::{DataFlowAnalysis, Direction, Meet},
        solver::DataFlowSolver,
    },
    ir::{AnalysisState, BlockFacts, BlockId},
    utils::BitSet,
    Result,
};

/// Copies `x = y` reaching each block along every path.
///
/// `C_OUT[B]` = C_GEN[B] ∪ (C_IN[B] - C_KILL[B]), seeded to
/// "all minus C_KILL" like available expressions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReachingCopies;

impl DataFlowAnalysis for ReachingCopies {
    const DIRECTION: Direction = Direction::Forward;
    const MEET: Meet = Meet::Intersection;

    fn name(&self) -> &'static str {
        "reaching copies"
    }

    fn universe(&self, state: &AnalysisState) -> usize {
        state.definitions().len()
    }

    fn initial(&self, state: &AnalysisState, block: BlockId, universe: usize) -> Result<BitSet> {
        BitSet::full(universe).difference(&state.block(block)?.facts().c_kill)
    }

    fn transfer(&self, state: &AnalysisState, block: BlockId, input: &BitSet) -> Result<BitSet> {
        let facts = state.block(block)?.facts();
        facts.c_gen.union(&input.difference(&facts.c_kill)?)
    }

    fn store(&self, facts: &mut BlockFacts, in_set: BitSet, out_set: BitSet) {
        facts.c_in = in_set;
        facts.c_out = out_set;
    }
}

/// Uses reachable backwards from each block.
///
/// `DU_IN[B]` = DU_USE[B] ∪ (DU_OUT[B] - DU_DEF[B])
#[derive(Debug, Clone, Copy, Default)]
pub struct DefinitionUseChains;

impl DataFlowAnalysis for DefinitionUseChains {
    const DIRECTION: Direction = Direction::Backward;
    const MEET: Meet = Meet::Union;

    fn name(&self) -> &'static str {
        "definition-use chains"
    }

    fn universe(&self, state: &AnalysisState) -> usize {
        state.du_chains().len()
    }

    fn initial(&self, _state: &AnalysisState, _block: BlockId, universe: usize) -> Result<BitSet> {
        Ok(BitSet::new(universe))
    }

    fn transfer(&self, state: &AnalysisState, block: BlockId, input: &BitSet) -> Result<BitSet> {
        let facts = state.block(block)?.facts();
        facts.du_use.union(&input.difference(&facts.du_def)?)
    }

    fn store(&self, facts: &mut BlockFacts, in_set: BitSet, out_set: BitSet) {
        facts.du_in = in_set;
        facts.du_out = out_set;
    }
}

/// Computes `c_in`/`c_out` for every block.
///
/// # Errors
///
/// Returns [`crate::Error::InvariantViolation`] if the local sets are stale.
pub fn compute_reaching_copies(state: &mut AnalysisState) -> Result<usize> {
    DataFlowSolver::new(ReachingCopies).solve_into(state)
}

/// Computes `du_in`/`du_out` for every block.
///
/// # Errors
///
/// Returns [`crate::Error::InvariantViolation`] if the local sets are stale.
pub fn compute_du_chains(state: &mut AnalysisState) -> Result<usize> {
    DataFlowSolver::new(DefinitionUseChains).solve_into(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::compute_local_sets,
        ir::{BinaryOp, CfgBuilder, Operand},
        test::diamond,
    };

    #[test]
    fn test_copy_reaches_join_and_use_reaches_copy() {
        let mut fixture = diamond();
        let state = &mut fixture.state;
        compute_local_sets(state).unwrap();
        compute_reaching_copies(state).unwrap();
        compute_du_chains(state).unwrap();

        let copy = state.definition_index(fixture.copy).unwrap();
        assert!(state.block(fixture.join).unwrap().facts().c_in.contains(copy));
        assert!(state.block(fixture.left).unwrap().facts().c_in.contains(copy));

        // z = x + s reads x in the join block
        let x = state.lookup_name("x").unwrap();
        let join = state.block(fixture.join).unwrap();
        let use_of_x = join.instructions()[2];
        let chain = state.du_index(use_of_x, x).unwrap();
        assert!(state.block(fixture.split).unwrap().facts().du_out.contains(chain));
    }

    #[test]
    fn test_copy_killed_on_one_path() {
        // BB1: x = y; if p < 0 -> BB2 | BB3; BB2: y = 1; BB3: return x
        let mut builder = CfgBuilder::new();
        let (b1, b2, b3) = (builder.block(), builder.block(), builder.block());
        let (x, y, p) = (builder.var("x"), builder.var("y"), builder.var("p"));
        let copy = builder.assign(b1, x, y).unwrap();
        builder
            .branch(b1, BinaryOp::Lt, p, Operand::Const(0), "L1", "L2")
            .unwrap();
        builder.label(b2, "L1").unwrap();
        builder.assign(b2, y, Operand::Const(1)).unwrap();
        builder.label(b3, "L2").unwrap();
        builder.ret(b3, x).unwrap();
        let (entry, exit) = (builder.entry(), builder.exit());
        builder
            .edge(entry, b1)
            .edge(b1, b2)
            .edge(b1, b3)
            .edge(b2, b3)
            .edge(b3, exit);
        let mut state = builder.finish().unwrap();

        compute_local_sets(&mut state).unwrap();
        compute_reaching_copies(&mut state).unwrap();
        let idx = state.definition_index(copy).unwrap();
        assert!(state.block(b2).unwrap().facts().c_in.contains(idx));
        assert!(!state.block(b2).unwrap().facts().c_out.contains(idx));
        assert!(!state.block(b3).unwrap().facts().c_in.contains(idx));
    }
}
