//! Reaching definitions analysis.
//!
//! Reaching definitions computes, for each block, which `Unary`/`Binary`
//! instructions may reach it without being killed by an intervening
//! definition of the same variable.
//!
//! # Algorithm
//!
//! For each block B:
//! - `GEN[B]` = definitions in B not overwritten later in B
//! - `KILL[B]` = other definitions of the variables B writes
//! - `IN[B]` = ∪{OUT[P] | P is a predecessor of B}
//! - `OUT[B]` = GEN[B] ∪ (IN[B] - KILL[B])
//!
//! `Entry` is the boundary with an empty `OUT`.

use rustc_hash::FxHashMap;

use crate::{
    analysis::dataflow::{
        framework::{DataFlowAnalysis, Direction, Meet},
        solver::DataFlowSolver,
    },
    ir::{AnalysisState, BlockFacts, BlockId, InstrId, NameId},
    utils::BitSet,
    Result,
};

/// Reaching definitions over the `definitions` universe.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReachingDefinitions;

impl DataFlowAnalysis for ReachingDefinitions {
    const DIRECTION: Direction = Direction::Forward;
    const MEET: Meet = Meet::Union;

    fn name(&self) -> &'static str {
        "reaching definitions"
    }

    fn universe(&self, state: &AnalysisState) -> usize {
        state.definitions().len()
    }

    fn initial(&self, _state: &AnalysisState, _block: BlockId, universe: usize) -> Result<BitSet> {
        Ok(BitSet::new(universe))
    }

    fn transfer(&self, state: &AnalysisState, block: BlockId, input: &BitSet) -> Result<BitSet> {
        let facts = state.block(block)?.facts();
        facts.gen.union(&input.difference(&facts.kill)?)
    }

    fn store(&self, facts: &mut BlockFacts, in_set: BitSet, out_set: BitSet) {
        facts.in_rd = in_set;
        facts.out_rd = out_set;
    }
}

/// Computes `in_rd`/`out_rd` for every block.
///
/// Returns the number of sweeps until the fixpoint.
///
/// # Errors
///
/// Returns [`crate::Error::InvariantViolation`] if the local sets are stale.
pub fn compute_reaching_definitions(state: &mut AnalysisState) -> Result<usize> {
    DataFlowSolver::new(ReachingDefinitions).solve_into(state)
}

/// Applies the effect of `instr` to a reaching-definitions set: every other
/// definition of the written variable stops reaching, `instr` starts.
///
/// # Errors
///
/// Returns [`crate::Error::InvariantViolation`] for a dangling handle or an
/// unregistered definition.
pub fn advance_reaching(
    state: &AnalysisState,
    reaching: &mut BitSet,
    instr: InstrId,
    defs_by_var: &FxHashMap<NameId, Vec<usize>>,
) -> Result<()> {
    let Some(var) = state.instr(instr)?.defined_var() else {
        return Ok(());
    };
    let own = state.require_definition(instr)?;
    for &d in defs_by_var.get(&var).map_or(&[][..], Vec::as_slice) {
        reaching.set(d, d == own)?;
    }
    Ok(())
}

/// Returns the definitions reaching the point right before `instr`: the
/// owner's `in_rd` advanced through the instructions preceding `instr`.
///
/// # Errors
///
/// Returns [`crate::Error::InvariantViolation`] if `instr` is not listed by
/// its owner or the facts are stale.
pub fn reaching_before(
    state: &AnalysisState,
    instr: InstrId,
    defs_by_var: &FxHashMap<NameId, Vec<usize>>,
) -> Result<BitSet> {
    let owner = state.instr(instr)?.owner();
    let bb = state.block(owner)?;
    let mut reaching = bb.facts().in_rd.clone();
    for &id in bb.instructions() {
        if id == instr {
            return Ok(reaching);
        }
        advance_reaching(state, &mut reaching, id, defs_by_var)?;
    }
    Err(invariant_error!(
        "instruction {} is not listed by its owner {}",
        instr,
        owner
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{analysis::compute_local_sets, test::counting_loop};

    #[test]
    fn test_loop_definitions_reach_header() {
        let mut fixture = counting_loop();
        let state = &mut fixture.state;
        compute_local_sets(state).unwrap();
        let sweeps = compute_reaching_definitions(state).unwrap();
        assert!(sweeps >= 2);

        let increment = state.definition_index(fixture.increment).unwrap();
        let header = state.block(fixture.header).unwrap().facts();
        // i = i + 1 flows around the back edge
        assert!(header.in_rd.contains(increment));

        let entry = state.block(state.entry()).unwrap().facts();
        assert!(entry.out_rd.is_empty());
    }

    #[test]
    fn test_fixpoint_equation_holds() {
        let mut fixture = counting_loop();
        let state = &mut fixture.state;
        compute_local_sets(state).unwrap();
        compute_reaching_definitions(state).unwrap();

        for &block in state.block_order() {
            if block == state.entry() {
                continue;
            }
            let facts = state.block(block).unwrap().facts();
            let expected = facts
                .gen
                .union(&facts.in_rd.difference(&facts.kill).unwrap())
                .unwrap();
            assert_eq!(facts.out_rd, expected);
        }
    }

    #[test]
    fn test_reaching_before_sees_earlier_writes() {
        let mut fixture = counting_loop();
        let state = &mut fixture.state;
        compute_local_sets(state).unwrap();
        compute_reaching_definitions(state).unwrap();
        let defs_by_var = state.definitions_by_var().unwrap();

        // right before j = i * 4 only i = i + 1 defines i
        let reaching = reaching_before(state, fixture.scaled, &defs_by_var).unwrap();
        let increment = state.definition_index(fixture.increment).unwrap();
        assert!(reaching.contains(increment));
        let i_defs = &defs_by_var[&state.lookup_name("i").unwrap()];
        assert_eq!(
            i_defs.iter().filter(|&&d| reaching.contains(d)).count(),
            1
        );
    }

    #[test]
    fn test_stale_local_sets_are_rejected() {
        let mut fixture = counting_loop();
        let state = &mut fixture.state;
        compute_local_sets(state).unwrap();
        state.remove_instr(fixture.invariant).unwrap();
        state.rebuild_tables().unwrap();
        assert!(compute_reaching_definitions(state).is_err());
    }
}
