//! Loop-invariant computation detection.
//!
//! A `Binary` inside a loop is invariant when, for every variable it reads,
//! the definitions reaching it are either all outside the loop, or are a
//! single definition inside the loop that is itself invariant. A variable
//! reached both from outside and from inside the loop is not invariant: its
//! value differs between the first and later iterations.
//!
//! Invariance cascades through chains of computations, so the body is
//! rescanned until no new invariant is found.

use std::collections::BTreeMap;

use log::debug;
use rustc_hash::FxHashSet;

use crate::{
    analysis::dataflow::reaching_before,
    ir::{AnalysisState, BlockId, InstrId, InstructionKind},
    utils::BitSet,
    Result,
};

/// Returns the invariant computations of the loop `body`, in program order.
///
/// Requires up-to-date local sets and reaching definitions.
///
/// # Errors
///
/// Returns [`crate::Error::InvariantViolation`] if the facts are stale or a
/// handle is dangling.
pub fn loop_invariants(state: &AnalysisState, body: &BitSet) -> Result<Vec<InstrId>> {
    let defs_by_var = state.definitions_by_var()?;
    let members: Vec<BlockId> = state
        .block_order()
        .iter()
        .copied()
        .filter(|b| body.get(b.index()).unwrap_or(false))
        .collect();

    let mut invariant: FxHashSet<InstrId> = FxHashSet::default();
    let mut rounds = 0;
    loop {
        rounds += 1;
        let mut changed = false;
        for &block in &members {
            for &id in state.block(block)?.instructions() {
                if invariant.contains(&id) {
                    continue;
                }
                let InstructionKind::Binary { expr, .. } = &state.instr(id)?.kind else {
                    continue;
                };
                let reaching = reaching_before(state, id, &defs_by_var)?;

                let mut is_invariant = true;
                for var in expr.read_vars() {
                    let mut outside = false;
                    let mut inside = Vec::new();
                    for &d in defs_by_var.get(&var).map_or(&[][..], Vec::as_slice) {
                        if !reaching.get(d)? {
                            continue;
                        }
                        let def = state.definitions()[d];
                        if body.get(state.instr(def)?.owner().index())? {
                            inside.push(def);
                        } else {
                            outside = true;
                        }
                    }
                    let operand_invariant = match inside.as_slice() {
                        [] => true,
                        [only] => !outside && invariant.contains(only),
                        _ => false,
                    };
                    if !operand_invariant {
                        is_invariant = false;
                        break;
                    }
                }

                if is_invariant {
                    invariant.insert(id);
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }

    let result: Vec<InstrId> = state
        .instruction_order()
        .iter()
        .copied()
        .filter(|id| invariant.contains(id))
        .collect();
    debug!(
        "loop invariants: {} found in {} rounds over {} blocks",
        result.len(),
        rounds,
        members.len()
    );
    Ok(result)
}

/// Computes the invariants of every stored loop and stores them, per header.
///
/// # Errors
///
/// See [`loop_invariants`].
pub fn compute_loop_invariants(state: &mut AnalysisState) -> Result<()> {
    let mut invariants = BTreeMap::new();
    for (&header, body) in state.loops() {
        invariants.insert(header, loop_invariants(state, body)?);
    }
    state.set_invariants(invariants);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{compute_dominators, compute_local_sets, compute_reaching_definitions, natural_loops},
        ir::{BinaryOp, CfgBuilder, Operand},
        test::counting_loop,
    };

    fn prepare(state: &mut AnalysisState) -> BTreeMap<BlockId, BitSet> {
        compute_local_sets(state).unwrap();
        compute_reaching_definitions(state).unwrap();
        compute_dominators(state).unwrap();
        natural_loops(state).unwrap()
    }

    #[test]
    fn test_outside_operand_is_invariant() {
        let mut fixture = counting_loop();
        let loops = prepare(&mut fixture.state);
        let found = loop_invariants(&fixture.state, &loops[&fixture.header]).unwrap();
        assert_eq!(found, vec![fixture.invariant]);
    }

    #[test]
    fn test_operand_reached_from_both_sides_is_not_invariant() {
        let mut fixture = counting_loop();
        let loops = prepare(&mut fixture.state);
        let found = loop_invariants(&fixture.state, &loops[&fixture.header]).unwrap();
        // k = a + 1 sees a = 5 on entry and a = i around the back edge
        assert!(!found.contains(&fixture.mixed));
        assert!(!found.contains(&fixture.increment));
        assert!(!found.contains(&fixture.scaled));
    }

    #[test]
    fn test_invariance_cascades() {
        // BB1: n = 3   BB2: L1: t = n * 2; u = t + 1; v = u - t; ifTrue v < 9 goto L1 else goto L2
        // BB3: L2: return v
        let mut builder = CfgBuilder::new();
        let (b1, b2, b3) = (builder.block(), builder.block(), builder.block());
        let (n, t, u, v) = (
            builder.var("n"),
            builder.var("t"),
            builder.var("u"),
            builder.var("v"),
        );
        builder.assign(b1, n, Operand::Const(3)).unwrap();
        builder.label(b2, "L1").unwrap();
        let first = builder
            .compute(b2, t, BinaryOp::Mul, n, Operand::Const(2))
            .unwrap();
        let second = builder
            .compute(b2, u, BinaryOp::Add, t, Operand::Const(1))
            .unwrap();
        let third = builder.compute(b2, v, BinaryOp::Sub, u, t).unwrap();
        builder
            .branch(b2, BinaryOp::Lt, v, Operand::Const(9), "L1", "L2")
            .unwrap();
        builder.label(b3, "L2").unwrap();
        builder.ret(b3, v).unwrap();
        let (entry, exit) = (builder.entry(), builder.exit());
        builder
            .edge(entry, b1)
            .edge(b1, b2)
            .edge(b2, b2)
            .edge(b2, b3)
            .edge(b3, exit);
        let mut state = builder.finish().unwrap();

        let loops = prepare(&mut state);
        let found = loop_invariants(&state, &loops[&b2]).unwrap();
        assert_eq!(found, vec![first, second, third]);
    }
}
