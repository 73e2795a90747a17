//! Induction-variable classification.
//!
//! An induction variable `x` of a loop is an affine function of a basic
//! induction variable `i`: `x = c * i + d` at its definition.
//!
//! - **Basic**: every in-loop definition of `i` has the form `i = i + k` or
//!   `i = i - k` with a constant `k`. Recorded as `(i, 1, 0)`, once per update.
//! - **Derived**: a variable with a single in-loop definition of the form
//!   `x = v op k` or `x = k op v`, where `v` is already known to be an
//!   induction variable and `op` is arithmetic.
//!
//! A derived link through a non-basic `v` is only sound when the value of `v`
//! seen by `x` is the one computed inside the loop, and the basis was not
//! changed between the definition of `v` and the definition of `x`. A
//! candidate failing either check is dropped for the rest of the
//! classification.

use std::collections::BTreeMap;

use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    analysis::dataflow::reaching_before,
    ir::{AnalysisState, BinaryOp, BlockId, Expression, InstrId, InstructionKind, NameId, Operand},
    utils::BitSet,
    Result,
};

/// `var = c * basis + d`, established by the definition `def`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InductionVar {
    /// The instruction defining `var`.
    pub def: InstrId,
    /// The induction variable.
    pub var: NameId,
    /// The basic induction variable it is derived from.
    pub basis: NameId,
    /// Multiplicative factor.
    pub c: i64,
    /// Additive offset.
    pub d: i64,
}

impl InductionVar {
    /// Returns `true` for a basic induction variable record.
    #[must_use]
    pub fn is_basic(&self) -> bool {
        self.var == self.basis
    }
}

/// A derived candidate `result = v op k` or `result = k op v`.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    def: InstrId,
    result: NameId,
    operand: NameId,
    constant: i64,
    op: BinaryOp,
    constant_first: bool,
}

impl Candidate {
    fn from_binary(def: InstrId, result: &Operand, expr: &Expression) -> Option<Self> {
        let result = result.as_var()?;
        if !expr.op.is_arithmetic() {
            return None;
        }
        let (operand, constant, constant_first) = match (expr.lhs, expr.rhs) {
            (Operand::Var(v), Operand::Const(k)) => (v, k, false),
            (Operand::Const(k), Operand::Var(v)) => (v, k, true),
            _ => return None,
        };
        if operand == result || (constant_first && expr.op == BinaryOp::Div) {
            return None;
        }
        Some(Self {
            def,
            result,
            operand,
            constant,
            op: expr.op,
            constant_first,
        })
    }

    /// Composes `operand = c * basis + d` with this definition.
    fn compose(&self, c: i64, d: i64) -> Option<(i64, i64)> {
        let k = self.constant;
        match (self.op, self.constant_first) {
            (BinaryOp::Mul, _) => Some((c.checked_mul(k)?, d.checked_mul(k)?)),
            (BinaryOp::Div, _) => {
                if k == 0 || c % k != 0 || d % k != 0 {
                    return None;
                }
                Some((c.checked_div(k)?, d.checked_div(k)?))
            }
            (BinaryOp::Add, _) => Some((c, d.checked_add(k)?)),
            (BinaryOp::Sub, false) => Some((c, d.checked_sub(k)?)),
            (BinaryOp::Sub, true) => Some((c.checked_neg()?, k.checked_sub(d)?)),
            _ => None,
        }
    }
}

/// Classifies the induction variables of the loop `body`.
///
/// Basic variables come first, in program order, followed by derived
/// variables in the order they were established.
///
/// Requires up-to-date local sets and reaching definitions.
///
/// # Errors
///
/// Returns [`crate::Error::InvariantViolation`] if the facts are stale or a
/// handle is dangling.
pub fn induction_variables(state: &AnalysisState, body: &BitSet) -> Result<Vec<InductionVar>> {
    let in_loop = |block: BlockId| body.get(block.index()).unwrap_or(false);

    let mut loop_defs: Vec<InstrId> = Vec::new();
    let mut defs_in_loop: FxHashMap<NameId, Vec<InstrId>> = FxHashMap::default();
    for &block in state.block_order() {
        if !in_loop(block) {
            continue;
        }
        for &id in state.block(block)?.instructions() {
            if let Some(var) = state.instr(id)?.defined_var() {
                loop_defs.push(id);
                defs_in_loop.entry(var).or_default().push(id);
            }
        }
    }

    // Basic induction variables
    let mut records: Vec<InductionVar> = Vec::new();
    for &id in &loop_defs {
        let Some((var, _)) = basic_update(state, id)? else {
            continue;
        };
        let mut all_updates = true;
        for &other in defs_in_loop.get(&var).map_or(&[][..], Vec::as_slice) {
            if basic_update(state, other)?.is_none() {
                all_updates = false;
                break;
            }
        }
        if all_updates {
            records.push(InductionVar {
                def: id,
                var,
                basis: var,
                c: 1,
                d: 0,
            });
        }
    }

    // Derived candidates
    let mut candidates: Vec<Candidate> = Vec::new();
    for &id in &loop_defs {
        let InstructionKind::Binary { result, expr } = &state.instr(id)?.kind else {
            continue;
        };
        let Some(candidate) = Candidate::from_binary(id, result, expr) else {
            continue;
        };
        if defs_in_loop.get(&candidate.result).map_or(0, Vec::len) != 1 {
            continue;
        }
        candidates.push(candidate);
    }

    let defs_by_var = state.definitions_by_var()?;
    let mut changed = true;
    while changed {
        changed = false;
        let mut remaining = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let Some(source) = records.iter().find(|r| r.var == candidate.operand).copied() else {
                remaining.push(candidate);
                continue;
            };

            if !source.is_basic() && !link_is_safe(state, body, &candidate, &source, &defs_by_var)? {
                debug!(
                    "induction: {} dropped, {} may not hold its loop value",
                    state.display_instruction(candidate.def)?,
                    state.name(candidate.operand).unwrap_or("?")
                );
                changed = true;
                continue;
            }

            match candidate.compose(source.c, source.d) {
                Some((c, d)) => records.push(InductionVar {
                    def: candidate.def,
                    var: candidate.result,
                    basis: source.basis,
                    c,
                    d,
                }),
                None => debug!(
                    "induction: {} dropped, not an exact affine form",
                    state.display_instruction(candidate.def)?
                ),
            }
            changed = true;
        }
        candidates = remaining;
    }

    debug!("induction: {} records", records.len());
    Ok(records)
}

/// Returns `(v, k)` if `instr` is `v = v + k` or `v = v - k`.
pub(crate) fn basic_update(state: &AnalysisState, instr: InstrId) -> Result<Option<(NameId, i64)>> {
    let InstructionKind::Binary {
        result: Operand::Var(var),
        expr,
    } = &state.instr(instr)?.kind
    else {
        return Ok(None);
    };
    let step = match (expr.op, expr.lhs, expr.rhs) {
        (BinaryOp::Add, Operand::Var(v), Operand::Const(k)) if v == *var => k,
        (BinaryOp::Sub, Operand::Var(v), Operand::Const(k)) if v == *var => {
            let Some(step) = k.checked_neg() else {
                return Ok(None);
            };
            step
        }
        _ => return Ok(None),
    };
    Ok(Some((*var, step)))
}

/// Checks that `candidate` sees the in-loop value of the non-basic
/// `source.var` and that the basis is not redefined in between.
fn link_is_safe(
    state: &AnalysisState,
    body: &BitSet,
    candidate: &Candidate,
    source: &InductionVar,
    defs_by_var: &FxHashMap<NameId, Vec<usize>>,
) -> Result<bool> {
    // no definition from outside the loop may reach the candidate
    let reaching = reaching_before(state, candidate.def, defs_by_var)?;
    for &d in defs_by_var.get(&candidate.operand).map_or(&[][..], Vec::as_slice) {
        if !reaching.get(d)? {
            continue;
        }
        let owner = state.instr(state.definitions()[d])?.owner();
        if !body.get(owner.index())? {
            return Ok(false);
        }
    }

    let basis = source.basis;
    let k_block = state.instr(candidate.def)?.owner();
    let j_block = state.instr(source.def)?.owner();
    let k_instrs = state.block(k_block)?.instructions();
    let defines_basis = |id: InstrId| -> Result<bool> {
        Ok(state.instr(id)?.defined_var() == Some(basis))
    };

    let k_pos = position(k_instrs, candidate.def)?;
    if k_block == j_block {
        let j_pos = position(k_instrs, source.def)?;
        if j_pos < k_pos {
            for &id in &k_instrs[j_pos + 1..k_pos] {
                if defines_basis(id)? {
                    return Ok(false);
                }
            }
            return Ok(true);
        }
    }

    for &id in &k_instrs[..k_pos] {
        if defines_basis(id)? {
            return Ok(false);
        }
    }
    let j_instrs = state.block(j_block)?.instructions();
    let j_pos = position(j_instrs, source.def)?;
    for &id in &j_instrs[j_pos + 1..] {
        if defines_basis(id)? {
            return Ok(false);
        }
    }

    // blocks on a path from the definition of v to the candidate
    let j_index = state.require_definition(source.def)?;
    let mut visited: FxHashSet<BlockId> = FxHashSet::default();
    let mut worklist: Vec<BlockId> = Vec::new();
    let mut enqueue = |block: BlockId, worklist: &mut Vec<BlockId>| -> Result<()> {
        if block != j_block
            && !visited.contains(&block)
            && state.block(block)?.facts().out_rd.get(j_index)?
        {
            visited.insert(block);
            worklist.push(block);
        }
        Ok(())
    };
    for &pred in state.block(k_block)?.predecessors() {
        enqueue(pred, &mut worklist)?;
    }
    while let Some(block) = worklist.pop() {
        for &id in state.block(block)?.instructions() {
            if defines_basis(id)? {
                return Ok(false);
            }
        }
        for &pred in state.block(block)?.predecessors() {
            enqueue(pred, &mut worklist)?;
        }
    }
    Ok(true)
}

fn position(instrs: &[InstrId], instr: InstrId) -> Result<usize> {
    instrs
        .iter()
        .position(|&i| i == instr)
        .ok_or_else(|| invariant_error!("instruction {} is not listed by its owner", instr))
}

/// Classifies the induction variables of every stored loop and stores them,
/// per header.
///
/// # Errors
///
/// See [`induction_variables`].
pub fn compute_induction_variables(state: &mut AnalysisState) -> Result<()> {
    let mut vars = BTreeMap::new();
    for (&header, body) in state.loops() {
        vars.insert(header, induction_variables(state, body)?);
    }
    state.set_induction_vars(vars);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{compute_dominators, compute_local_sets, compute_reaching_definitions, natural_loops},
        ir::CfgBuilder,
        test::counting_loop,
    };

    fn prepare(state: &mut AnalysisState) -> BTreeMap<BlockId, BitSet> {
        compute_local_sets(state).unwrap();
        compute_reaching_definitions(state).unwrap();
        compute_dominators(state).unwrap();
        natural_loops(state).unwrap()
    }

    /// BB1: i = 0   BB2: L1: <body>; ifTrue i < 10 goto L1 else goto L2   BB3: L2: return i
    fn single_block_loop(
        body: impl FnOnce(&mut CfgBuilder, BlockId) -> Vec<InstrId>,
    ) -> (AnalysisState, BlockId, Vec<InstrId>) {
        let mut builder = CfgBuilder::new();
        let (b1, b2, b3) = (builder.block(), builder.block(), builder.block());
        let i = builder.var("i");
        builder.assign(b1, i, Operand::Const(0)).unwrap();
        builder.label(b2, "L1").unwrap();
        let defs = body(&mut builder, b2);
        builder
            .branch(b2, BinaryOp::Lt, i, Operand::Const(10), "L1", "L2")
            .unwrap();
        builder.label(b3, "L2").unwrap();
        builder.ret(b3, i).unwrap();
        let (entry, exit) = (builder.entry(), builder.exit());
        builder
            .edge(entry, b1)
            .edge(b1, b2)
            .edge(b2, b2)
            .edge(b2, b3)
            .edge(b3, exit);
        (builder.finish().unwrap(), b2, defs)
    }

    #[test]
    fn test_counting_loop_classification() {
        let mut fixture = counting_loop();
        let loops = prepare(&mut fixture.state);
        let state = &fixture.state;
        let vars = induction_variables(state, &loops[&fixture.header]).unwrap();

        let i = state.lookup_name("i").unwrap();
        let j = state.lookup_name("j").unwrap();
        assert_eq!(
            vars,
            vec![
                InductionVar {
                    def: fixture.increment,
                    var: i,
                    basis: i,
                    c: 1,
                    d: 0,
                },
                InductionVar {
                    def: fixture.scaled,
                    var: j,
                    basis: i,
                    c: 4,
                    d: 0,
                },
            ]
        );
        assert!(vars[0].is_basic());
        assert!(!vars[1].is_basic());
    }

    #[test]
    fn test_derived_chain_composes() {
        // i = i + 2; a = i * 3; b = a + 5; e = 7 - b; f = e / 2 (inexact, dropped)
        let (mut state, header, defs) = single_block_loop(|builder, bb| {
            let (i, a, b, e, f) = (
                builder.var("i"),
                builder.var("a"),
                builder.var("b"),
                builder.var("e"),
                builder.var("f"),
            );
            vec![
                builder
                    .compute(bb, i, BinaryOp::Add, i, Operand::Const(2))
                    .unwrap(),
                builder
                    .compute(bb, a, BinaryOp::Mul, i, Operand::Const(3))
                    .unwrap(),
                builder
                    .compute(bb, b, BinaryOp::Add, a, Operand::Const(5))
                    .unwrap(),
                builder
                    .compute(bb, e, BinaryOp::Sub, Operand::Const(7), b)
                    .unwrap(),
                builder
                    .compute(bb, f, BinaryOp::Div, e, Operand::Const(2))
                    .unwrap(),
            ]
        });
        let loops = prepare(&mut state);
        let vars = induction_variables(&state, &loops[&header]).unwrap();

        let triple = |def: InstrId| {
            vars.iter()
                .find(|r| r.def == def)
                .map(|r| (state.name(r.basis).unwrap().to_string(), r.c, r.d))
        };
        assert_eq!(triple(defs[0]), Some(("i".to_string(), 1, 0)));
        assert_eq!(triple(defs[1]), Some(("i".to_string(), 3, 0)));
        assert_eq!(triple(defs[2]), Some(("i".to_string(), 3, 5)));
        assert_eq!(triple(defs[3]), Some(("i".to_string(), -3, 2)));
        assert_eq!(triple(defs[4]), None);
    }

    #[test]
    fn test_basis_redefined_between_links_is_dropped() {
        // a = i * 3; i = i + 1; b = a + 5
        let (mut state, header, defs) = single_block_loop(|builder, bb| {
            let (i, a, b) = (builder.var("i"), builder.var("a"), builder.var("b"));
            vec![
                builder
                    .compute(bb, a, BinaryOp::Mul, i, Operand::Const(3))
                    .unwrap(),
                builder
                    .compute(bb, i, BinaryOp::Add, i, Operand::Const(1))
                    .unwrap(),
                builder
                    .compute(bb, b, BinaryOp::Add, a, Operand::Const(5))
                    .unwrap(),
            ]
        });
        let loops = prepare(&mut state);
        let vars = induction_variables(&state, &loops[&header]).unwrap();
        assert!(vars.iter().any(|r| r.def == defs[0]));
        assert!(!vars.iter().any(|r| r.def == defs[2]));
    }

    #[test]
    fn test_non_basic_updates_disqualify() {
        // i = i + 1; i = i * 2; j = i + 1
        let (mut state, header, _) = single_block_loop(|builder, bb| {
            let (i, j) = (builder.var("i"), builder.var("j"));
            vec![
                builder
                    .compute(bb, i, BinaryOp::Add, i, Operand::Const(1))
                    .unwrap(),
                builder
                    .compute(bb, i, BinaryOp::Mul, i, Operand::Const(2))
                    .unwrap(),
                builder
                    .compute(bb, j, BinaryOp::Add, i, Operand::Const(1))
                    .unwrap(),
            ]
        });
        let loops = prepare(&mut state);
        assert!(induction_variables(&state, &loops[&header]).unwrap().is_empty());
    }
}
