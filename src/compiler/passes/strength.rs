//! Strength reduction of derived induction variables.
//!
//! A derived induction variable `j = c * i + d` is recomputed on every
//! iteration with a multiplication. This pass replaces it with a temporary
//! that is initialized once in the loop preheader and stepped alongside
//! every update of the basic variable:
//!
//! ```text
//!                          preheader: sr1 = 4 * i
//! L1: i = i + 1            L1: i = i + 1
//!     j = i * 4    ==>         sr1 = sr1 + 4
//!     goto L1                  j = sr1
//!                              goto L1
//! ```
//!
//! # Implementation Strategy
//!
//! 1. Find the loops with at least one derived induction variable whose
//!    steps fit in an `i64`
//! 2. Insert a preheader in front of each of them and recompute the facts
//! 3. Process the loops smallest body first, so an inner loop is reduced
//!    before a loop containing it
//! 4. Per loop, group the derived variables by basis and `(c, d)`; each group
//!    shares one fresh `srN` temporary
//! 5. Merge the preheaders back into their predecessors where possible

use log::debug;
use rustc_hash::FxHashMap;

use crate::{
    analysis::{
        basic_update, compute_dominators, compute_local_sets, compute_reaching_definitions,
        induction_variables, insert_preheader, merge_blocks, natural_loops, InductionVar,
    },
    compiler::{EventKind, EventLog, Pass, PassContext, PassId, PassKind},
    ir::{AnalysisState, BinaryOp, BlockId, Expression, InstrId, InstructionKind, NameId, Operand},
    utils::BitSet,
    Result,
};

/// Derived variables sharing one basis and one affine form.
#[derive(Debug)]
struct Group {
    basis: NameId,
    c: i64,
    d: i64,
    defs: Vec<InstrId>,
}

/// Strength reduction of derived induction variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrengthReductionPass;

impl StrengthReductionPass {
    /// Creates a new strength reduction pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn refresh(state: &mut AnalysisState) -> Result<()> {
        compute_local_sets(state)?;
        compute_reaching_definitions(state)?;
        Ok(())
    }

    fn group(vars: &[InductionVar]) -> Vec<Group> {
        let mut groups: Vec<Group> = Vec::new();
        for var in vars.iter().filter(|v| !v.is_basic()) {
            match groups
                .iter_mut()
                .find(|g| g.basis == var.basis && g.c == var.c && g.d == var.d)
            {
                Some(group) => group.defs.push(var.def),
                None => groups.push(Group {
                    basis: var.basis,
                    c: var.c,
                    d: var.d,
                    defs: vec![var.def],
                }),
            }
        }
        groups
    }

    /// `temp = temp + |k|` or `temp = temp - |k|`.
    fn step(temp: NameId, k: i64) -> Option<InstructionKind> {
        let op = if k < 0 { BinaryOp::Sub } else { BinaryOp::Add };
        Some(InstructionKind::Binary {
            result: Operand::Var(temp),
            expr: Expression::new(op, Operand::Var(temp), Operand::Const(k.checked_abs()?)),
        })
    }

    /// Computes the temporary's increment after every update of the basis.
    /// Returns `None` if the group's arithmetic does not fit in an `i64`.
    fn increments(
        state: &AnalysisState,
        group: &Group,
        updates: &[InstrId],
    ) -> Result<Option<Vec<(InstrId, i64)>>> {
        if group.d.checked_abs().is_none() {
            return Ok(None);
        }
        let mut increments = Vec::with_capacity(updates.len());
        for &update in updates {
            let (_, step) = basic_update(state, update)?
                .ok_or_else(|| invariant_error!("{} is not a basic update", update))?;
            match group.c.checked_mul(step).filter(|k| k.checked_abs().is_some()) {
                Some(k) => increments.push((update, k)),
                None => return Ok(None),
            }
        }
        Ok(Some(increments))
    }

    /// Classifies the loop and returns the groups that can be rewritten,
    /// each with its increments. Does not touch the IR.
    fn plan(state: &AnalysisState, body: &BitSet) -> Result<Vec<(Group, Vec<(InstrId, i64)>)>> {
        let vars = induction_variables(state, body)?;

        let mut updates: FxHashMap<NameId, Vec<InstrId>> = FxHashMap::default();
        for var in vars.iter().filter(|v| v.is_basic()) {
            updates.entry(var.var).or_default().push(var.def);
        }

        let mut plans = Vec::new();
        for group in Self::group(&vars) {
            let Some(basis_updates) = updates.get(&group.basis) else {
                continue;
            };
            match Self::increments(state, &group, basis_updates)? {
                Some(increments) => plans.push((group, increments)),
                None => debug!(
                    "sr: group ({}, {}) of {} overflows, left alone",
                    group.c,
                    group.d,
                    state.name(group.basis).unwrap_or("?")
                ),
            }
        }
        Ok(plans)
    }

    /// Rewrites one group onto a fresh temporary initialized in `preheader`.
    fn reduce_group(
        state: &mut AnalysisState,
        preheader: BlockId,
        group: &Group,
        increments: &[(InstrId, i64)],
        changes: &mut EventLog,
    ) -> Result<()> {
        let temp = state.fresh_name("sr");
        let pass = PassId::StrengthReduction.to_string();

        for &def in &group.defs {
            let before = state.display_instruction(def)?;
            let instr = state.instr_mut(def)?;
            let InstructionKind::Binary { result, .. } = &instr.kind else {
                return Err(invariant_error!("derived definition {} is not binary", def));
            };
            let result = *result;
            instr.kind = InstructionKind::Unary {
                result,
                operand: Operand::Var(temp),
            };
            let after = state.display_instruction(def)?;
            debug!("sr: {} -> {}", before, after);
            changes
                .record(EventKind::StrengthReduced)
                .pass(pass.clone())
                .message(format!("{before} -> {after}"));
        }

        for &(update, k) in increments {
            if k == 0 {
                continue;
            }
            if let Some(kind) = Self::step(temp, k) {
                state.insert_instr_after(update, kind)?;
            }
        }

        let init = if group.c == 1 {
            InstructionKind::Unary {
                result: Operand::Var(temp),
                operand: Operand::Var(group.basis),
            }
        } else {
            InstructionKind::Binary {
                result: Operand::Var(temp),
                expr: Expression::new(
                    BinaryOp::Mul,
                    Operand::Const(group.c),
                    Operand::Var(group.basis),
                ),
            }
        };
        state.append_instr(preheader, init)?;
        if group.d != 0 {
            if let Some(kind) = Self::step(temp, group.d) {
                state.append_instr(preheader, kind)?;
            }
        }
        Ok(())
    }

    /// Reduces every rewritable group of one loop. Returns the number of
    /// groups rewritten.
    fn reduce_loop(
        state: &mut AnalysisState,
        preheader: BlockId,
        body: &BitSet,
        changes: &mut EventLog,
    ) -> Result<usize> {
        Self::refresh(state)?;
        let plans = Self::plan(state, body)?;
        for (group, increments) in &plans {
            Self::reduce_group(state, preheader, group, increments, changes)?;
        }
        Ok(plans.len())
    }
}

impl Pass for StrengthReductionPass {
    fn id(&self) -> PassId {
        PassId::StrengthReduction
    }

    fn kind(&self) -> PassKind {
        PassKind::Optimization
    }

    fn description(&self) -> &'static str {
        "Replace derived induction variables with incremented temporaries"
    }

    fn dependencies(&self) -> &'static [PassId] {
        &[PassId::ReachingDefinitions, PassId::Dominators]
    }

    fn invalidates(&self) -> &'static [PassId] {
        &[PassId::Sets, PassId::Dominators]
    }

    fn run(&self, state: &mut AnalysisState, ctx: &mut PassContext<'_>) -> Result<bool> {
        let mut changes = EventLog::new();
        let pass = PassId::StrengthReduction.to_string();
        let blocks_before = state.block_count();

        Self::refresh(state)?;
        compute_dominators(state)?;
        let loops = natural_loops(state)?;

        let mut targets = Vec::new();
        for (&header, body) in &loops {
            if !Self::plan(state, body)?.is_empty() {
                targets.push(header);
            }
        }
        if targets.is_empty() {
            return Ok(false);
        }

        let mut preheaders: FxHashMap<BlockId, BlockId> = FxHashMap::default();
        for header in targets {
            let body = loops
                .get(&header)
                .ok_or_else(|| invariant_error!("no loop for {}", header))?;
            let preheader = insert_preheader(state, header, body)?;
            changes
                .record(EventKind::PreheaderInserted)
                .pass(pass.clone())
                .message(format!("before {}", state.block_name(header)));
            preheaders.insert(header, preheader);
        }

        Self::refresh(state)?;
        compute_dominators(state)?;
        let mut ordered: Vec<(BlockId, BitSet)> = natural_loops(state)?
            .into_iter()
            .filter(|(header, _)| preheaders.contains_key(header))
            .collect();
        ordered.sort_by_key(|(header, body)| (body.count(), *header));

        let mut reduced = 0;
        for (header, body) in &ordered {
            let preheader = preheaders
                .get(header)
                .copied()
                .ok_or_else(|| invariant_error!("no preheader for {}", header))?;
            reduced += Self::reduce_loop(state, preheader, body, &mut changes)?;
        }

        let removed = merge_blocks(state)?;
        if removed > 0 {
            changes
                .record(EventKind::BlocksMerged)
                .pass(pass)
                .message(format!("{removed} blocks removed"));
        }

        debug!(
            "sr: {} groups reduced in {} loops",
            reduced,
            ordered.len()
        );
        ctx.events.merge(changes);
        Ok(reduced > 0 || state.block_count() != blocks_before)
    }
}
