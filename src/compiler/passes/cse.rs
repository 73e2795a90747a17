//! Common subexpression elimination.
//!
//! A `Binary` instruction whose expression is already available, either on
//! block entry according to the available-expressions facts or from an
//! earlier computation in the same block, is replaced by a copy of a shared
//! temporary:
//!
//! ```text
//! c = a + b            cse1 = a + b
//! ...          ==>     c = cse1
//! d = a + b            ...
//!                      d = cse1
//! ```
//!
//! Every most recent computation of the expression on the paths leading to
//! the redundant instruction stores into the temporary. One rewrite changes
//! the tables, so the facts are recomputed and the scan restarts until no
//! redundant computation is left.

use std::collections::VecDeque;

use log::{debug, trace};
use rustc_hash::FxHashSet;

use crate::{
    analysis::{compute_available_expressions, compute_local_sets},
    compiler::{EventKind, EventLog, Pass, PassContext, PassId, PassKind},
    ir::{AnalysisState, BlockId, Expression, InstrId, InstructionKind, NameId, Operand},
    Result,
};

/// A redundant computation and where its earlier computations live.
struct Redundancy {
    instr: InstrId,
    expr: Expression,
    /// The earlier computation is in the same block.
    local: bool,
}

/// Common subexpression elimination over available expressions.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsePass;

impl CsePass {
    /// Creates a new CSE pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Finds the first redundant `Binary` in block order.
    fn find_redundancy(state: &AnalysisState) -> Result<Option<Redundancy>> {
        for &block in state.block_order() {
            if state.is_sentinel(block) {
                continue;
            }
            let bb = state.block(block)?;
            let mut written: FxHashSet<NameId> = FxHashSet::default();
            let mut computed: Vec<Expression> = Vec::new();

            for &id in bb.instructions() {
                let instr = state.instr(id)?;
                if let Some(expr) = instr.binary_expr() {
                    let local = computed.contains(expr);
                    let on_entry = !expr.read_vars().iter().any(|v| written.contains(v))
                        && bb.facts().e_in.get(state.require_expression(expr)?)?;
                    if local || on_entry {
                        return Ok(Some(Redundancy {
                            instr: id,
                            expr: *expr,
                            local,
                        }));
                    }
                }

                if let Some(var) = instr.defined_var() {
                    written.insert(var);
                    computed.retain(|e| !e.mentions(var));
                }
                if let Some(expr) = instr.binary_expr() {
                    if instr.defined_var().map_or(true, |v| !expr.mentions(v)) {
                        computed.push(*expr);
                    }
                }
            }
        }
        Ok(None)
    }

    /// Collects the most recent computations of `expr` reaching `target`.
    fn earlier_computations(state: &AnalysisState, target: &Redundancy) -> Result<Vec<InstrId>> {
        let owner = state.instr(target.instr)?.owner();
        if target.local {
            let instrs = state.block(owner)?.instructions();
            let position = instrs
                .iter()
                .position(|&i| i == target.instr)
                .ok_or_else(|| invariant_error!("instruction {} not in its block", target.instr))?;
            return Ok(Self::last_computation(state, &instrs[..position], &target.expr)?
                .into_iter()
                .collect());
        }

        let mut found = Vec::new();
        let mut visited: FxHashSet<BlockId> = FxHashSet::default();
        let mut queue: VecDeque<BlockId> =
            state.block(owner)?.predecessors().iter().copied().collect();
        while let Some(block) = queue.pop_front() {
            if !visited.insert(block) {
                continue;
            }
            let bb = state.block(block)?;
            match Self::last_computation(state, bb.instructions(), &target.expr)? {
                Some(id) => {
                    if id != target.instr && !found.contains(&id) {
                        found.push(id);
                    }
                }
                None => queue.extend(bb.predecessors().iter().copied()),
            }
        }
        Ok(found)
    }

    fn last_computation(
        state: &AnalysisState,
        instrs: &[InstrId],
        expr: &Expression,
    ) -> Result<Option<InstrId>> {
        for &id in instrs.iter().rev() {
            if state.instr(id)?.binary_expr() == Some(expr) {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    /// Routes every earlier computation through a fresh temporary and turns
    /// the redundant instruction into a copy of it.
    fn eliminate(
        state: &mut AnalysisState,
        target: &Redundancy,
        earlier: &[InstrId],
        changes: &mut EventLog,
    ) -> Result<()> {
        let before = state.display_instruction(target.instr)?;
        let temp = state.fresh_name("cse");

        for &id in earlier {
            let result = {
                let instr = state.instr_mut(id)?;
                let InstructionKind::Binary { result, .. } = &mut instr.kind else {
                    return Err(invariant_error!("computation {} is not binary", id));
                };
                std::mem::replace(result, Operand::Var(temp))
            };
            state.insert_instr_after(
                id,
                InstructionKind::Unary {
                    result,
                    operand: Operand::Var(temp),
                },
            )?;
            trace!("cse: {} stores into the temporary", state.display_instruction(id)?);
        }

        let instr = state.instr_mut(target.instr)?;
        let InstructionKind::Binary { result, .. } = &instr.kind else {
            return Err(invariant_error!("redundant {} is not binary", target.instr));
        };
        let result = *result;
        instr.kind = InstructionKind::Unary {
            result,
            operand: Operand::Var(temp),
        };

        let after = state.display_instruction(target.instr)?;
        debug!("cse: {} -> {} ({} earlier)", before, after, earlier.len());
        changes
            .record(EventKind::CommonSubexpression)
            .pass(PassId::Cse.to_string())
            .message(format!("{before} -> {after}"));
        Ok(())
    }
}

impl Pass for CsePass {
    fn id(&self) -> PassId {
        PassId::Cse
    }

    fn kind(&self) -> PassKind {
        PassKind::Optimization
    }

    fn description(&self) -> &'static str {
        "Replace recomputed expressions with a shared temporary"
    }

    fn dependencies(&self) -> &'static [PassId] {
        &[PassId::AvailableExpressions]
    }

    fn invalidates(&self) -> &'static [PassId] {
        &[PassId::Sets]
    }

    fn run(&self, state: &mut AnalysisState, ctx: &mut PassContext<'_>) -> Result<bool> {
        let mut changes = EventLog::new();

        loop {
            compute_local_sets(state)?;
            compute_available_expressions(state)?;
            let Some(target) = Self::find_redundancy(state)? else {
                break;
            };
            let earlier = Self::earlier_computations(state, &target)?;
            if earlier.is_empty() {
                return Err(invariant_error!(
                    "no earlier computation of '{}' found",
                    state.display_expression(&target.expr)
                ));
            }
            Self::eliminate(state, &target, &earlier, &mut changes)?;
        }

        let changed = !changes.is_empty();
        ctx.events.merge(changes);
        Ok(changed)
    }
}
