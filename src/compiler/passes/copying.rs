//! Copy propagation.
//!
//! For a copy `x = y`, every use of `x` the copy can reach is rewritten to
//! read `y`, and the copy is deleted. This is only done when, at every such
//! use, the copy reaches along every path (reaching copies) and neither `x`
//! nor `y` is redefined in front of the use within its block.
//!
//! The pass works on single-instruction blocks so that the block-level facts
//! describe individual instructions: it splits every block first and merges
//! the chains again when done.

use log::{debug, trace};

use crate::{
    analysis::{compute_sets, merge_blocks, split_blocks},
    compiler::{EventKind, EventLog, Pass, PassContext, PassId, PassKind},
    ir::{AnalysisState, InstrId, NameId},
    Result,
};

/// Copy propagation over reaching copies and du-chains.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyPropagationPass;

impl CopyPropagationPass {
    /// Creates a new copy propagation pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the uses of `x` reachable from the end of the copy's block.
    fn reachable_uses(state: &AnalysisState, copy: InstrId, x: NameId) -> Result<Vec<InstrId>> {
        let owner = state.instr(copy)?.owner();
        let du_out = &state.block(owner)?.facts().du_out;
        let mut uses = Vec::new();
        for index in du_out.iter() {
            let &(instr, var) = state
                .du_chains()
                .get(index)
                .ok_or_else(|| invariant_error!("use {} out of range", index))?;
            if var == x && !uses.contains(&instr) {
                uses.push(instr);
            }
        }
        Ok(uses)
    }

    /// Checks that `x = y` holds at every use in `uses`.
    fn holds_at_uses(
        state: &AnalysisState,
        copy: InstrId,
        (x, y): (NameId, NameId),
        uses: &[InstrId],
    ) -> Result<bool> {
        let index = state.require_definition(copy)?;
        for &use_instr in uses {
            let owner = state.instr(use_instr)?.owner();
            let bb = state.block(owner)?;
            if !bb.facts().c_in.get(index)? {
                trace!(
                    "cp: copy does not reach '{}' on every path",
                    state.display_instruction(use_instr)?
                );
                return Ok(false);
            }
            for &id in bb.instructions() {
                if id == use_instr {
                    break;
                }
                if state
                    .instr(id)?
                    .defined_var()
                    .is_some_and(|v| v == x || v == y)
                {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Propagates one copy. Returns `true` if the copy was deleted.
    fn propagate(state: &mut AnalysisState, copy: InstrId, changes: &mut EventLog) -> Result<bool> {
        let Some((x, y)) = state.instr(copy)?.copy_pair() else {
            return Ok(false);
        };
        if x == y {
            return Ok(false);
        }

        let uses = Self::reachable_uses(state, copy, x)?;
        if uses.is_empty() || !Self::holds_at_uses(state, copy, (x, y), &uses)? {
            return Ok(false);
        }

        let text = state.display_instruction(copy)?;
        for &use_instr in &uses {
            state.instr_mut(use_instr)?.replace_use(x, y);
        }
        state.remove_instr(copy)?;

        debug!("cp: propagated '{}' into {} uses", text, uses.len());
        changes
            .record(EventKind::CopyPropagated)
            .pass(PassId::CopyPropagation.to_string())
            .message(format!("{} into {} uses", text, uses.len()));
        changes
            .record(EventKind::InstructionRemoved)
            .pass(PassId::CopyPropagation.to_string())
            .message(text);
        Ok(true)
    }
}

impl Pass for CopyPropagationPass {
    fn id(&self) -> PassId {
        PassId::CopyPropagation
    }

    fn kind(&self) -> PassKind {
        PassKind::Optimization
    }

    fn description(&self) -> &'static str {
        "Replace uses of copied variables with their source"
    }

    fn dependencies(&self) -> &'static [PassId] {
        &[PassId::Sets]
    }

    fn invalidates(&self) -> &'static [PassId] {
        &[PassId::Sets, PassId::Dominators]
    }

    fn run(&self, state: &mut AnalysisState, ctx: &mut PassContext<'_>) -> Result<bool> {
        let mut changes = EventLog::new();
        let pass = PassId::CopyPropagation.to_string();
        let blocks_before = state.block_count();

        let created = split_blocks(state)?;
        if created > 0 {
            changes
                .record(EventKind::BlocksSplit)
                .pass(pass.clone())
                .message(format!("{created} blocks created"));
        }
        compute_sets(state)?;

        let mut propagated = 0usize;
        let candidates = state.definitions().to_vec();
        let mut stale = false;
        for copy in candidates {
            if !state.contains_instr(copy) {
                continue;
            }
            if stale {
                compute_sets(state)?;
                stale = false;
            }
            if Self::propagate(state, copy, &mut changes)? {
                propagated += 1;
                stale = true;
            }
        }

        let removed = merge_blocks(state)?;
        if removed > 0 {
            changes
                .record(EventKind::BlocksMerged)
                .pass(pass)
                .message(format!("{removed} blocks removed"));
        }

        debug!(
            "cp: {} copies propagated, {} blocks split, {} merged",
            propagated, created, removed
        );
        ctx.events.merge(changes);
        Ok(propagated > 0 || state.block_count() != blocks_before)
    }
}
