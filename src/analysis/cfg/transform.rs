//! Structural rewrites of the block graph.
//!
//! All three primitives keep the adjacency lists symmetric: whenever `b`
//! appears in `a.succs`, `a` appears in `b.preds` the same number of times.

use log::{debug, trace};

use crate::{
    ir::{AnalysisState, BlockId, InstructionKind},
    utils::BitSet,
    Result,
};

/// Splits every non-sentinel block into single-instruction blocks.
///
/// The first instruction stays in the original block; each further one moves
/// into a new block placed right after its predecessor in block order. The
/// last block of a chain takes over the original successors.
///
/// Returns the number of blocks created.
///
/// # Errors
///
/// Returns [`crate::Error::InvariantViolation`] for a dangling handle.
pub fn split_blocks(state: &mut AnalysisState) -> Result<usize> {
    let order = state.block_order().to_vec();
    let mut created = 0;

    for block in order {
        if state.is_sentinel(block) || state.block(block)?.instrs.len() < 2 {
            continue;
        }

        let rest = state.block(block)?.instrs[1..].to_vec();
        let old_succs = std::mem::take(&mut state.block_mut(block)?.succs);

        let mut prev = block;
        for instr in rest {
            let next = state.insert_block_after(prev)?;
            state.move_instr_to(instr, next)?;
            state.block_mut(prev)?.succs.push(next);
            state.block_mut(next)?.preds.push(prev);
            prev = next;
            created += 1;
        }

        for &succ in &old_succs {
            state.block_mut(succ)?.replace_predecessor(block, prev);
        }
        state.block_mut(prev)?.succs = old_succs;
        trace!("split {} into a chain ending at {}", block, prev);
    }

    if created > 0 {
        debug!("split blocks: {} blocks created", created);
    }
    Ok(created)
}

/// Merges chains of blocks connected by a sole edge.
///
/// A block absorbs its successor when it has exactly one successor, that
/// successor has exactly one predecessor, and the successor is neither `Exit`
/// nor the block itself. A trailing `goto` of the absorbing block is deleted
/// first. Repeats until nothing merges.
///
/// Returns the number of blocks removed.
///
/// # Errors
///
/// Returns [`crate::Error::InvariantViolation`] for a dangling handle.
pub fn merge_blocks(state: &mut AnalysisState) -> Result<usize> {
    let mut removed = 0;

    loop {
        let mut changed = false;
        let order = state.block_order().to_vec();

        for block in order {
            if !state.contains_block(block) || state.is_sentinel(block) {
                continue;
            }
            while let Some(next) = mergeable_successor(state, block)? {
                absorb(state, block, next)?;
                removed += 1;
                changed = true;
            }
        }

        if !changed {
            break;
        }
    }

    if removed > 0 {
        state.resync_instruction_order()?;
        debug!("merge blocks: {} blocks removed", removed);
    }
    Ok(removed)
}

fn mergeable_successor(state: &AnalysisState, block: BlockId) -> Result<Option<BlockId>> {
    let &[next] = state.block(block)?.successors() else {
        return Ok(None);
    };
    if next == block || state.is_sentinel(next) {
        return Ok(None);
    }
    if state.block(next)?.predecessors() != [block] {
        return Ok(None);
    }
    Ok(Some(next))
}

fn absorb(state: &mut AnalysisState, block: BlockId, next: BlockId) -> Result<()> {
    if let Some(&last) = state.block(block)?.instrs.last() {
        if matches!(state.instr(last)?.kind, InstructionKind::Uncond { .. }) {
            state.remove_instr(last)?;
        }
    }

    let succs = state.block(next)?.succs.clone();
    for &succ in &succs {
        state.block_mut(succ)?.replace_predecessor(next, block);
    }
    state.block_mut(block)?.succs = succs;

    let moved = state.block(next)?.instrs.clone();
    for instr in moved {
        state.move_instr_to(instr, block)?;
    }
    state.remove_block(next)?;
    trace!("merged {} into {}", next, block);
    Ok(())
}

/// Inserts an empty preheader in front of a loop header.
///
/// Only the predecessors outside `body` are redirected to the preheader; back
/// edges keep targeting the header. The preheader is placed right before the
/// header in block order.
///
/// # Errors
///
/// Returns [`crate::Error::InvariantViolation`] if `header` is dangling or a
/// predecessor is not covered by `body`.
pub fn insert_preheader(state: &mut AnalysisState, header: BlockId, body: &BitSet) -> Result<BlockId> {
    let preds = state.block(header)?.preds.clone();
    let mut outside = Vec::new();
    let mut inside = Vec::new();
    for pred in preds {
        if body.get(pred.index())? {
            inside.push(pred);
        } else {
            outside.push(pred);
        }
    }

    let preheader = state.insert_block_before(header)?;
    for &pred in &outside {
        state.block_mut(pred)?.replace_successor(header, preheader);
    }
    let entering = outside.len();
    inside.push(preheader);

    {
        let bb = state.block_mut(preheader)?;
        bb.preds = outside;
        bb.succs = vec![header];
    }
    state.block_mut(header)?.preds = inside;
    trace!(
        "preheader {} inserted before {} for {} entering edges",
        preheader,
        header,
        entering
    );
    Ok(preheader)
}
