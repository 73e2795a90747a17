//! Natural loop discovery.
//!
//! # Loop Structure
//!
//! ```text
//!     [preheader]     <- inserted by strength reduction
//!          |
//!          v
//!     [header] <------+  <- dominates every member
//!          |          |
//!          v          |
//!     [body ...]      |
//!          |          |
//!          v          |
//!     [latch] --------+  <- source of a back edge
//! ```
//!
//! An edge `latch -> header` is a back edge when `header` dominates `latch`.
//! The natural loop of a back edge is the header plus every block that
//! reaches the latch backwards without passing through the header. Loops
//! sharing a header are unioned.

use std::collections::BTreeMap;

use log::debug;

use crate::{
    ir::{AnalysisState, BlockId},
    utils::BitSet,
    Result,
};

/// Returns every back edge `(latch, header)` according to the stored `dom`
/// sets, in block order.
///
/// # Errors
///
/// Returns [`crate::Error::InvariantViolation`] if the dominator sets were
/// not computed for the current block graph.
pub fn back_edges(state: &AnalysisState) -> Result<Vec<(BlockId, BlockId)>> {
    if !state.dominators_current() {
        return Err(invariant_error!(
            "dominators are stale: the block graph changed since they were computed"
        ));
    }
    let mut edges = Vec::new();
    for &block in state.block_order() {
        let bb = state.block(block)?;
        let dom = &bb.facts().dom;
        for &succ in bb.successors() {
            if dom.contains(succ.index()) {
                edges.push((block, succ));
            }
        }
    }
    Ok(edges)
}

/// Computes the natural loops of the current graph, header to member blocks.
///
/// Requires up-to-date dominator sets.
///
/// # Errors
///
/// Returns [`crate::Error::InvariantViolation`] if the dominator sets are
/// stale or a handle is dangling.
pub fn natural_loops(state: &AnalysisState) -> Result<BTreeMap<BlockId, BitSet>> {
    let capacity = state.block_capacity();
    let mut loops: BTreeMap<BlockId, BitSet> = BTreeMap::new();

    for (latch, header) in back_edges(state)? {
        let body = loops.entry(header).or_insert_with(|| {
            let mut body = BitSet::new(capacity);
            body.insert(header.index());
            body
        });
        expand_loop_body(state, body, latch)?;
    }

    debug!("natural loops: {} headers", loops.len());
    Ok(loops)
}

/// Adds every block reaching `latch` backwards without passing the header
/// (already in `body`).
fn expand_loop_body(state: &AnalysisState, body: &mut BitSet, latch: BlockId) -> Result<()> {
    let mut worklist = vec![latch];
    while let Some(block) = worklist.pop() {
        if body.contains(block.index()) {
            continue;
        }
        body.insert(block.index());
        for &pred in state.block(block)?.predecessors() {
            if !body.contains(pred.index()) {
                worklist.push(pred);
            }
        }
    }
    Ok(())
}

/// Computes the natural loops and stores them in the state.
///
/// # Errors
///
/// See [`natural_loops`].
pub fn compute_natural_loops(state: &mut AnalysisState) -> Result<()> {
    let loops = natural_loops(state)?;
    state.set_loops(loops);
    Ok(())
}
