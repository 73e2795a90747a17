//! Basic blocks and their per-analysis scratch sets.

use crate::{
    ir::{BlockId, InstrId},
    utils::BitSet,
};

/// Fact sets attached to a block.
///
/// The local sets are rebuilt by
/// [`compute_local_sets`](crate::analysis::compute_local_sets); the
/// fixpoint sets are written by the corresponding global analysis. A set whose
/// analysis has not run yet is empty with length zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockFacts {
    /// Definitions generated by the block (universe: `definitions`).
    pub gen: BitSet,
    /// Definitions killed by the block (universe: `definitions`).
    pub kill: BitSet,
    /// Upward-exposed variable reads (universe: names).
    pub uses: BitSet,
    /// Variables written in the block (universe: names).
    pub defs: BitSet,
    /// Expressions computed and not killed afterwards (universe: `expressions`).
    pub e_gen: BitSet,
    /// Expressions invalidated by a write (universe: `expressions`).
    pub e_kill: BitSet,
    /// Copies surviving to the block end (universe: `definitions`).
    pub c_gen: BitSet,
    /// Foreign copies broken by a write (universe: `definitions`).
    pub c_kill: BitSet,
    /// Upward-exposed uses (universe: `du_chains`).
    pub du_use: BitSet,
    /// Uses elsewhere of variables written here (universe: `du_chains`).
    pub du_def: BitSet,

    /// Reaching definitions on entry.
    pub in_rd: BitSet,
    /// Reaching definitions on exit.
    pub out_rd: BitSet,
    /// Live variables on entry.
    pub in_lv: BitSet,
    /// Live variables on exit.
    pub out_lv: BitSet,
    /// Available expressions on entry.
    pub e_in: BitSet,
    /// Available expressions on exit.
    pub e_out: BitSet,
    /// Dominators of the block (universe: block arena).
    pub dom: BitSet,
    /// Reaching copies on entry.
    pub c_in: BitSet,
    /// Reaching copies on exit.
    pub c_out: BitSet,
    /// Reachable uses on entry.
    pub du_in: BitSet,
    /// Reachable uses on exit.
    pub du_out: BitSet,
}

/// A basic block: an ordered instruction list plus CFG adjacency.
///
/// Blocks never own each other; successors and predecessors are handles into
/// the block arena of the [`AnalysisState`](crate::ir::AnalysisState).
#[derive(Debug, Clone, Default)]
pub struct BasicBlock {
    pub(crate) instrs: Vec<InstrId>,
    pub(crate) succs: Vec<BlockId>,
    pub(crate) preds: Vec<BlockId>,
    /// Fact sets computed by the analyses.
    pub facts: BlockFacts,
}

impl BasicBlock {
    /// Returns the instructions of the block in execution order.
    #[must_use]
    pub fn instructions(&self) -> &[InstrId] {
        &self.instrs
    }

    /// Returns the successor blocks.
    #[must_use]
    pub fn successors(&self) -> &[BlockId] {
        &self.succs
    }

    /// Returns the predecessor blocks.
    #[must_use]
    pub fn predecessors(&self) -> &[BlockId] {
        &self.preds
    }

    /// Returns `true` if the block lists no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    /// Returns the facts computed for this block.
    #[must_use]
    pub const fn facts(&self) -> &BlockFacts {
        &self.facts
    }

    /// Replaces every occurrence of `old` in the successor list.
    pub(crate) fn replace_successor(&mut self, old: BlockId, new: BlockId) {
        for succ in &mut self.succs {
            if *succ == old {
                *succ = new;
            }
        }
    }

    /// Replaces every occurrence of `old` in the predecessor list.
    pub(crate) fn replace_predecessor(&mut self, old: BlockId, new: BlockId) {
        for pred in &mut self.preds {
            if *pred == old {
                *pred = new;
            }
        }
    }
}
