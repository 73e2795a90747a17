//! Data flow analysis framework trait, direction and meet.
//!
//! Every global analysis of the engine is a bit-vector problem over a fixed
//! universe. An analysis implements [`DataFlowAnalysis`] to describe its
//! universe, boundary, seed and transfer function; the
//! [`DataFlowSolver`](super::DataFlowSolver) iterates it to a fixpoint.

use crate::{
    ir::{AnalysisState, BlockFacts, BlockId},
    utils::BitSet,
    Result,
};

/// Direction of data flow analysis.
///
/// The direction decides which neighbours feed the meet and which side of a
/// block the transfer function produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Information flows forward, from entry to exit.
    ///
    /// `in[B]` is the meet over predecessors, `out[B] = transfer(B, in[B])`.
    ///
    /// Examples: reaching definitions, available expressions, dominators.
    Forward,

    /// Information flows backward, from exit to entry.
    ///
    /// `out[B]` is the meet over successors, `in[B] = transfer(B, out[B])`.
    ///
    /// Examples: live variables, definition-use chains.
    Backward,
}

/// How neighbour values are combined at a merge point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meet {
    /// May-analysis: a fact holds if it holds on some path.
    Union,
    /// Must-analysis: a fact holds only if it holds on every path.
    ///
    /// A block without neighbours meets to the empty set.
    Intersection,
}

/// A bit-vector data flow analysis over the blocks of an [`AnalysisState`].
///
/// The boundary block is `Entry` for forward analyses and `Exit` for
/// backward ones; it is never recomputed and both of its sides hold
/// [`boundary`](Self::boundary).
///
/// For forward analyses: `out[B] = transfer(B, in[B])`
/// For backward analyses: `in[B] = transfer(B, out[B])`
pub trait DataFlowAnalysis {
    /// The direction of this analysis.
    const DIRECTION: Direction;

    /// The meet operator of this analysis.
    const MEET: Meet;

    /// Short name used in log output.
    fn name(&self) -> &'static str;

    /// Returns the number of bits of every set of this analysis.
    fn universe(&self, state: &AnalysisState) -> usize;

    /// Returns the fixed value of the boundary block.
    ///
    /// The default is the empty set.
    fn boundary(&self, _state: &AnalysisState, universe: usize) -> BitSet {
        BitSet::new(universe)
    }

    /// Returns the value the transfer side of `block` holds before the first
    /// sweep.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvariantViolation`] if a local set was built
    /// for a different universe.
    fn initial(&self, state: &AnalysisState, block: BlockId, universe: usize) -> Result<BitSet>;

    /// Computes the transfer function for a block.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvariantViolation`] if a local set was built
    /// for a different universe.
    fn transfer(&self, state: &AnalysisState, block: BlockId, input: &BitSet) -> Result<BitSet>;

    /// Writes the final `in`/`out` pair of a block into its facts.
    fn store(&self, facts: &mut BlockFacts, in_set: BitSet, out_set: BitSet);
}

/// Results of a data flow analysis.
///
/// States are indexed by the raw index of a [`BlockId`]; removed arena slots
/// hold empty sets.
#[derive(Debug, Clone)]
pub struct AnalysisResults {
    /// Value on block entry.
    pub in_states: Vec<BitSet>,
    /// Value on block exit.
    pub out_states: Vec<BitSet>,
    /// Number of full sweeps until nothing changed.
    pub sweeps: usize,
    /// Transfer-side values after every sweep, if history was requested.
    pub history: Vec<Vec<BitSet>>,
}

impl AnalysisResults {
    /// Returns the entry value of a block.
    #[must_use]
    pub fn in_state(&self, block: BlockId) -> Option<&BitSet> {
        self.in_states.get(block.index())
    }

    /// Returns the exit value of a block.
    #[must_use]
    pub fn out_state(&self, block: BlockId) -> Option<&BitSet> {
        self.out_states.get(block.index())
    }

    /// Copies the results into the facts of every live block.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvariantViolation`] for a dangling handle.
    pub fn store<A: DataFlowAnalysis>(&self, analysis: &A, state: &mut AnalysisState) -> Result<()> {
        let order = state.block_order().to_vec();
        for block in order {
            let (Some(in_set), Some(out_set)) = (self.in_state(block), self.out_state(block))
            else {
                return Err(invariant_error!("no result computed for block {}", block));
            };
            let facts = &mut state.block_mut(block)?.facts;
            analysis.store(facts, in_set.clone(), out_set.clone());
        }
        Ok(())
    }
}
