//! Round-robin data flow solver.
//!
//! # Algorithm
//!
//! 1. Every set starts empty over the analysis universe
//! 2. The boundary block (entry or exit) gets its fixed value on both sides
//! 3. Every other block gets the analysis seed on its transfer side
//! 4. Sweep all non-boundary blocks in block order:
//!    a. Meet the neighbours' transfer-side values
//!    b. Apply the transfer function
//!    c. Replace the stored value if it differs
//! 5. Repeat until a full sweep changes nothing
//!
//! Stored values are always replaced by freshly computed sets, never mutated
//! in place, so the change test compares two independent values.
//!
//! # Termination
//!
//! Transfer functions are monotone and sets only grow (union) or only shrink
//! (intersection) from their seed, so each block changes at most
//! `universe` times.

use log::{debug, trace};

use crate::{
    analysis::dataflow::framework::{AnalysisResults, DataFlowAnalysis, Direction, Meet},
    ir::AnalysisState,
    utils::BitSet,
    Result,
};

/// Fixpoint solver for a [`DataFlowAnalysis`].
///
/// # Usage
///
/// ```rust
/// use tacflow::analysis::{compute_local_sets, DataFlowSolver, LiveVariables};
/// # use tacflow::ir::{CfgBuilder, Operand};
/// # let mut builder = CfgBuilder::new();
/// # let body = builder.block();
/// # let x = builder.var("x");
/// # builder.ret(body, x)?;
/// # let (entry, exit) = (builder.entry(), builder.exit());
/// # builder.edge(entry, body).edge(body, exit);
/// # let mut state = builder.finish()?;
///
/// compute_local_sets(&mut state)?;
/// let results = DataFlowSolver::new(LiveVariables).solve(&state)?;
/// assert_eq!(results.in_state(body).map(|s| s.count()), Some(1));
/// # Ok::<(), tacflow::Error>(())
/// ```
pub struct DataFlowSolver<A: DataFlowAnalysis> {
    /// The analysis being solved.
    analysis: A,
    /// Whether to record the transfer-side values after every sweep.
    record_history: bool,
}

impl<A: DataFlowAnalysis> DataFlowSolver<A> {
    /// Creates a new solver for the given analysis.
    #[must_use]
    pub fn new(analysis: A) -> Self {
        Self {
            analysis,
            record_history: false,
        }
    }

    /// Records the transfer-side values after every sweep.
    #[must_use]
    pub fn with_history(mut self) -> Self {
        self.record_history = true;
        self
    }

    /// Returns the analysis being solved.
    pub fn analysis(&self) -> &A {
        &self.analysis
    }

    /// Solves the data flow analysis to a fixpoint.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvariantViolation`] if a local set does not
    /// match the analysis universe or a block handle is dangling.
    pub fn solve(&self, state: &AnalysisState) -> Result<AnalysisResults> {
        let universe = self.analysis.universe(state);
        let capacity = state.block_capacity();
        let boundary = match A::DIRECTION {
            Direction::Forward => state.entry(),
            Direction::Backward => state.exit(),
        };

        let mut in_states = vec![BitSet::new(universe); capacity];
        let mut out_states = vec![BitSet::new(universe); capacity];

        for &block in state.block_order() {
            let idx = block.index();
            if block == boundary {
                let value = self.analysis.boundary(state, universe);
                in_states[idx] = value.clone();
                out_states[idx] = value;
                continue;
            }
            let seed = self.analysis.initial(state, block, universe)?;
            match A::DIRECTION {
                Direction::Forward => out_states[idx] = seed,
                Direction::Backward => in_states[idx] = seed,
            }
        }

        let mut sweeps = 0;
        let mut history = Vec::new();
        loop {
            sweeps += 1;
            let mut changed = false;

            for &block in state.block_order() {
                if block == boundary {
                    continue;
                }
                let idx = block.index();
                let bb = state.block(block)?;
                let (neighbours, sources) = match A::DIRECTION {
                    Direction::Forward => (bb.predecessors(), &out_states),
                    Direction::Backward => (bb.successors(), &in_states),
                };

                let mut merged = match A::MEET {
                    Meet::Union => BitSet::new(universe),
                    Meet::Intersection => BitSet::with_value(universe, !neighbours.is_empty()),
                };
                for &n in neighbours {
                    let value = sources
                        .get(n.index())
                        .ok_or_else(|| invariant_error!("dangling neighbour {}", n))?;
                    match A::MEET {
                        Meet::Union => merged.union_with(value)?,
                        Meet::Intersection => merged.intersect_with(value)?,
                    };
                }

                let result = self.analysis.transfer(state, block, &merged)?;
                let (meet_side, transfer_side) = match A::DIRECTION {
                    Direction::Forward => (&mut in_states, &mut out_states),
                    Direction::Backward => (&mut out_states, &mut in_states),
                };
                meet_side[idx] = merged;
                if result != transfer_side[idx] {
                    trace!(
                        "{}: {} changed to {:?}",
                        self.analysis.name(),
                        state.block_name(block),
                        result
                    );
                    transfer_side[idx] = result;
                    changed = true;
                }
            }

            if self.record_history {
                history.push(match A::DIRECTION {
                    Direction::Forward => out_states.clone(),
                    Direction::Backward => in_states.clone(),
                });
            }
            if !changed {
                break;
            }
        }

        debug!(
            "{} converged after {} sweeps over {} blocks",
            self.analysis.name(),
            sweeps,
            state.block_count()
        );

        Ok(AnalysisResults {
            in_states,
            out_states,
            sweeps,
            history,
        })
    }

    /// Solves the analysis and stores the results into the block facts.
    ///
    /// Returns the number of sweeps.
    ///
    /// # Errors
    ///
    /// See [`solve`](Self::solve).
    pub fn solve_into(&self, state: &mut AnalysisState) -> Result<usize> {
        let results = self.solve(state)?;
        results.store(&self.analysis, state)?;
        Ok(results.sweeps)
    }
}
