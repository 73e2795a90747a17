//! Control flow graph primitives and loop discovery.
//!
//! The block graph lives directly in [`AnalysisState`](crate::ir::AnalysisState):
//! every block carries its successor and predecessor lists, and `Entry`/`Exit`
//! are ordinary blocks without instructions. This module provides the
//! structural rewrites the optimizations are built on and the natural loop
//! discovery the loop analyses start from.
//!
//! # Key Components
//!
//! - [`split_blocks`] / [`merge_blocks`] - one-instruction blocks and back
//! - [`insert_preheader`] - a single entering block in front of a loop header
//! - [`natural_loops`] - back edges by dominance, loop bodies by backward walk
//!
//! Every rewrite invalidates all facts; the caller recomputes the local sets
//! and whatever global analyses it needs afterwards.
//!
//! # Examples
//!
//! ```rust
//! use tacflow::analysis::{compute_dominators, merge_blocks, natural_loops, split_blocks};
//! # use tacflow::ir::{CfgBuilder, Operand};
//! # let mut builder = CfgBuilder::new();
//! # let body = builder.block();
//! # let (x, y) = (builder.var("x"), builder.var("y"));
//! # builder.assign(body, x, Operand::Const(1))?;
//! # builder.assign(body, y, x)?;
//! # builder.ret(body, y)?;
//! # let (entry, exit) = (builder.entry(), builder.exit());
//! # builder.edge(entry, body).edge(body, exit);
//! # let mut state = builder.finish()?;
//!
//! let created = split_blocks(&mut state)?;
//! assert_eq!(merge_blocks(&mut state)?, created);
//!
//! compute_dominators(&mut state)?;
//! assert!(natural_loops(&state)?.is_empty());
//! # Ok::<(), tacflow::Error>(())
//! ```

mod loops;
mod transform;

pub use loops::{back_edges, compute_natural_loops, natural_loops};
pub use transform::{insert_preheader, merge_blocks, split_blocks};
