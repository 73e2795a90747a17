// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # tacflow
//!
//! Dataflow analysis and control-flow-graph optimization for three-address
//! code. `tacflow` takes a program already split into basic blocks, computes
//! the classic bit-vector facts over it and rewrites it with a small set of
//! fact-driven optimizations.
//!
//! ## Features
//!
//! - **Bit-vector dataflow** - reaching definitions, live variables, available
//!   expressions, reaching copies, definition-use chains, dominators
//! - **Loop analysis** - back edges, natural loops, loop-invariant
//!   computations, basic and derived induction variables
//! - **CFG rewrites** - block splitting and merging, preheader insertion
//! - **Optimizations** - common subexpression elimination, copy propagation,
//!   strength reduction of induction variables
//! - **Scheduling** - passes declare their dependencies and invalidations; the
//!   scheduler validates and orders them and runs optimizations to a fixpoint
//!
//! ## Quick Start
//!
//! ```rust
//! use tacflow::prelude::*;
//!
//! // BB1: a = 1; b = 2; c = a + b; d = a + b; return d
//! let mut builder = CfgBuilder::new();
//! let body = builder.block();
//! let (a, b, c, d) = (builder.var("a"), builder.var("b"), builder.var("c"), builder.var("d"));
//! builder.assign(body, a, Operand::Const(1))?;
//! builder.assign(body, b, Operand::Const(2))?;
//! builder.compute(body, c, BinaryOp::Add, a, b)?;
//! builder.compute(body, d, BinaryOp::Add, a, b)?;
//! builder.ret(body, d)?;
//! let (entry, exit) = (builder.entry(), builder.exit());
//! builder.edge(entry, body).edge(body, exit);
//! let mut state = builder.finish()?;
//!
//! let config = SchedulerConfig::new()
//!     .with_pass(PassId::Cse)
//!     .with_pass(PassId::LiveVariables);
//! let mut events = EventLog::new();
//! PassScheduler::default().run(&mut state, &config, &mut events, None)?;
//!
//! let mut ir = String::new();
//! state.write_ir(&mut ir)?;
//! assert!(ir.contains("d = cse1"));
//! # Ok::<(), tacflow::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`ir`] - the arena IR: names, instructions, blocks and derived tables
//! - [`analysis`] - dataflow analyses, CFG rewrites and loop analyses
//! - [`compiler`] - passes, the scheduler, events and verbose reports
//! - [`utils`] - the fixed-universe [`utils::BitSet`]
//! - [`prelude`] - re-exports of the commonly used types
//!
//! Facts are only valid for the IR they were computed on. Every rewrite
//! leaves the IR consistent and re-analyzable, and the scheduler reruns what a
//! rewrite invalidated.
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`](Result):
//!
//! ```rust
//! use tacflow::{ir::CfgBuilder, Error};
//!
//! match CfgBuilder::new().finish() {
//!     Ok(_) => unreachable!("an empty program is rejected"),
//!     Err(Error::StructuralInput(message)) => println!("rejected: {message}"),
//!     Err(e) => println!("other error: {e}"),
//! }
//! ```
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade and never installs a logger.
//! Rewrite decisions and iteration counts are logged at `debug`, per-block
//! details at `trace`.

#[macro_use]
pub(crate) mod error;

/// Shared fixtures which are used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use tacflow::prelude::*;
///
/// let scheduler = PassScheduler::default();
/// assert!(scheduler.pass(PassId::StrengthReduction).is_some());
/// ```
pub mod prelude;

/// Utility types shared across the crate.
pub mod utils;

/// The three-address-code IR and the arena holding it.
pub mod ir;

/// Dataflow analyses, CFG rewrites and loop analyses.
pub mod analysis;

/// Passes, scheduling, events and verbose reports.
pub mod compiler;

/// `tacflow` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `tacflow` Error type
///
/// Input, scheduling and contract errors, plus failures of a verbose report sink.
pub use error::Error;
