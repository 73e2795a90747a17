//! Pass infrastructure: optimizations and the scheduler that drives them.
//!
//! This module sits on top of the analyses:
//!
//! - [`crate::ir`] - the arena IR and its derived tables
//! - [`crate::analysis`] - dataflow facts, CFG rewrites, loop analyses
//! - [`compiler`](self) - passes, scheduling, events, verbose reports
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Pass Pipeline                               │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  SchedulerConfig             Requested passes, verbose flags,    │
//! │                              optional round limit                │
//! │                                                                  │
//! │  PassScheduler               Validated dependency scheduling     │
//! │    ├─ Optimizations           rounds until nothing changes       │
//! │    ├─ Invalidation            transitive over dependencies       │
//! │    └─ Analyses                once more over the final IR        │
//! │                                                                  │
//! │  Pass trait                  Interface for all passes            │
//! │    ├─ dependencies()          analyses required beforehand       │
//! │    ├─ invalidates()           analyses made stale by a change    │
//! │    └─ run()                   compute facts or rewrite the IR    │
//! │                                                                  │
//! │  Passes (11 built-in)                                            │
//! │    ├─ Analyses: SETS, RD, LV, AE, CD, NL, LI, IV                 │
//! │    └─ Optimizations: CSE, CP, SR                                 │
//! │                                                                  │
//! │  EventLog                    Change tracking and diagnostics     │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod events;
mod pass;
pub mod passes;
pub(crate) mod report;
mod scheduler;

pub use config::SchedulerConfig;
pub use events::{Event, EventBuilder, EventKind, EventLog};
pub use pass::{Pass, PassContext, PassId, PassKind};
pub use scheduler::PassScheduler;
