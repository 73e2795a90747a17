//! Built-in passes.
//!
//! | Id     | Pass                          | Kind         | Depends on | Invalidates |
//! |--------|-------------------------------|--------------|------------|-------------|
//! | `SETS` | [`SetsPass`]                  | analysis     | -          | -           |
//! | `RD`   | [`ReachingDefinitionsPass`]   | analysis     | SETS       | -           |
//! | `LV`   | [`LiveVariablesPass`]         | analysis     | SETS       | -           |
//! | `AE`   | [`AvailableExpressionsPass`]  | analysis     | SETS       | -           |
//! | `CD`   | [`DominatorsPass`]            | analysis     | -          | -           |
//! | `NL`   | [`NaturalLoopsPass`]          | analysis     | CD         | -           |
//! | `LI`   | [`LoopInvariantsPass`]        | analysis     | RD, NL     | -           |
//! | `IV`   | [`InductionVariablesPass`]    | analysis     | LI         | -           |
//! | `CSE`  | [`CsePass`]                   | optimization | AE         | SETS        |
//! | `CP`   | [`CopyPropagationPass`]       | optimization | SETS       | SETS, CD    |
//! | `SR`   | [`StrengthReductionPass`]     | optimization | RD, CD     | SETS, CD    |
//!
//! Invalidation is transitive: invalidating `SETS` also invalidates every
//! analysis built on it.

mod analyses;
mod copying;
mod cse;
mod strength;

pub use analyses::{
    AvailableExpressionsPass, DominatorsPass, InductionVariablesPass, LiveVariablesPass,
    LoopInvariantsPass, NaturalLoopsPass, ReachingDefinitionsPass, SetsPass,
};
pub use copying::CopyPropagationPass;
pub use cse::CsePass;
pub use strength::StrengthReductionPass;
