//! Three-address-code intermediate representation.
//!
//! The IR is a flat list of instructions grouped into basic blocks, with one
//! synthetic `Entry` and one synthetic `Exit` block that never hold
//! instructions. Everything lives in the [`AnalysisState`] arena:
//!
//! ```text
//!   AnalysisState
//!   ├── names        "a", "b", "L1", "cse1", ...        (NameId)
//!   ├── instructions Unary / Binary / Cond / ...       (InstrId, owner: BlockId)
//!   ├── blocks       instrs + succs + preds + facts     (BlockId)
//!   └── tables       definitions, expressions, du_chains
//! ```
//!
//! Textual forms, as rendered by the display helpers:
//!
//! | Kind     | Form                                       |
//! |----------|--------------------------------------------|
//! | `Unary`  | `x = y`, `x = 4`, `x = a[i]`, `a[2] = y`   |
//! | `Binary` | `x = a + b`                                |
//! | `Cond`   | `ifTrue a < b goto L1 else goto L2`        |
//! | `Uncond` | `goto L1`                                  |
//! | `Label`  | `L1:`                                      |
//! | `Return` | `return x`                                 |
//!
//! A front end hands its result over through [`CfgBuilder`].

mod block;
mod builder;
mod ids;
mod instruction;
mod operand;
mod state;

pub use block::{BasicBlock, BlockFacts};
pub use builder::CfgBuilder;
pub use ids::{BlockId, InstrId, NameId};
pub use instruction::{Instruction, InstructionKind};
pub use operand::{BinaryOp, Expression, Operand, Subscript};
pub use state::AnalysisState;
