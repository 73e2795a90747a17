//! # tacflow Prelude
//!
//! This module provides a convenient prelude for the most commonly used types
//! and traits from the tacflow library.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all tacflow operations
pub use crate::Error;

/// The result type used throughout tacflow
pub use crate::Result;

// ================================================================================================
// IR
// ================================================================================================

/// Arena, handles and builder
pub use crate::ir::{AnalysisState, BlockId, CfgBuilder, InstrId, NameId};

/// Instructions and operands
pub use crate::ir::{BinaryOp, Expression, Instruction, InstructionKind, Operand, Subscript};

/// Fixed-universe bit set
pub use crate::utils::BitSet;

// ================================================================================================
// Analyses
// ================================================================================================

/// Dataflow analyses
pub use crate::analysis::{
    compute_available_expressions, compute_dominators, compute_live_variables,
    compute_local_sets, compute_reaching_definitions, compute_sets,
};

/// CFG rewrites and loop analyses
pub use crate::analysis::{
    induction_variables, insert_preheader, loop_invariants, merge_blocks, natural_loops,
    split_blocks, InductionVar,
};

// ================================================================================================
// Passes and Scheduling
// ================================================================================================

/// Pass interface and scheduler
pub use crate::compiler::{
    EventKind, EventLog, Pass, PassContext, PassId, PassKind, PassScheduler, SchedulerConfig,
};
