//! The pass interface.
//!
//! Every analysis and optimization the scheduler can run implements [`Pass`].
//! A pass declares the analyses it depends on and, for optimizations, the
//! analyses its rewrites invalidate; the scheduler validates both before
//! anything runs.

use std::fmt;

use strum::{Display, EnumCount, EnumIter, EnumString, IntoStaticStr};

use crate::{compiler::EventLog, ir::AnalysisState, Result};

/// Identifier of a registered pass.
///
/// The string forms are the short flag names used to request a pass.
///
/// ```rust
/// use std::str::FromStr;
/// use tacflow::compiler::PassId;
///
/// assert_eq!(PassId::from_str("CSE").ok(), Some(PassId::Cse));
/// assert_eq!(PassId::ReachingDefinitions.to_string(), "RD");
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumCount,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
pub enum PassId {
    /// Local sets, reaching copies and du-chains.
    #[strum(serialize = "SETS")]
    Sets,
    /// Reaching definitions.
    #[strum(serialize = "RD")]
    ReachingDefinitions,
    /// Live variables.
    #[strum(serialize = "LV")]
    LiveVariables,
    /// Available expressions.
    #[strum(serialize = "AE")]
    AvailableExpressions,
    /// Dominators.
    #[strum(serialize = "CD")]
    Dominators,
    /// Natural loops.
    #[strum(serialize = "NL")]
    NaturalLoops,
    /// Loop-invariant computations.
    #[strum(serialize = "LI")]
    LoopInvariants,
    /// Induction variables.
    #[strum(serialize = "IV")]
    InductionVariables,
    /// Common subexpression elimination.
    #[strum(serialize = "CSE")]
    Cse,
    /// Copy propagation.
    #[strum(serialize = "CP")]
    CopyPropagation,
    /// Strength reduction of derived induction variables.
    #[strum(serialize = "SR")]
    StrengthReduction,
}

/// Whether a pass only computes facts or rewrites the IR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    /// Computes facts; never changes the IR.
    Analysis,
    /// Rewrites the IR and reports whether anything changed.
    Optimization,
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Analysis => f.write_str("analysis"),
            Self::Optimization => f.write_str("optimization"),
        }
    }
}

/// Per-run context handed to a pass.
pub struct PassContext<'a> {
    /// Where transformations are recorded.
    pub events: &'a mut EventLog,
    /// Where a verbose pass writes its facts; `None` when not verbose.
    pub sink: Option<&'a mut dyn fmt::Write>,
}

impl<'a> PassContext<'a> {
    /// Creates a context without a report sink.
    pub fn new(events: &'a mut EventLog) -> Self {
        Self { events, sink: None }
    }

    /// Creates a context whose pass reports into `sink`.
    pub fn verbose(events: &'a mut EventLog, sink: &'a mut dyn fmt::Write) -> Self {
        Self {
            events,
            sink: Some(sink),
        }
    }

    /// Returns true if the pass should report its facts.
    #[must_use]
    pub fn is_verbose(&self) -> bool {
        self.sink.is_some()
    }
}

/// A pass the [`PassScheduler`](crate::compiler::PassScheduler) can run.
pub trait Pass {
    /// Returns the identifier of this pass.
    fn id(&self) -> PassId;

    /// Returns whether this pass is an analysis or an optimization.
    fn kind(&self) -> PassKind;

    /// Returns a short human-readable description.
    fn description(&self) -> &'static str;

    /// Returns the analyses that must have run before this pass.
    fn dependencies(&self) -> &'static [PassId] {
        &[]
    }

    /// Returns the analyses whose facts this pass invalidates when it changes
    /// the IR. Only meaningful for optimizations.
    fn invalidates(&self) -> &'static [PassId] {
        &[]
    }

    /// Runs the pass.
    ///
    /// Returns `true` if the IR changed. Analyses always return `false`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvariantViolation`] if the state is
    /// inconsistent, or [`crate::Error::Report`] if the report sink fails.
    fn run(&self, state: &mut AnalysisState, ctx: &mut PassContext<'_>) -> Result<bool>;
}
