//! Scheduler configuration.

use std::collections::BTreeSet;

use strum::IntoEnumIterator;

use crate::compiler::PassId;

/// What the [`PassScheduler`](crate::compiler::PassScheduler) should run.
///
/// # Example
///
/// ```rust
/// use tacflow::compiler::{PassId, SchedulerConfig};
///
/// let config = SchedulerConfig::new()
///     .with_pass(PassId::Cse)
///     .with_verbose(PassId::AvailableExpressions)
///     .with_max_rounds(8);
///
/// assert!(config.requests(PassId::AvailableExpressions));
/// assert!(!config.is_verbose(PassId::Cse));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Passes to run.
    pub requested: BTreeSet<PassId>,
    /// Passes whose facts are written to the report sink.
    pub verbose: BTreeSet<PassId>,
    /// Upper bound on optimization rounds; unbounded when `None`.
    pub max_rounds: Option<usize>,
}

impl SchedulerConfig {
    /// Creates a configuration that requests nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration that requests every pass.
    #[must_use]
    pub fn all() -> Self {
        Self {
            requested: PassId::iter().collect(),
            ..Self::default()
        }
    }

    /// Requests a pass.
    #[must_use]
    pub fn with_pass(mut self, pass: PassId) -> Self {
        self.requested.insert(pass);
        self
    }

    /// Requests a pass and makes it report its facts.
    #[must_use]
    pub fn with_verbose(mut self, pass: PassId) -> Self {
        self.requested.insert(pass);
        self.verbose.insert(pass);
        self
    }

    /// Limits the number of optimization rounds.
    #[must_use]
    pub fn with_max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = Some(rounds);
        self
    }

    /// Returns true if `pass` was requested.
    #[must_use]
    pub fn requests(&self, pass: PassId) -> bool {
        self.requested.contains(&pass)
    }

    /// Returns true if `pass` reports its facts.
    #[must_use]
    pub fn is_verbose(&self, pass: PassId) -> bool {
        self.verbose.contains(&pass)
    }
}

#[cfg(test)]
mod tests {
    use strum::EnumCount;

    use super::*;

    #[test]
    fn test_all_requests_every_pass() {
        let config = SchedulerConfig::all();
        assert_eq!(config.requested.len(), PassId::COUNT);
        assert!(config.verbose.is_empty());
        assert_eq!(config.max_rounds, None);
    }

    #[test]
    fn test_verbose_implies_requested() {
        let config = SchedulerConfig::new().with_verbose(PassId::LiveVariables);
        assert!(config.requests(PassId::LiveVariables));
        assert!(config.is_verbose(PassId::LiveVariables));
        assert!(!config.requests(PassId::Sets));
    }
}
