//! Event logging for the pass pipeline.
//!
//! Every transformation a pass performs is recorded as an [`Event`]. The log
//! can be inspected for debugging and reporting, or ignored.
//!
//! # Example
//!
//! ```rust
//! use tacflow::compiler::{EventKind, EventLog};
//!
//! let mut log = EventLog::new();
//! log.record(EventKind::CopyPropagated)
//!     .pass("CP")
//!     .message("x -> y in BB3");
//! log.record(EventKind::InstructionRemoved);
//!
//! assert_eq!(log.len(), 2);
//! assert_eq!(log.count(EventKind::CopyPropagated), 1);
//! ```

use std::{collections::BTreeMap, fmt};

/// Categories of events that can be logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    /// A computation was replaced by a copy of a shared temporary.
    CommonSubexpression,
    /// The uses of a copy were rewritten to its source.
    CopyPropagated,
    /// A derived induction variable was rewritten to an incremented temporary.
    StrengthReduced,
    /// A preheader block was inserted in front of a loop header.
    PreheaderInserted,
    /// An instruction was removed.
    InstructionRemoved,
    /// Blocks were split into single-instruction blocks.
    BlocksSplit,
    /// Chains of blocks were merged.
    BlocksMerged,
    /// A pass started.
    PassStarted,
    /// A pass completed.
    PassCompleted,
}

impl EventKind {
    /// Returns a human-readable description of this event kind.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::CommonSubexpression => "common subexpression eliminated",
            Self::CopyPropagated => "copy propagated",
            Self::StrengthReduced => "strength reduced",
            Self::PreheaderInserted => "preheader inserted",
            Self::InstructionRemoved => "instruction removed",
            Self::BlocksSplit => "blocks split",
            Self::BlocksMerged => "blocks merged",
            Self::PassStarted => "pass started",
            Self::PassCompleted => "pass completed",
        }
    }

    /// Returns true if this event represents a change to the IR.
    #[must_use]
    pub fn is_transformation(&self) -> bool {
        !matches!(self, Self::PassStarted | Self::PassCompleted)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A single logged event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// The type of event.
    pub kind: EventKind,
    /// Human-readable description.
    pub message: String,
    /// Associated pass name (if from a pass).
    pub pass: Option<String>,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pass {
            Some(pass) => write!(f, "[{}] {}: {}", pass, self.kind, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

/// Builder for creating events with a fluent API.
///
/// Created by [`EventLog::record`]. The event is added to the log when the
/// builder is dropped.
pub struct EventBuilder<'a> {
    log: &'a mut EventLog,
    kind: EventKind,
    message: Option<String>,
    pass: Option<String>,
}

impl<'a> EventBuilder<'a> {
    fn new(log: &'a mut EventLog, kind: EventKind) -> Self {
        Self {
            log,
            kind,
            message: None,
            pass: None,
        }
    }

    /// Sets a custom message describing the event.
    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Associates this event with a specific pass.
    pub fn pass(mut self, pass_name: impl Into<String>) -> Self {
        self.pass = Some(pass_name.into());
        self
    }
}

impl Drop for EventBuilder<'_> {
    fn drop(&mut self) {
        let message = self
            .message
            .take()
            .unwrap_or_else(|| self.kind.description().to_string());

        self.log.events.push(Event {
            kind: self.kind,
            message,
            pass: self.pass.take(),
        });
    }
}

/// Collection of events from a pipeline run.
///
/// Statistics are derived from the events rather than tracked separately.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    /// Creates an empty event log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no events have been logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns the total number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Starts building a new event of the given kind.
    ///
    /// The event is added when the builder is dropped.
    pub fn record(&mut self, kind: EventKind) -> EventBuilder<'_> {
        EventBuilder::new(self, kind)
    }

    /// Returns all events in the order they were recorded.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// Returns the number of events of one kind.
    #[must_use]
    pub fn count(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    /// Returns the number of events per kind, for the kinds that occurred.
    #[must_use]
    pub fn counts(&self) -> BTreeMap<EventKind, usize> {
        let mut counts = BTreeMap::new();
        for event in &self.events {
            *counts.entry(event.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Returns true if any event changed the IR.
    #[must_use]
    pub fn has_transformations(&self) -> bool {
        self.events.iter().any(|e| e.kind.is_transformation())
    }

    /// Appends every event of `other`.
    pub fn merge(&mut self, other: EventLog) {
        self.events.extend(other.events);
    }

    /// Returns a one-line summary of the transformation counts.
    #[must_use]
    pub fn summary(&self) -> String {
        let parts: Vec<String> = self
            .counts()
            .into_iter()
            .filter(|(kind, _)| kind.is_transformation())
            .map(|(kind, n)| format!("{n} {kind}"))
            .collect();
        if parts.is_empty() {
            "no changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_records_on_drop() {
        let mut log = EventLog::new();
        log.record(EventKind::StrengthReduced)
            .pass("SR")
            .message("j = i * 4");
        let event = log.iter().next().unwrap();
        assert_eq!(event.kind, EventKind::StrengthReduced);
        assert_eq!(event.pass.as_deref(), Some("SR"));
        assert_eq!(event.to_string(), "[SR] strength reduced: j = i * 4");
    }

    #[test]
    fn test_default_message_is_description() {
        let mut log = EventLog::new();
        log.record(EventKind::BlocksMerged);
        assert_eq!(log.iter().next().unwrap().message, "blocks merged");
    }

    #[test]
    fn test_counts_and_summary() {
        let mut log = EventLog::new();
        log.record(EventKind::PassStarted);
        log.record(EventKind::CopyPropagated);
        log.record(EventKind::CopyPropagated);
        log.record(EventKind::InstructionRemoved);

        assert_eq!(log.count(EventKind::CopyPropagated), 2);
        assert_eq!(log.counts().get(&EventKind::PassStarted), Some(&1));
        assert!(log.has_transformations());
        assert_eq!(log.summary(), "2 copy propagated, 1 instruction removed");

        let mut other = EventLog::new();
        other.record(EventKind::PassCompleted);
        log.merge(other);
        assert_eq!(log.len(), 5);
    }

    #[test]
    fn test_empty_summary() {
        let log = EventLog::new();
        assert!(log.is_empty());
        assert_eq!(log.summary(), "no changes");
    }
}
