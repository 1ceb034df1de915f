//! Activity value object: what happened, and which issue it applies to.
//!
//! An [`Activity`] is immutable once constructed. The payload preserves
//! insertion order (mutation order is stable and therefore testable),
//! and an empty payload is a valid no-op sync, not an error.

use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::field::FieldValue;

/// Category of an incoming activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    /// A domain event (login, webhook firing, task completion).
    Event,
    /// A workflow status change.
    StatusChange,
    /// A performance or business metric.
    Metric,
    /// A free-form note.
    Comment,
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Event => write!(f, "event"),
            Self::StatusChange => write!(f, "status_change"),
            Self::Metric => write!(f, "metric"),
            Self::Comment => write!(f, "comment"),
        }
    }
}

/// An application-level activity to be synchronized onto a remote issue.
///
/// The correlation key either names the target issue directly
/// (`"ABC-123"`) or carries a search criterion the resolver hands to the
/// tracker. Payload entries map logical field names to values; the
/// mapper turns them into mutations in insertion order.
///
/// # Examples
///
/// ```
/// use issuesync::types::{Activity, ActivityKind};
///
/// let activity = Activity::new("ABC-123", ActivityKind::Comment)
///     .with_entry("activity-log", "User logged in");
/// assert_eq!(activity.correlation_key(), "ABC-123");
/// assert_eq!(activity.payload().len(), 1);
/// assert!(!activity.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    correlation_key: String,
    kind: ActivityKind,
    payload: IndexMap<String, FieldValue>,
    occurred_at: DateTime<Utc>,
}

impl Activity {
    /// Creates an activity with an empty payload, occurring now.
    pub fn new(correlation_key: impl Into<String>, kind: ActivityKind) -> Self {
        Self {
            correlation_key: correlation_key.into(),
            kind,
            payload: IndexMap::new(),
            occurred_at: Utc::now(),
        }
    }

    /// Adds a payload entry. Later entries with the same logical name
    /// replace earlier ones without changing their position.
    pub fn with_entry(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.payload.insert(name.into(), value.into());
        self
    }

    /// Overrides the occurrence timestamp (defaults to construction time).
    pub fn with_occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = occurred_at;
        self
    }

    /// The caller-supplied identifier locating the target issue.
    pub fn correlation_key(&self) -> &str {
        &self.correlation_key
    }

    /// Activity category.
    pub fn kind(&self) -> ActivityKind {
        self.kind
    }

    /// Logical field name to value, in insertion order.
    pub fn payload(&self) -> &IndexMap<String, FieldValue> {
        &self.payload
    }

    /// When the activity occurred.
    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    /// `true` when the payload is empty (a no-op sync).
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_preserves_insertion_order() {
        let activity = Activity::new("ABC-1", ActivityKind::Event)
            .with_entry("zeta", "z")
            .with_entry("alpha", "a")
            .with_entry("mid", "m");

        let names: Vec<&str> = activity.payload().keys().map(String::as_str).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn duplicate_entry_keeps_position() {
        let activity = Activity::new("ABC-1", ActivityKind::Event)
            .with_entry("first", "1")
            .with_entry("second", "2")
            .with_entry("first", "updated");

        let names: Vec<&str> = activity.payload().keys().map(String::as_str).collect();
        assert_eq!(names, ["first", "second"]);
        assert_eq!(
            activity.payload()["first"],
            FieldValue::Text("updated".into())
        );
    }

    #[test]
    fn empty_payload_is_noop_not_error() {
        let activity = Activity::new("ABC-1", ActivityKind::Metric);
        assert!(activity.is_empty());
    }

    #[test]
    fn serializes_camel_case() {
        let activity = Activity::new("ABC-1", ActivityKind::StatusChange).with_entry("status", "Done");
        let json = serde_json::to_value(&activity).unwrap();
        assert_eq!(json["correlationKey"], "ABC-1");
        assert_eq!(json["kind"], "status_change");
        assert_eq!(json["payload"]["status"], "Done");
        assert!(json.get("occurredAt").is_some());
    }
}
