//! Field model: payload values, field descriptors, and mutation instructions.
//!
//! A [`FieldSpec`] is the caller-supplied registration of a logical field
//! name; a [`FieldDescriptor`] is that spec plus the remote field id
//! resolved from the tracker's catalog. [`FieldMutation`] is the
//! instruction the engine hands to the client -- deterministic given the
//! issue's previous field value and the activity payload.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single payload value carried by an activity.
///
/// The closed set of value shapes the mapper knows how to render into a
/// remote field. [`render`](FieldValue::render) produces the canonical
/// text form used by append policies and by comment/status/label
/// mutations.
///
/// # Examples
///
/// ```
/// use issuesync::types::FieldValue;
///
/// assert_eq!(FieldValue::Text("User logged in".into()).render(), "User logged in");
/// assert_eq!(FieldValue::Number(5.0).render(), "5");
/// assert_eq!(FieldValue::Flag(true).render(), "true");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Boolean flag.
    Flag(bool),
    /// Numeric value (integers render without a trailing `.0`).
    Number(f64),
    /// Point in time, rendered as RFC 3339.
    Timestamp(DateTime<Utc>),
    /// Free text.
    Text(String),
}

impl FieldValue {
    /// Canonical text rendering used by append policies.
    pub fn render(&self) -> String {
        match self {
            Self::Flag(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
            Self::Timestamp(ts) => ts.to_rfc3339(),
            Self::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for FieldValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

/// The remote type of a resolvable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Free-form text field.
    Text,
    /// Single-select option field.
    Select,
    /// User reference field.
    User,
    /// Numeric field.
    Number,
    /// Date field.
    Date,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Select => write!(f, "select"),
            Self::User => write!(f, "user"),
            Self::Number => write!(f, "number"),
            Self::Date => write!(f, "date"),
        }
    }
}

/// How a payload value is combined with the field's current remote value.
///
/// `AppendIfAbsent` is the idempotency anchor: a retried activity whose
/// text already appears in the remote value produces no mutation, so
/// duplicate log lines never reach the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationPolicy {
    /// Replace the remote value with the payload value.
    Overwrite,
    /// Append the payload value on a new line after the current value.
    AppendNewline,
    /// Append only when the payload value is not already a substring of
    /// the current value.
    AppendIfAbsent,
}

impl fmt::Display for MutationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overwrite => write!(f, "overwrite"),
            Self::AppendNewline => write!(f, "append_newline"),
            Self::AppendIfAbsent => write!(f, "append_if_absent"),
        }
    }
}

/// Caller-supplied registration of one logical field.
///
/// The logical name is stable across the codebase and decoupled from the
/// tracker's field id, so remote schema changes don't ripple through
/// calling code. The registry resolves a spec into a
/// [`FieldDescriptor`] on first use.
///
/// # Examples
///
/// ```
/// use issuesync::types::{FieldKind, FieldSpec, MutationPolicy};
///
/// let spec = FieldSpec::new("activity-log", FieldKind::Text)
///     .with_policy(MutationPolicy::AppendNewline);
/// assert_eq!(spec.logical_name, "activity-log");
/// assert!(!spec.optional);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    /// Stable logical name, unique within a registry.
    pub logical_name: String,

    /// Remote field type.
    pub kind: FieldKind,

    /// How payload values combine with the current remote value.
    pub policy: MutationPolicy,

    /// When `true`, an unresolvable field skips its sub-mutation instead
    /// of aborting the whole activity.
    pub optional: bool,
}

impl FieldSpec {
    /// Creates a spec with `Overwrite` policy and `optional: false`.
    pub fn new(logical_name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            logical_name: logical_name.into(),
            kind,
            policy: MutationPolicy::Overwrite,
            optional: false,
        }
    }

    /// Sets the mutation policy.
    pub fn with_policy(mut self, policy: MutationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Marks the field optional: resolution failure skips the
    /// sub-mutation instead of failing the activity.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// A [`FieldSpec`] plus the remote field id resolved from the tracker.
///
/// Produced and cached by the registry; the `remote_id` is resolved at
/// most once per process per logical name unless invalidated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    /// Stable logical name.
    pub logical_name: String,

    /// Tracker-side field identifier (standard key or custom-field id).
    pub remote_id: String,

    /// Remote field type.
    pub kind: FieldKind,

    /// How payload values combine with the current remote value.
    pub policy: MutationPolicy,

    /// Whether resolution failures skip instead of abort.
    pub optional: bool,
}

impl FieldDescriptor {
    /// Pairs a spec with its resolved remote id.
    pub fn from_spec(spec: &FieldSpec, remote_id: impl Into<String>) -> Self {
        Self {
            logical_name: spec.logical_name.clone(),
            remote_id: remote_id.into(),
            kind: spec.kind,
            policy: spec.policy,
            optional: spec.optional,
        }
    }
}

/// The concrete change applied by one [`FieldMutation`].
///
/// Append variants carry the *final* combined value (previous value plus
/// separator plus payload), so applying a mutation is a plain write on
/// the client side and deterministic given the snapshot it was computed
/// from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MutationOp {
    /// Replace the field value.
    Set { value: FieldValue },
    /// Replace the field text with the pre-combined appended form.
    AppendText { value: String },
    /// Add a label to the issue.
    AddLabel { label: String },
    /// Create a comment on the issue.
    AddComment { body: String },
    /// Move the issue to the named status.
    Transition { status: String },
}

/// One mutation instruction derived from an activity entry.
///
/// Field-scoped ops (`Set`, `AppendText`) carry the resolved remote id;
/// issue-scoped ops (`AddLabel`, `AddComment`, `Transition`) have none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMutation {
    /// Resolved remote field id for field-scoped ops.
    pub remote_id: Option<String>,

    /// The change to apply.
    pub op: MutationOp,
}

impl FieldMutation {
    /// Field overwrite.
    pub fn set(remote_id: impl Into<String>, value: FieldValue) -> Self {
        Self {
            remote_id: Some(remote_id.into()),
            op: MutationOp::Set { value },
        }
    }

    /// Field text replacement with a pre-combined appended value.
    pub fn append_text(remote_id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            remote_id: Some(remote_id.into()),
            op: MutationOp::AppendText {
                value: value.into(),
            },
        }
    }

    /// Issue label addition.
    pub fn add_label(label: impl Into<String>) -> Self {
        Self {
            remote_id: None,
            op: MutationOp::AddLabel {
                label: label.into(),
            },
        }
    }

    /// Issue comment creation.
    pub fn add_comment(body: impl Into<String>) -> Self {
        Self {
            remote_id: None,
            op: MutationOp::AddComment { body: body.into() },
        }
    }

    /// Status transition by target status name.
    pub fn transition(status: impl Into<String>) -> Self {
        Self {
            remote_id: None,
            op: MutationOp::Transition {
                status: status.into(),
            },
        }
    }
}
