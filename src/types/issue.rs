//! Issue-side types: references, snapshots, creation templates, queries.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::field::FieldValue;

/// Opaque reference to an existing remote issue.
///
/// Always sourced from the tracker -- never synthesized locally. Carries
/// both the internal id and the human-readable key (`ABC-123`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRef {
    /// Tracker-internal identifier.
    pub id: String,

    /// Human-readable issue key.
    pub key: String,
}

impl IssueRef {
    /// Creates a reference from tracker-supplied identifiers.
    pub fn new(id: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for IssueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)
    }
}

/// Current remote state of an issue, as returned by `get_issue`.
///
/// Field values are keyed by remote field id. Status and labels are
/// carried so transition and label mutations can be skipped when the
/// issue already matches the target (idempotent re-sync).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueSnapshot {
    /// Remote field id to current value.
    pub fields: HashMap<String, FieldValue>,

    /// Current workflow status name.
    pub status: String,

    /// Labels currently on the issue.
    pub labels: Vec<String>,
}

impl IssueSnapshot {
    /// Creates an empty snapshot (no fields, blank status, no labels).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the workflow status.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    /// Sets a field value by remote id.
    pub fn with_field(mut self, remote_id: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(remote_id.into(), value.into());
        self
    }

    /// Adds a label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    /// Rendered text of a field, if present.
    pub fn field_text(&self, remote_id: &str) -> Option<String> {
        self.fields.get(remote_id).map(FieldValue::render)
    }

    /// `true` when the label is already on the issue.
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

/// Template for creating a missing issue.
///
/// Shape follows what trackers require at creation time: project, issue
/// type, and an initial summary, with optional description and labels.
///
/// # Examples
///
/// ```
/// use issuesync::types::IssueTemplate;
///
/// let template = IssueTemplate::new("OPS", "Task", "Login activity")
///     .with_description("Auto-created by activity sync")
///     .with_label("automation");
/// assert_eq!(template.project, "OPS");
/// assert_eq!(template.labels, ["automation"]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueTemplate {
    /// Target project key.
    pub project: String,

    /// Issue type name (Task, Bug, ...).
    pub issue_type: String,

    /// Initial summary.
    pub summary: String,

    /// Optional initial description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Initial labels.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

impl IssueTemplate {
    /// Creates a template with the required creation fields.
    pub fn new(
        project: impl Into<String>,
        issue_type: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            issue_type: issue_type.into(),
            summary: summary.into(),
            description: None,
            labels: Vec::new(),
        }
    }

    /// Sets the initial description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds an initial label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }
}

/// How the resolver asks the tracker to locate an issue.
///
/// `Key` is a direct lookup by issue key; `Search` is a tracker-side
/// query (e.g. JQL) that must match at most one issue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum IssueQuery {
    /// Direct lookup by issue key.
    Key(String),
    /// Search criterion; more than one match is an ambiguity error.
    Search(String),
}

impl fmt::Display for IssueQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "key:{key}"),
            Self::Search(query) => write!(f, "search:{query}"),
        }
    }
}
