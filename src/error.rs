//! Error taxonomy for the synchronization core.
//!
//! Two layers, mirroring the client/domain split: [`ClientError`] is
//! what `IssueTrackerClient` implementations speak (transport-side),
//! and [`SyncError`] is the closed domain taxonomy the engine exposes.
//! The engine converts every client failure into a `SyncError` before
//! it can reach a caller, so calling code branches on [`ErrorKind`]
//! without knowing transport details.

use thiserror::Error;

use crate::types::field::FieldKind;
use crate::types::sync::SyncState;

/// Classified failure kind carried by `SyncResult::Failed`.
///
/// Ambiguity and not-found are logic errors no retry can fix; transient
/// errors are expected to potentially succeed on retry; permanent errors
/// (auth, validation) never will.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A search query matched more than one issue.
    ResolutionAmbiguous,
    /// The target issue does not exist and creation was not allowed.
    IssueNotFound,
    /// A logical or remote field could not be resolved.
    FieldNotFound,
    /// Network-class failure (timeout, 5xx, rate limit); retryable.
    Transient,
    /// Auth or validation failure; never retried.
    Permanent,
    /// The sync was cancelled between retry attempts.
    Cancelled,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ResolutionAmbiguous => write!(f, "resolution_ambiguous"),
            Self::IssueNotFound => write!(f, "issue_not_found"),
            Self::FieldNotFound => write!(f, "field_not_found"),
            Self::Transient => write!(f, "transient"),
            Self::Permanent => write!(f, "permanent"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Errors surfaced by the synchronization core.
///
/// # Examples
///
/// ```
/// use issuesync::error::{ErrorKind, SyncError};
///
/// let err = SyncError::ResolutionAmbiguous {
///     query: "project=OPS AND summary~login".to_string(),
///     matches: 3,
/// };
/// assert_eq!(err.kind(), ErrorKind::ResolutionAmbiguous);
/// assert!(!err.is_transient());
/// ```
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// A search resolved to more than one issue; never silently pick one.
    #[error("ambiguous resolution for {query:?}: {matches} matches, expected at most one")]
    ResolutionAmbiguous {
        /// The correlation key / search criterion.
        query: String,
        /// Number of issues the query matched.
        matches: usize,
    },

    /// The target issue does not exist and the policy forbids creation.
    #[error("issue not found: {key}")]
    IssueNotFound {
        /// The correlation key that failed to resolve.
        key: String,
    },

    /// A field could not be resolved against the tracker's catalog, or
    /// the tracker rejected a remote field id it no longer knows.
    #[error("field not found: {field}")]
    FieldNotFound {
        /// Logical name (registry miss) or remote id (tracker reject).
        field: String,
    },

    /// Two field specs share a logical name.
    #[error("duplicate logical field name: {logical_name}")]
    DuplicateLogicalName {
        /// The offending logical name.
        logical_name: String,
    },

    /// An append policy was registered for a non-text field.
    #[error("append policy requires a text field: {logical_name} is {kind}")]
    PolicyKindMismatch {
        /// The offending logical name.
        logical_name: String,
        /// The registered (non-text) field kind.
        kind: FieldKind,
    },

    /// Creation policy is `CreateIfMissing` but no template was configured.
    #[error("creation policy is CreateIfMissing but no issue template is configured")]
    MissingTemplate,

    /// Attempted an invalid sync state machine transition.
    #[error("invalid sync state transition from {from} to {to} for {correlation_key}")]
    InvalidStateTransition {
        /// Key of the sync whose record was mis-transitioned.
        correlation_key: String,
        /// Current state.
        from: SyncState,
        /// Rejected target state.
        to: SyncState,
    },

    /// Network-class failure; retried with backoff up to the attempt cap.
    #[error("transient error: {message}")]
    Transient {
        /// Underlying failure description.
        message: String,
    },

    /// Auth or validation failure; surfaced without retry.
    #[error("permanent error: {message}")]
    Permanent {
        /// Underlying failure description.
        message: String,
    },

    /// The sync was cancelled while waiting between retry attempts.
    #[error("sync cancelled between retry attempts")]
    Cancelled,
}

impl SyncError {
    /// Maps this error to its classified kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ResolutionAmbiguous { .. } => ErrorKind::ResolutionAmbiguous,
            Self::IssueNotFound { .. } => ErrorKind::IssueNotFound,
            Self::FieldNotFound { .. } => ErrorKind::FieldNotFound,
            Self::Transient { .. } => ErrorKind::Transient,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::DuplicateLogicalName { .. }
            | Self::PolicyKindMismatch { .. }
            | Self::MissingTemplate
            | Self::InvalidStateTransition { .. }
            | Self::Permanent { .. } => ErrorKind::Permanent,
        }
    }

    /// `true` when a retry may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Errors spoken by `IssueTrackerClient` implementations.
///
/// The transport layer classifies its failures into this closed set; the
/// core maps them onto [`SyncError`] at each call site so the engine's
/// retry policy never inspects transport detail.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// A search query matched more than one issue.
    #[error("query matched {matches} issues, expected at most one")]
    Ambiguous {
        /// Number of matches.
        matches: usize,
    },

    /// The requested issue does not exist.
    #[error("issue not found: {key}")]
    NotFound {
        /// The key or query that missed.
        key: String,
    },

    /// The tracker rejected a field id it no longer recognizes
    /// (schema drift: field renamed or removed remotely).
    #[error("unknown field id: {remote_id}")]
    UnknownField {
        /// The rejected remote field id.
        remote_id: String,
    },

    /// Network timeout, 5xx, or rate limit.
    #[error("transient error: {message}")]
    Transient {
        /// Underlying failure description.
        message: String,
    },

    /// Permission denied or request validation failure.
    #[error("permanent error: {message}")]
    Permanent {
        /// Underlying failure description.
        message: String,
    },
}

impl ClientError {
    /// `true` when a retry may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}
