//! The narrow boundary to the remote issue tracker.
//!
//! [`IssueTrackerClient`] is the only surface the core consumes; HTTP
//! transport, authentication, and wire formats all live behind it. The
//! trait is deliberately dumb: resolution policy, field mapping, and
//! retry all belong to the core, not to implementations.
//!
//! # Thread Safety
//!
//! Implementations must be `Send + Sync`; the engine shares one client
//! across concurrent syncs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::types::field::{FieldKind, FieldMutation};
use crate::types::issue::{IssueQuery, IssueRef, IssueSnapshot, IssueTemplate};

/// One row of the tracker's field catalog, as returned by
/// [`list_fields`](IssueTrackerClient::list_fields).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteField {
    /// Display name, matched case-sensitively against logical names.
    pub name: String,

    /// Tracker-side field identifier.
    pub remote_id: String,

    /// Field type.
    pub kind: FieldKind,
}

impl RemoteField {
    /// Creates a catalog row.
    pub fn new(name: impl Into<String>, remote_id: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            remote_id: remote_id.into(),
            kind,
        }
    }
}

/// Client interface consumed by the synchronization core.
///
/// Exactly five operations; everything else the tracker offers is out
/// of scope. Implementations classify their failures into
/// [`ClientError`] so the engine can branch on transient vs permanent
/// without transport knowledge.
#[async_trait]
pub trait IssueTrackerClient: Send + Sync {
    /// Locates an issue by key or search criterion.
    ///
    /// Returns `Ok(None)` when nothing matches.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Ambiguous`] when a search matches more than one
    ///   issue. Implementations must report this rather than picking one.
    /// - [`ClientError::Transient`] / [`ClientError::Permanent`] on
    ///   transport failures.
    async fn find_issue(&self, query: &IssueQuery) -> Result<Option<IssueRef>, ClientError>;

    /// Reads the current field values, status, and labels of an issue.
    ///
    /// # Errors
    ///
    /// - [`ClientError::NotFound`] when the issue no longer exists.
    /// - [`ClientError::Transient`] / [`ClientError::Permanent`] on
    ///   transport failures.
    async fn get_issue(&self, issue: &IssueRef) -> Result<IssueSnapshot, ClientError>;

    /// Creates an issue from a template and returns its reference.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Permanent`] on validation failures (unknown
    ///   project, missing required fields).
    /// - [`ClientError::Transient`] on transport failures.
    async fn create_issue(&self, template: &IssueTemplate) -> Result<IssueRef, ClientError>;

    /// Applies mutations to an issue as a single write.
    ///
    /// # Errors
    ///
    /// - [`ClientError::UnknownField`] when the tracker no longer
    ///   recognizes a mutation's remote field id (schema drift); the
    ///   engine invalidates the registry entry and retries once.
    /// - [`ClientError::Transient`] / [`ClientError::Permanent`] on
    ///   transport failures.
    async fn apply_mutations(
        &self,
        issue: &IssueRef,
        mutations: &[FieldMutation],
    ) -> Result<(), ClientError>;

    /// Lists the tracker's field catalog.
    ///
    /// Consumed by the field registry on first resolution of each
    /// logical name, and again after invalidation.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Transient`] / [`ClientError::Permanent`] on
    ///   transport failures.
    async fn list_fields(&self) -> Result<Vec<RemoteField>, ClientError>;
}
