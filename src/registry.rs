//! Field registry: logical names to remote field ids, resolved lazily.
//!
//! Resolution queries the tracker's field catalog at most once per
//! logical name per process lifetime (cached), with two exceptions:
//! a failed resolution leaves nothing cached, and
//! [`invalidate`](FieldRegistry::invalidate) drops a cached entry when
//! the tracker reports schema drift, forcing a fresh catalog query on
//! next use without a process restart.
//!
//! # Concurrency
//!
//! Resolution is single-flight per logical name: concurrent `resolve`
//! calls for the same name share one `list_fields` query through a
//! per-name `OnceCell`. The cell map is the only cross-request shared
//! mutable state in the crate and is otherwise read-mostly.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;

use crate::client::IssueTrackerClient;
use crate::error::{ClientError, SyncError};
use crate::types::field::{FieldDescriptor, FieldKind, FieldSpec, MutationPolicy};

/// Translates logical field names into resolved [`FieldDescriptor`]s.
///
/// Constructed once with the full set of field registrations; logical
/// names are unique within a registry.
pub struct FieldRegistry {
    client: Arc<dyn IssueTrackerClient>,
    specs: HashMap<String, FieldSpec>,
    cells: DashMap<String, Arc<OnceCell<FieldDescriptor>>>,
    invalidations: AtomicU64,
}

impl std::fmt::Debug for FieldRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldRegistry")
            .field("specs", &self.specs)
            .field("cells", &self.cells)
            .field("invalidations", &self.invalidations)
            .finish_non_exhaustive()
    }
}

impl FieldRegistry {
    /// Creates a registry from field registrations.
    ///
    /// # Errors
    ///
    /// - [`SyncError::DuplicateLogicalName`] when two specs share a
    ///   logical name.
    /// - [`SyncError::PolicyKindMismatch`] when an append policy is
    ///   registered for a non-text field.
    pub fn new(
        client: Arc<dyn IssueTrackerClient>,
        specs: impl IntoIterator<Item = FieldSpec>,
    ) -> Result<Self, SyncError> {
        let mut by_name = HashMap::new();
        for spec in specs {
            if matches!(
                spec.policy,
                MutationPolicy::AppendNewline | MutationPolicy::AppendIfAbsent
            ) && spec.kind != FieldKind::Text
            {
                return Err(SyncError::PolicyKindMismatch {
                    logical_name: spec.logical_name,
                    kind: spec.kind,
                });
            }
            let logical_name = spec.logical_name.clone();
            if by_name.insert(logical_name.clone(), spec).is_some() {
                return Err(SyncError::DuplicateLogicalName { logical_name });
            }
        }

        Ok(Self {
            client,
            specs: by_name,
            cells: DashMap::new(),
            invalidations: AtomicU64::new(0),
        })
    }

    /// The registration for a logical name, if any.
    pub fn spec(&self, logical_name: &str) -> Option<&FieldSpec> {
        self.specs.get(logical_name)
    }

    /// Resolves a logical name to a descriptor.
    ///
    /// Cached resolutions return immediately; otherwise the tracker's
    /// field catalog is queried and matched by exact, case-sensitive
    /// name. Concurrent resolutions of the same name collapse into one
    /// catalog query.
    ///
    /// # Errors
    ///
    /// - [`SyncError::FieldNotFound`] when the name is not registered or
    ///   the catalog has no row with that name.
    /// - [`SyncError::Transient`] / [`SyncError::Permanent`] when the
    ///   catalog query itself fails.
    pub async fn resolve(&self, logical_name: &str) -> Result<FieldDescriptor, SyncError> {
        let spec = self
            .specs
            .get(logical_name)
            .ok_or_else(|| SyncError::FieldNotFound {
                field: logical_name.to_string(),
            })?;

        let cell: Arc<OnceCell<FieldDescriptor>> = self
            .cells
            .entry(logical_name.to_string())
            .or_default()
            .clone();

        let descriptor = cell
            .get_or_try_init(|| self.resolve_remote(spec))
            .await?;
        Ok(descriptor.clone())
    }

    /// Drops the cached resolution for a logical name, forcing a fresh
    /// catalog query on next use. Returns `true` if an entry was cached.
    pub fn invalidate(&self, logical_name: &str) -> bool {
        let removed = self.cells.remove(logical_name).is_some();
        if removed {
            self.invalidations.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(logical_name, "invalidated field resolution (schema drift)");
        }
        removed
    }

    /// Invalidates whichever cached entry resolved to `remote_id`,
    /// returning its logical name. Used when the tracker rejects a
    /// remote id the cache still holds.
    pub fn invalidate_remote(&self, remote_id: &str) -> Option<String> {
        let logical_name = self.cells.iter().find_map(|entry| {
            entry
                .value()
                .get()
                .filter(|descriptor| descriptor.remote_id == remote_id)
                .map(|_| entry.key().clone())
        })?;
        self.invalidate(&logical_name);
        Some(logical_name)
    }

    /// Number of invalidations since construction.
    pub fn invalidation_count(&self) -> u64 {
        self.invalidations.load(Ordering::Relaxed)
    }

    async fn resolve_remote(&self, spec: &FieldSpec) -> Result<FieldDescriptor, SyncError> {
        let catalog = self
            .client
            .list_fields()
            .await
            .map_err(map_catalog_error)?;

        let row = catalog
            .iter()
            .find(|field| field.name == spec.logical_name)
            .ok_or_else(|| SyncError::FieldNotFound {
                field: spec.logical_name.clone(),
            })?;

        tracing::debug!(
            logical_name = %spec.logical_name,
            remote_id = %row.remote_id,
            "resolved field from catalog"
        );
        Ok(FieldDescriptor::from_spec(spec, row.remote_id.clone()))
    }
}

fn map_catalog_error(err: ClientError) -> SyncError {
    match err {
        ClientError::Transient { message } => SyncError::Transient { message },
        other => SyncError::Permanent {
            message: other.to_string(),
        },
    }
}
