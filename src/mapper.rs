//! Activity mapping: payload entries to ordered mutation instructions.
//!
//! Mapping is deterministic given the issue snapshot and the activity:
//! entries are processed in payload insertion order, and append values
//! are pre-combined with the snapshot's current text so the resulting
//! mutations are plain writes.
//!
//! Three logical names are reserved and bypass the field registry:
//! `comment` creates a comment, `status` transitions the issue, and
//! `label` adds a label. Status and label entries are skipped when the
//! snapshot already matches, so re-synced activities do not churn the
//! issue.

use std::sync::Arc;

use crate::error::SyncError;
use crate::registry::FieldRegistry;
use crate::types::activity::Activity;
use crate::types::field::{FieldMutation, MutationPolicy};
use crate::types::issue::IssueSnapshot;

/// Reserved payload name producing a comment-creation mutation.
pub const COMMENT_FIELD: &str = "comment";

/// Reserved payload name producing a status transition mutation.
pub const STATUS_FIELD: &str = "status";

/// Reserved payload name producing a label-add mutation.
pub const LABEL_FIELD: &str = "label";

/// Converts an [`Activity`] into an ordered list of [`FieldMutation`]s.
pub struct ActivityMapper {
    registry: Arc<FieldRegistry>,
}

impl ActivityMapper {
    /// Creates a mapper over the given registry.
    pub fn new(registry: Arc<FieldRegistry>) -> Self {
        Self { registry }
    }

    /// Maps an activity against the issue's current state.
    ///
    /// An empty payload maps to an empty mutation list -- a no-op sync,
    /// explicitly not an error. An unresolvable field registered as
    /// `optional` skips its entry with a warning; a required one aborts
    /// the whole activity.
    ///
    /// # Errors
    ///
    /// - [`SyncError::FieldNotFound`] for an unresolvable required field.
    /// - [`SyncError::Transient`] / [`SyncError::Permanent`] when the
    ///   catalog query behind a first resolution fails.
    pub async fn map(
        &self,
        activity: &Activity,
        snapshot: &IssueSnapshot,
    ) -> Result<Vec<FieldMutation>, SyncError> {
        let mut mutations = Vec::with_capacity(activity.payload().len());

        for (name, value) in activity.payload() {
            match name.as_str() {
                COMMENT_FIELD => {
                    mutations.push(FieldMutation::add_comment(value.render()));
                }
                STATUS_FIELD => {
                    let target = value.render();
                    if snapshot.status.eq_ignore_ascii_case(&target) {
                        tracing::debug!(
                            correlation_key = activity.correlation_key(),
                            status = %target,
                            "issue already in target status, skipping transition"
                        );
                    } else {
                        mutations.push(FieldMutation::transition(target));
                    }
                }
                LABEL_FIELD => {
                    let label = value.render();
                    if snapshot.has_label(&label) {
                        tracing::debug!(
                            correlation_key = activity.correlation_key(),
                            label = %label,
                            "label already present, skipping"
                        );
                    } else {
                        mutations.push(FieldMutation::add_label(label));
                    }
                }
                _ => {
                    let descriptor = match self.registry.resolve(name).await {
                        Ok(descriptor) => descriptor,
                        Err(err @ SyncError::FieldNotFound { .. }) => {
                            let optional = self
                                .registry
                                .spec(name)
                                .is_some_and(|spec| spec.optional);
                            if optional {
                                tracing::warn!(
                                    correlation_key = activity.correlation_key(),
                                    field = %name,
                                    "skipping unresolvable optional field"
                                );
                                continue;
                            }
                            return Err(err);
                        }
                        Err(err) => return Err(err),
                    };

                    match descriptor.policy {
                        MutationPolicy::Overwrite => {
                            mutations.push(FieldMutation::set(
                                descriptor.remote_id.as_str(),
                                value.clone(),
                            ));
                        }
                        MutationPolicy::AppendNewline => {
                            let previous = snapshot
                                .field_text(&descriptor.remote_id)
                                .unwrap_or_default();
                            mutations.push(FieldMutation::append_text(
                                descriptor.remote_id.as_str(),
                                join_lines(&previous, &value.render()),
                            ));
                        }
                        MutationPolicy::AppendIfAbsent => {
                            let previous = snapshot
                                .field_text(&descriptor.remote_id)
                                .unwrap_or_default();
                            let rendered = value.render();
                            if previous.contains(&rendered) {
                                tracing::debug!(
                                    correlation_key = activity.correlation_key(),
                                    field = %name,
                                    "value already present, skipping append"
                                );
                            } else {
                                mutations.push(FieldMutation::append_text(
                                    descriptor.remote_id.as_str(),
                                    join_lines(&previous, &rendered),
                                ));
                            }
                        }
                    }
                }
            }
        }

        Ok(mutations)
    }
}

/// Appends `next` after `previous` on a new line. An empty previous
/// value yields `next` alone -- no leading separator artifacts.
fn join_lines(previous: &str, next: &str) -> String {
    if previous.is_empty() {
        next.to_string()
    } else {
        format!("{previous}\n{next}")
    }
}
