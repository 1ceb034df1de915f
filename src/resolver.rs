//! Issue resolution: correlation key to [`IssueRef`].
//!
//! A correlation key that matches the configured key pattern is looked
//! up directly; anything else is treated as a tracker-side search that
//! must match at most one issue. Resolution results are never cached --
//! the tracker is the source of truth and may change between syncs.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::client::IssueTrackerClient;
use crate::error::{ClientError, SyncError};
use crate::types::issue::{IssueQuery, IssueRef, IssueTemplate};

/// Default direct-key pattern: an uppercase project key, a dash, and a
/// number (`ABC-123`).
pub const DEFAULT_KEY_PATTERN: &str = r"^[A-Z][A-Z0-9]+-[0-9]+$";

static DEFAULT_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DEFAULT_KEY_PATTERN).expect("default key pattern is valid"));

/// Returns a compiled copy of the default direct-key pattern.
pub fn default_key_pattern() -> Regex {
    DEFAULT_KEY_RE.clone()
}

/// Whether a missing issue is created or reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreationPolicy {
    /// Create the issue from the configured template when not found.
    CreateIfMissing,
    /// Fail with `IssueNotFound` when not found.
    #[default]
    FailIfMissing,
}

/// Maps a correlation key to an [`IssueRef`], optionally creating the
/// issue when policy allows.
pub struct IssueResolver {
    client: Arc<dyn IssueTrackerClient>,
    key_pattern: Regex,
}

impl IssueResolver {
    /// Creates a resolver with the default direct-key pattern.
    pub fn new(client: Arc<dyn IssueTrackerClient>) -> Self {
        Self {
            client,
            key_pattern: default_key_pattern(),
        }
    }

    /// Overrides the pattern that classifies a correlation key as a
    /// direct issue key rather than a search criterion.
    pub fn with_key_pattern(mut self, pattern: Regex) -> Self {
        self.key_pattern = pattern;
        self
    }

    /// Resolves a correlation key to an issue reference.
    ///
    /// # Errors
    ///
    /// - [`SyncError::ResolutionAmbiguous`] when a search matches more
    ///   than one issue. Never retried: a retry cannot change ambiguity.
    /// - [`SyncError::IssueNotFound`] when nothing matches and the
    ///   policy is [`CreationPolicy::FailIfMissing`].
    /// - [`SyncError::MissingTemplate`] when creation is required but no
    ///   template was supplied.
    /// - [`SyncError::Transient`] / [`SyncError::Permanent`] for
    ///   transport failures, classified for the engine's retry policy.
    pub async fn resolve(
        &self,
        correlation_key: &str,
        policy: CreationPolicy,
        template: Option<&IssueTemplate>,
    ) -> Result<IssueRef, SyncError> {
        let query = if self.key_pattern.is_match(correlation_key) {
            IssueQuery::Key(correlation_key.to_string())
        } else {
            IssueQuery::Search(correlation_key.to_string())
        };

        let found = match self.client.find_issue(&query).await {
            Ok(found) => found,
            Err(ClientError::NotFound { .. }) => None,
            Err(ClientError::Ambiguous { matches }) => {
                return Err(SyncError::ResolutionAmbiguous {
                    query: correlation_key.to_string(),
                    matches,
                });
            }
            Err(err) => return Err(map_lookup_error(err)),
        };

        if let Some(issue) = found {
            tracing::debug!(correlation_key, issue = %issue, query = %query, "resolved issue");
            return Ok(issue);
        }

        match policy {
            CreationPolicy::FailIfMissing => Err(SyncError::IssueNotFound {
                key: correlation_key.to_string(),
            }),
            CreationPolicy::CreateIfMissing => {
                let template = template.ok_or(SyncError::MissingTemplate)?;
                let issue = self
                    .client
                    .create_issue(template)
                    .await
                    .map_err(map_lookup_error)?;
                tracing::info!(
                    correlation_key,
                    issue = %issue,
                    project = %template.project,
                    "created missing issue"
                );
                Ok(issue)
            }
        }
    }
}

fn map_lookup_error(err: ClientError) -> SyncError {
    match err {
        ClientError::Transient { message } => SyncError::Transient { message },
        other => SyncError::Permanent {
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pattern_matches_issue_keys() {
        let re = default_key_pattern();
        assert!(re.is_match("ABC-123"));
        assert!(re.is_match("OPS2-7"));
        assert!(!re.is_match("abc-123"));
        assert!(!re.is_match("project=OPS AND summary~login"));
        assert!(!re.is_match("A-1")); // single-letter project keys are not key-shaped
    }

    #[test]
    fn creation_policy_defaults_to_fail() {
        assert_eq!(CreationPolicy::default(), CreationPolicy::FailIfMissing);
    }
}
