//! Per-key sync lifecycle: state machine, in-flight record, and results.
//!
//! A sync for one correlation key progresses through a defined state
//! machine. Terminal states (`Done`, `Failed`) reject all transitions,
//! and `Retrying` re-enters `Mutating` only -- the issue reference is
//! stable once obtained within a sync, so resolution never repeats after
//! a mutation attempt has started.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ErrorKind, SyncError};
use crate::types::issue::IssueRef;

/// Lifecycle state of one in-flight sync.
///
/// # State Machine
///
/// ```text
/// Idle -> Resolving
/// Resolving -> Mutating, Failed
/// Mutating -> Done, Retrying, Failed
/// Retrying -> Mutating, Failed
/// Done -> (terminal, no transitions)
/// Failed -> (terminal, no transitions)
/// ```
///
/// # Examples
///
/// ```
/// use issuesync::types::SyncState;
///
/// assert!(SyncState::Mutating.can_transition_to(SyncState::Retrying));
/// assert!(!SyncState::Retrying.can_transition_to(SyncState::Resolving));
/// assert!(SyncState::Done.is_terminal());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// No sync has started for this key.
    Idle,
    /// Locating the target issue.
    Resolving,
    /// Reading the snapshot, mapping, and applying mutations.
    Mutating,
    /// Waiting out a backoff interval before re-entering `Mutating`.
    Retrying,
    /// Sync completed, possibly as a no-op (terminal).
    Done,
    /// Sync failed (terminal).
    Failed,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Resolving => write!(f, "resolving"),
            Self::Mutating => write!(f, "mutating"),
            Self::Retrying => write!(f, "retrying"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl SyncState {
    /// Returns `true` for `Done` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns `true` if transitioning from this state to `next` is valid.
    ///
    /// Self-transitions are rejected; `Retrying` may only re-enter
    /// `Mutating` (never `Resolving`).
    pub fn can_transition_to(self, next: Self) -> bool {
        if self == next {
            return false;
        }

        match self {
            Self::Idle => matches!(next, Self::Resolving),
            Self::Resolving => matches!(next, Self::Mutating | Self::Failed),
            Self::Mutating => matches!(next, Self::Done | Self::Retrying | Self::Failed),
            Self::Retrying => matches!(next, Self::Mutating | Self::Failed),
            Self::Done | Self::Failed => false,
        }
    }

    /// Validates a transition, with the correlation key for context.
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidStateTransition`] when the transition is not
    /// part of the state machine.
    pub fn validate_transition(
        self,
        correlation_key: &str,
        next: Self,
    ) -> Result<(), SyncError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(SyncError::InvalidStateTransition {
                correlation_key: correlation_key.to_string(),
                from: self,
                to: next,
            })
        }
    }
}

/// Process-local record of one in-flight sync.
///
/// Created when a sync begins, dropped when it terminates. `attempts`
/// counts mutation attempts (snapshot + map + apply), which bound the
/// retry loop.
#[derive(Debug, Clone)]
pub struct SyncRecord {
    /// Unique id for this sync invocation (used in log correlation).
    pub sync_id: Uuid,

    /// The activity's correlation key.
    pub correlation_key: String,

    /// Current lifecycle state.
    pub state: SyncState,

    /// Mutation attempts made so far.
    pub attempts: u32,

    /// Message of the most recent error, preserved for diagnostics.
    pub last_error: Option<String>,
}

impl SyncRecord {
    /// Creates a record in the `Idle` state.
    pub fn new(correlation_key: impl Into<String>) -> Self {
        Self {
            sync_id: Uuid::new_v4(),
            correlation_key: correlation_key.into(),
            state: SyncState::Idle,
            attempts: 0,
            last_error: None,
        }
    }

    /// Validates and performs a state transition.
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidStateTransition`] when the move is not part
    /// of the state machine; the record is left unchanged.
    pub fn transition_to(&mut self, next: SyncState) -> Result<(), SyncError> {
        self.state
            .validate_transition(&self.correlation_key, next)?;
        tracing::debug!(
            sync_id = %self.sync_id,
            correlation_key = %self.correlation_key,
            from = %self.state,
            to = %next,
            "sync state transition"
        );
        self.state = next;
        Ok(())
    }
}

/// Outcome of one `sync` call.
///
/// The engine boundary always returns a value from this closed set;
/// remote-boundary failures are classified into [`ErrorKind`] rather
/// than escaping as transport errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncResult {
    /// Mutations were written to the tracker.
    Applied {
        /// The target issue.
        issue: IssueRef,
        /// How many mutations the write carried.
        mutations_applied: usize,
    },

    /// The activity produced no mutations; no write was issued.
    NoOp {
        /// The resolved target issue.
        issue: IssueRef,
    },

    /// The sync terminated without applying.
    Failed {
        /// Classified failure kind.
        kind: ErrorKind,
        /// Human-readable message from the last underlying error.
        message: String,
    },
}

impl SyncResult {
    /// `true` for `Applied`.
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    /// `true` for `NoOp`.
    pub fn is_no_op(&self) -> bool {
        matches!(self, Self::NoOp { .. })
    }

    /// `true` for `Failed`.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl From<&SyncError> for SyncResult {
    fn from(err: &SyncError) -> Self {
        Self::Failed {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Summary of a batch sync run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Syncs that wrote mutations.
    pub applied: usize,

    /// Syncs that resolved but had nothing to write.
    pub no_ops: usize,

    /// Syncs that terminated in failure.
    pub failed: usize,

    /// Per-activity results, in submission order.
    pub results: Vec<SyncResult>,
}

impl SyncReport {
    /// Folds one result into the counters.
    pub fn record(&mut self, result: SyncResult) {
        match &result {
            SyncResult::Applied { .. } => self.applied += 1,
            SyncResult::NoOp { .. } => self.no_ops += 1,
            SyncResult::Failed { .. } => self.failed += 1,
        }
        self.results.push(result);
    }

    /// Total number of recorded results.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// `true` when no results were recorded.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retrying_reenters_mutating_only() {
        assert!(SyncState::Retrying.can_transition_to(SyncState::Mutating));
        assert!(SyncState::Retrying.can_transition_to(SyncState::Failed));
        assert!(!SyncState::Retrying.can_transition_to(SyncState::Resolving));
        assert!(!SyncState::Retrying.can_transition_to(SyncState::Done));
    }

    #[test]
    fn record_transition_updates_state() {
        let mut record = SyncRecord::new("ABC-1");
        record.transition_to(SyncState::Resolving).unwrap();
        record.transition_to(SyncState::Mutating).unwrap();
        assert_eq!(record.state, SyncState::Mutating);
    }

    #[test]
    fn record_rejects_invalid_transition() {
        let mut record = SyncRecord::new("ABC-1");
        let err = record.transition_to(SyncState::Done).unwrap_err();
        assert!(err.to_string().contains("ABC-1"));
        assert_eq!(record.state, SyncState::Idle);
    }

    #[test]
    fn report_counters_track_results() {
        let issue = IssueRef::new("1", "ABC-1");
        let mut report = SyncReport::default();
        report.record(SyncResult::Applied {
            issue: issue.clone(),
            mutations_applied: 2,
        });
        report.record(SyncResult::NoOp { issue });
        report.record(SyncResult::Failed {
            kind: ErrorKind::Transient,
            message: "timeout".into(),
        });

        assert_eq!(report.applied, 1);
        assert_eq!(report.no_ops, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.len(), 3);
    }
}
