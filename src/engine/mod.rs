//! Sync engine: resolve, map, apply, retry.
//!
//! The engine owns the per-key state machine and every reliability
//! concern at the client boundary: per-call timeouts, bounded backoff
//! for transient failures, one-shot self-heal on field schema drift,
//! at-most-one in-flight mutation per correlation key, and a worker-pool
//! cap across keys.
//!
//! # Ordering
//!
//! Syncs sharing a correlation key are serialized in submission order
//! behind a per-key async mutex; syncs for different keys run
//! concurrently up to the configured pool size.
//!
//! # Cancellation
//!
//! Cancellation is observed between retry attempts only. An in-flight
//! client call is always allowed to complete and its result observed,
//! so the remote state is never left ambiguous by a cancelled write.

mod backoff;

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::client::IssueTrackerClient;
use crate::config::SyncConfig;
use crate::error::{ClientError, SyncError};
use crate::mapper::ActivityMapper;
use crate::registry::FieldRegistry;
use crate::resolver::IssueResolver;
use crate::types::activity::Activity;
use crate::types::issue::IssueRef;
use crate::types::sync::{SyncRecord, SyncReport, SyncResult, SyncState};

/// Orchestrates activity synchronization against the issue tracker.
///
/// Dependencies are injected explicitly: the client and registry are
/// shared (`Arc`), the resolver and mapper are owned. Construction is
/// builder-style.
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use issuesync::{FieldRegistry, SyncConfig, SyncEngine};
/// # use issuesync::types::{Activity, ActivityKind};
/// # async fn example(
/// #     client: Arc<dyn issuesync::IssueTrackerClient>,
/// #     registry: Arc<FieldRegistry>,
/// # ) {
/// let engine = SyncEngine::new(client, registry).with_config(SyncConfig::default());
/// let result = engine
///     .sync(&Activity::new("ABC-123", ActivityKind::Event).with_entry("activity-log", "User logged in"))
///     .await;
/// # let _ = result;
/// # }
/// ```
pub struct SyncEngine {
    client: Arc<dyn IssueTrackerClient>,
    registry: Arc<FieldRegistry>,
    resolver: IssueResolver,
    mapper: ActivityMapper,
    config: SyncConfig,
    key_locks: DashMap<String, Arc<Mutex<()>>>,
    states: DashMap<String, SyncState>,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
}

impl SyncEngine {
    /// Creates an engine with the default configuration.
    pub fn new(client: Arc<dyn IssueTrackerClient>, registry: Arc<FieldRegistry>) -> Self {
        let config = SyncConfig::default();
        Self {
            resolver: IssueResolver::new(client.clone())
                .with_key_pattern(config.key_pattern.clone()),
            mapper: ActivityMapper::new(registry.clone()),
            permits: Arc::new(Semaphore::new(config.max_concurrent_syncs)),
            key_locks: DashMap::new(),
            states: DashMap::new(),
            cancel: CancellationToken::new(),
            client,
            registry,
            config,
        }
    }

    /// Replaces the configuration, rebuilding the resolver pattern and
    /// worker pool to match.
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.resolver =
            IssueResolver::new(self.client.clone()).with_key_pattern(config.key_pattern.clone());
        self.permits = Arc::new(Semaphore::new(config.max_concurrent_syncs));
        self.config = config;
        self
    }

    /// Attaches an externally owned cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Requests cancellation: syncs waiting between retry attempts stop
    /// with a `Cancelled` failure; in-flight client calls complete.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Current lifecycle state of an in-flight sync for a key, if any.
    pub fn state_of(&self, correlation_key: &str) -> Option<SyncState> {
        self.states
            .get(correlation_key)
            .map(|entry| *entry.value())
    }

    /// Synchronizes one activity.
    ///
    /// Never panics and never surfaces a raw client error: every outcome
    /// is a [`SyncResult`].
    pub async fn sync(&self, activity: &Activity) -> SyncResult {
        let correlation_key = activity.correlation_key().to_string();

        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                return SyncResult::from(&SyncError::Cancelled);
            }
        };

        // At most one in-flight mutation per key: later syncs for the
        // same key queue here in submission order.
        let lock = self
            .key_locks
            .entry(correlation_key.clone())
            .or_default()
            .clone();
        let _guard = lock.lock().await;

        let mut record = SyncRecord::new(&correlation_key);
        let outcome = self.run(activity, &mut record).await;
        self.states.remove(&correlation_key);

        match outcome {
            Ok(result) => result,
            Err(err) => {
                if !record.state.is_terminal() {
                    if let Err(transition_err) = record.transition_to(SyncState::Failed) {
                        tracing::error!(
                            sync_id = %record.sync_id,
                            error = %transition_err,
                            "failed to mark sync record as failed"
                        );
                    }
                }
                record.last_error = Some(err.to_string());
                tracing::warn!(
                    sync_id = %record.sync_id,
                    correlation_key = %correlation_key,
                    attempts = record.attempts,
                    kind = %err.kind(),
                    error = %err,
                    "sync failed"
                );
                SyncResult::from(&err)
            }
        }
    }

    /// Synchronizes a batch of activities, respecting the worker-pool
    /// cap and per-key ordering. Results are reported in input order.
    pub async fn sync_all(&self, activities: &[Activity]) -> SyncReport {
        let results =
            futures::future::join_all(activities.iter().map(|activity| self.sync(activity))).await;

        let mut report = SyncReport::default();
        for result in results {
            report.record(result);
        }
        tracing::info!(
            applied = report.applied,
            no_ops = report.no_ops,
            failed = report.failed,
            "batch sync complete"
        );
        report
    }

    async fn run(
        &self,
        activity: &Activity,
        record: &mut SyncRecord,
    ) -> Result<SyncResult, SyncError> {
        record.transition_to(SyncState::Resolving)?;
        self.publish(record);

        let issue = self.resolve_with_retry(activity).await?;

        record.transition_to(SyncState::Mutating)?;
        self.publish(record);

        if activity.is_empty() {
            record.transition_to(SyncState::Done)?;
            tracing::debug!(
                sync_id = %record.sync_id,
                issue = %issue,
                "empty payload, no-op sync"
            );
            return Ok(SyncResult::NoOp { issue });
        }

        self.mutate_with_retry(activity, record, issue).await
    }

    /// Resolution phase. Transient failures (including per-call
    /// timeouts) retry with the same backoff budget as mutation; logic
    /// errors (ambiguity, not-found) surface immediately since no retry
    /// can change them.
    async fn resolve_with_retry(&self, activity: &Activity) -> Result<IssueRef, SyncError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let outcome = match tokio::time::timeout(
                self.config.call_timeout,
                self.resolver.resolve(
                    activity.correlation_key(),
                    self.config.creation_policy,
                    self.config.template.as_ref(),
                ),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(SyncError::Transient {
                    message: format!(
                        "resolve timed out after {:?}",
                        self.config.call_timeout
                    ),
                }),
            };

            match outcome {
                Ok(issue) => return Ok(issue),
                Err(err) if err.is_transient() => {
                    if attempt >= self.config.retry.max_attempts {
                        return Err(err);
                    }
                    tracing::warn!(
                        correlation_key = activity.correlation_key(),
                        attempt,
                        error = %err,
                        "transient resolution failure, backing off"
                    );
                    backoff::wait(&self.config.retry, attempt, &self.cancel).await?;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Mutation phase: snapshot, map, apply, with the retry loop
    /// re-entering here (never resolution -- the issue reference is
    /// stable for the duration of the sync).
    async fn mutate_with_retry(
        &self,
        activity: &Activity,
        record: &mut SyncRecord,
        issue: IssueRef,
    ) -> Result<SyncResult, SyncError> {
        let mut healed = false;

        loop {
            record.attempts += 1;

            // Re-read the snapshot every attempt so appends compose with
            // the latest remote value.
            let snapshot = match self
                .call("get_issue", self.client.get_issue(&issue))
                .await
            {
                Ok(snapshot) => snapshot,
                Err(err) if err.is_transient() => {
                    self.await_retry(record, err).await?;
                    continue;
                }
                Err(err) => return Err(err),
            };

            let mutations = match self.mapper.map(activity, &snapshot).await {
                Ok(mutations) => mutations,
                Err(err) if err.is_transient() => {
                    self.await_retry(record, err).await?;
                    continue;
                }
                Err(err) => return Err(err),
            };

            if mutations.is_empty() {
                record.transition_to(SyncState::Done)?;
                tracing::debug!(
                    sync_id = %record.sync_id,
                    issue = %issue,
                    "no mutations to apply, no-op sync"
                );
                return Ok(SyncResult::NoOp { issue });
            }

            match self
                .call(
                    "apply_mutations",
                    self.client.apply_mutations(&issue, &mutations),
                )
                .await
            {
                Ok(()) => {
                    record.transition_to(SyncState::Done)?;
                    tracing::info!(
                        sync_id = %record.sync_id,
                        issue = %issue,
                        mutations = mutations.len(),
                        attempts = record.attempts,
                        "sync applied"
                    );
                    return Ok(SyncResult::Applied {
                        issue,
                        mutations_applied: mutations.len(),
                    });
                }
                Err(SyncError::FieldNotFound { field }) if !healed => {
                    // Schema drift: the tracker no longer knows a remote
                    // id the cache resolved. Invalidate and retry once
                    // immediately, without a backoff cycle.
                    healed = true;
                    match self.registry.invalidate_remote(&field) {
                        Some(logical_name) => {
                            tracing::warn!(
                                sync_id = %record.sync_id,
                                remote_id = %field,
                                logical_name = %logical_name,
                                "field drift detected, re-resolving and retrying"
                            );
                            continue;
                        }
                        None => return Err(SyncError::FieldNotFound { field }),
                    }
                }
                Err(err) if err.is_transient() => {
                    self.await_retry(record, err).await?;
                    continue;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Books a transient failure against the attempt budget and waits
    /// out the backoff interval, or surfaces the error when the budget
    /// is exhausted.
    async fn await_retry(&self, record: &mut SyncRecord, err: SyncError) -> Result<(), SyncError> {
        record.last_error = Some(err.to_string());
        if record.attempts >= self.config.retry.max_attempts {
            return Err(err);
        }

        record.transition_to(SyncState::Retrying)?;
        self.publish(record);
        tracing::warn!(
            sync_id = %record.sync_id,
            correlation_key = %record.correlation_key,
            attempt = record.attempts,
            error = %err,
            "transient failure, backing off"
        );

        backoff::wait(&self.config.retry, record.attempts, &self.cancel).await?;

        record.transition_to(SyncState::Mutating)?;
        self.publish(record);
        Ok(())
    }

    fn publish(&self, record: &SyncRecord) {
        self.states
            .insert(record.correlation_key.clone(), record.state);
    }

    async fn call<T, F>(&self, operation: &str, fut: F) -> Result<T, SyncError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        match tokio::time::timeout(self.config.call_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(map_client_error(err)),
            Err(_) => Err(SyncError::Transient {
                message: format!("{operation} timed out after {:?}", self.config.call_timeout),
            }),
        }
    }
}

/// Converts a client failure from the read/write path into the domain
/// taxonomy. Ambiguity is handled by the resolver; seeing it here means
/// the client broke its contract, which is not retryable.
fn map_client_error(err: ClientError) -> SyncError {
    match err {
        ClientError::Ambiguous { matches } => SyncError::Permanent {
            message: format!("unexpected ambiguity outside resolution: {matches} matches"),
        },
        ClientError::NotFound { key } => SyncError::IssueNotFound { key },
        ClientError::UnknownField { remote_id } => SyncError::FieldNotFound { field: remote_id },
        ClientError::Transient { message } => SyncError::Transient { message },
        ClientError::Permanent { message } => SyncError::Permanent { message },
    }
}
