//! Shared test double: an in-memory issue tracker that records calls.
//!
//! `RecordingClient` behaves like a tiny tracker (issues, field catalog,
//! searches, comments) and records every write with its wall-clock
//! window, so tests can assert call counts and non-overlap. Failures are
//! scripted per-call through a FIFO queue.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use issuesync::types::{
    FieldMutation, FieldValue, IssueQuery, IssueRef, IssueSnapshot, IssueTemplate, MutationOp,
};
use issuesync::{ClientError, IssueTrackerClient, RemoteField};

/// Start/end window of one `apply_mutations` call, tagged with the
/// issue key it targeted.
#[derive(Debug, Clone)]
pub struct ApplyWindow {
    pub issue_key: String,
    pub start: Instant,
    pub end: Instant,
}

impl ApplyWindow {
    pub fn overlaps(&self, other: &ApplyWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Default)]
struct TrackerState {
    issues: HashMap<String, (IssueRef, IssueSnapshot)>,
    searches: HashMap<String, Vec<String>>,
    catalog: Vec<RemoteField>,
    comments: HashMap<String, Vec<String>>,
}

/// In-memory tracker double with scripted failures and call recording.
pub struct RecordingClient {
    state: Mutex<TrackerState>,
    apply_failures: Mutex<VecDeque<ClientError>>,
    apply_windows: Mutex<Vec<ApplyWindow>>,
    apply_calls: AtomicUsize,
    list_fields_calls: AtomicUsize,
    apply_delay: Duration,
    next_id: AtomicUsize,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TrackerState::default()),
            apply_failures: Mutex::new(VecDeque::new()),
            apply_windows: Mutex::new(Vec::new()),
            apply_calls: AtomicUsize::new(0),
            list_fields_calls: AtomicUsize::new(0),
            apply_delay: Duration::ZERO,
            next_id: AtomicUsize::new(10_000),
        }
    }

    /// Seeds an issue with the given key and snapshot.
    pub fn with_issue(self, key: &str, snapshot: IssueSnapshot) -> Self {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        self.state
            .lock()
            .unwrap()
            .issues
            .insert(key.to_string(), (IssueRef::new(id, key), snapshot));
        self
    }

    /// Seeds the field catalog.
    pub fn with_catalog(self, catalog: Vec<RemoteField>) -> Self {
        self.state.lock().unwrap().catalog = catalog;
        self
    }

    /// Scripts a search query to resolve to the given issue keys.
    pub fn with_search(self, query: &str, keys: &[&str]) -> Self {
        self.state.lock().unwrap().searches.insert(
            query.to_string(),
            keys.iter().map(ToString::to_string).collect(),
        );
        self
    }

    /// Makes every successful apply take this long (widens the window
    /// recorded for overlap assertions, and drives timeout tests).
    pub fn with_apply_delay(self, delay: Duration) -> Self {
        Self {
            apply_delay: delay,
            ..self
        }
    }

    /// Queues a failure for the next `apply_mutations` call.
    pub fn push_apply_failure(&self, err: ClientError) {
        self.apply_failures.lock().unwrap().push_back(err);
    }

    /// Replaces the field catalog (simulates remote schema drift).
    pub fn set_catalog(&self, catalog: Vec<RemoteField>) {
        self.state.lock().unwrap().catalog = catalog;
    }

    /// Current snapshot of an issue.
    pub fn snapshot(&self, key: &str) -> IssueSnapshot {
        self.state.lock().unwrap().issues[key].1.clone()
    }

    /// Comments created on an issue.
    pub fn comments(&self, key: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .comments
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Keys of all issues, including created ones.
    pub fn issue_keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.state.lock().unwrap().issues.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn apply_calls(&self) -> usize {
        self.apply_calls.load(Ordering::SeqCst)
    }

    pub fn list_fields_calls(&self) -> usize {
        self.list_fields_calls.load(Ordering::SeqCst)
    }

    pub fn apply_windows(&self) -> Vec<ApplyWindow> {
        self.apply_windows.lock().unwrap().clone()
    }

    fn record_window(&self, issue_key: &str, start: Instant) {
        self.apply_windows.lock().unwrap().push(ApplyWindow {
            issue_key: issue_key.to_string(),
            start,
            end: Instant::now(),
        });
    }
}

#[async_trait]
impl IssueTrackerClient for RecordingClient {
    async fn find_issue(&self, query: &IssueQuery) -> Result<Option<IssueRef>, ClientError> {
        let state = self.state.lock().unwrap();
        match query {
            IssueQuery::Key(key) => Ok(state.issues.get(key).map(|(issue, _)| issue.clone())),
            IssueQuery::Search(criterion) => {
                let Some(keys) = state.searches.get(criterion) else {
                    return Ok(None);
                };
                match keys.len() {
                    0 => Ok(None),
                    1 => Ok(state.issues.get(&keys[0]).map(|(issue, _)| issue.clone())),
                    matches => Err(ClientError::Ambiguous { matches }),
                }
            }
        }
    }

    async fn get_issue(&self, issue: &IssueRef) -> Result<IssueSnapshot, ClientError> {
        let state = self.state.lock().unwrap();
        state
            .issues
            .get(&issue.key)
            .map(|(_, snapshot)| snapshot.clone())
            .ok_or_else(|| ClientError::NotFound {
                key: issue.key.clone(),
            })
    }

    async fn create_issue(&self, template: &IssueTemplate) -> Result<IssueRef, ClientError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let key = format!("{}-{}", template.project, id);
        let issue = IssueRef::new(id.to_string(), key.clone());

        let mut snapshot = IssueSnapshot::new().with_status("To Do");
        snapshot.labels = template.labels.clone();

        self.state
            .lock()
            .unwrap()
            .issues
            .insert(key, (issue.clone(), snapshot));
        Ok(issue)
    }

    async fn apply_mutations(
        &self,
        issue: &IssueRef,
        mutations: &[FieldMutation],
    ) -> Result<(), ClientError> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);
        let start = Instant::now();

        if let Some(err) = self.apply_failures.lock().unwrap().pop_front() {
            self.record_window(&issue.key, start);
            return Err(err);
        }

        // Reject remote ids the catalog no longer carries, like a real
        // tracker does after a field is renamed or deleted.
        {
            let state = self.state.lock().unwrap();
            for mutation in mutations {
                if let Some(remote_id) = &mutation.remote_id {
                    if !state.catalog.iter().any(|f| &f.remote_id == remote_id) {
                        drop(state);
                        self.record_window(&issue.key, start);
                        return Err(ClientError::UnknownField {
                            remote_id: remote_id.clone(),
                        });
                    }
                }
            }
        }

        if !self.apply_delay.is_zero() {
            tokio::time::sleep(self.apply_delay).await;
        }

        let mut state = self.state.lock().unwrap();
        let Some((_, snapshot)) = state.issues.get_mut(&issue.key) else {
            drop(state);
            self.record_window(&issue.key, start);
            return Err(ClientError::NotFound {
                key: issue.key.clone(),
            });
        };

        let mut comment_bodies = Vec::new();
        for mutation in mutations {
            match &mutation.op {
                MutationOp::Set { value } => {
                    if let Some(remote_id) = &mutation.remote_id {
                        snapshot.fields.insert(remote_id.clone(), value.clone());
                    }
                }
                MutationOp::AppendText { value } => {
                    if let Some(remote_id) = &mutation.remote_id {
                        snapshot
                            .fields
                            .insert(remote_id.clone(), FieldValue::Text(value.clone()));
                    }
                }
                MutationOp::AddLabel { label } => {
                    if !snapshot.labels.iter().any(|l| l == label) {
                        snapshot.labels.push(label.clone());
                    }
                }
                MutationOp::AddComment { body } => {
                    comment_bodies.push(body.clone());
                }
                MutationOp::Transition { status } => {
                    snapshot.status = status.clone();
                }
            }
        }
        state
            .comments
            .entry(issue.key.clone())
            .or_default()
            .extend(comment_bodies);
        drop(state);

        self.record_window(&issue.key, start);
        Ok(())
    }

    async fn list_fields(&self) -> Result<Vec<RemoteField>, ClientError> {
        self.list_fields_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.lock().unwrap().catalog.clone())
    }
}
