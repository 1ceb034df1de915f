//! Activity-to-issue synchronization core.
//!
//! Translates application-level activities (logins, task completions,
//! metrics, webhook firings) into idempotent mutations against a remote
//! issue tracker: resolve or create the target issue, map the activity
//! onto standard and dynamically-named custom fields, and persist the
//! change despite an unreliable network boundary.
//!
//! The tracker itself is an external collaborator reached only through
//! the [`IssueTrackerClient`] trait; transport, authentication, and
//! presentation are explicitly out of scope.
//!
//! # Pipeline
//!
//! ```text
//! Activity -> ActivityMapper (FieldRegistry) -> [FieldMutation] -> SyncEngine -> IssueTrackerClient
//! ```
//!
//! The engine serializes syncs per correlation key, retries transient
//! failures with full-jitter exponential backoff, self-heals field
//! schema drift once per sync, and returns a classified
//! [`SyncResult`](types::SyncResult) for every call -- remote-boundary
//! failures never escape as raw transport errors.
//!
//! # Module Organization
//!
//! - [`types`] - Activities, fields, mutations, issues, sync lifecycle
//! - [`error`] - The closed error taxonomy ([`SyncError`], [`ClientError`])
//! - [`client`] - The tracker boundary trait
//! - [`registry`] - Lazy, single-flight field resolution with invalidation
//! - [`resolver`] - Correlation key to issue reference
//! - [`mapper`] - Payload to ordered mutation instructions
//! - [`engine`] - Orchestration, retry, and concurrency control
//! - [`config`] - Retry schedule, timeouts, pool size, policies

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod mapper;
pub mod registry;
pub mod resolver;
pub mod types;

pub use client::{IssueTrackerClient, RemoteField};
pub use config::{RetryConfig, SyncConfig};
pub use engine::SyncEngine;
pub use error::{ClientError, ErrorKind, SyncError};
pub use mapper::ActivityMapper;
pub use registry::FieldRegistry;
pub use resolver::{CreationPolicy, IssueResolver};
pub use types::{
    Activity, ActivityKind, FieldDescriptor, FieldKind, FieldMutation, FieldSpec, FieldValue,
    IssueQuery, IssueRef, IssueSnapshot, IssueTemplate, MutationOp, MutationPolicy, SyncRecord,
    SyncReport, SyncResult, SyncState,
};
