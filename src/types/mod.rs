//! Core data model: activities, fields, issues, and sync lifecycle types.
//!
//! Wire-facing types serialize as camelCase JSON. Domain invariants
//! (payload ordering, state machine validation, tracker-sourced issue
//! references) live on the types themselves so every consumer gets them.

pub mod activity;
pub mod field;
pub mod issue;
pub mod sync;

pub use activity::{Activity, ActivityKind};
pub use field::{
    FieldDescriptor, FieldKind, FieldMutation, FieldSpec, FieldValue, MutationOp, MutationPolicy,
};
pub use issue::{IssueQuery, IssueRef, IssueSnapshot, IssueTemplate};
pub use sync::{SyncRecord, SyncReport, SyncResult, SyncState};
