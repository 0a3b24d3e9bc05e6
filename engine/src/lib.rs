//! # Tasklist Engine
//!
//! Task model and deterministic reconciliation for an offline-first to-do
//! list that mirrors a local store to a remote document collection.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine knows nothing about SQLite, HTTP or clocks
//! - **Deterministic**: the same local tasks and remote documents always
//!   produce the same changeset
//! - **Remote wins**: reconciliation treats the remote collection as the
//!   source of truth, with no timestamp or version comparison
//!
//! ## Core Concepts
//!
//! ### Tasks
//!
//! A [`Task`] is scoped by its owner. Its id is minted by the remote
//! collection and mirrored locally; [`TaskDocument`] is the remote shape
//! and [`FieldUpdate`] a single-field remote write.
//!
//! ### Remote documents
//!
//! [`RawDocument`]s come back from the remote collection as loose JSON.
//! [`RemoteDocument::parse`] reads them leniently: missing fields fall back
//! to defaults rather than failing.
//!
//! ### Changesets
//!
//! Local writes are staged as a [`Changeset`] for one owner and committed by
//! the store as a single unit.
//!
//! ### Reconciliation
//!
//! The [`Reconciler`] diffs local tasks against remote documents by id and
//! returns a [`ReconcilePlan`].
//!
//! ## Quick Start
//!
//! ```rust
//! use tasklist_engine::{RawDocument, Reconciler, Task};
//! use serde_json::json;
//!
//! let local = vec![
//!     Task::new("t1", "alice", "Buy milk", 1706745600000),
//!     Task::new("t2", "alice", "Deleted elsewhere", 1706745600000),
//! ];
//! let remote = vec![
//!     RawDocument::new("t1", json!({"id": "t1", "title": "Buy milk", "isDone": true})),
//!     RawDocument::new("t3", json!({"id": "t3", "title": "Walk dog"})),
//! ];
//!
//! let plan = Reconciler::new(1706745700000).reconcile("alice", &local, &remote);
//! assert_eq!(plan.stats.updated, 1);
//! assert_eq!(plan.stats.inserted, 1);
//! assert_eq!(plan.changeset.deletes, vec!["t2".to_string()]);
//! ```

pub mod changeset;
pub mod document;
pub mod error;
pub mod reconcile;
pub mod task;

// Re-export main types at crate root
pub use changeset::{Changeset, TaskPatch};
pub use document::{RawDocument, RemoteDocument};
pub use error::Error;
pub use reconcile::{ReconcilePlan, ReconcileStats, Reconciler};
pub use task::{FieldUpdate, Task, TaskDocument};

/// Type aliases for clarity
pub type TaskId = String;
pub type UserId = String;
pub type Timestamp = u64;
