//! # Tasklist
//!
//! Offline-first to-do list client. Tasks live in a local SQLite store and
//! are mirrored to a per-user remote document collection.
//!
//! ## Core Concepts
//!
//! - [`SqliteStore`]: the local store, source of every read
//! - [`RemoteCollection`]: the remote side, source of truth for [`Repository::sync`]
//! - [`Repository`]: commits locally first, then mirrors each change on a
//!   spawned task, queueing it in the outbox when it fails
//! - [`ConnectivitySignal`]: gates whether remote operations are attempted
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tasklist::{ConnectivitySignal, HttpRemote, Repository, SqliteStore};
//!
//! # async fn run() -> Result<(), tasklist::Error> {
//! let store = SqliteStore::open("tasks.db").await?;
//! let remote = Arc::new(HttpRemote::new("http://127.0.0.1:3000")?);
//! let repo = Repository::new(store, remote, ConnectivitySignal::new(true));
//!
//! let (task, write) = repo.create("alice", "Buy milk").await?;
//! write.wait().await;
//! repo.toggle("alice", &task.id).await?;
//! repo.refresh("alice").await?;
//! # Ok(())
//! # }
//! ```

pub mod autosync;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod outbox;
pub mod remote;
pub mod repository;
pub mod store;

pub use autosync::AutoSync;
pub use config::{Config, ConfigError};
pub use connectivity::{ConnectivityMonitor, ConnectivitySignal, Probe};
pub use error::{Error, Result};
pub use outbox::{FlushReport, PendingKind, PendingWrite};
pub use remote::{HttpRemote, MemoryRemote, RemoteCall, RemoteCollection, RemoteError};
pub use repository::{RemoteWrite, RemoteWriteOutcome, Repository, SyncOutcome};
pub use store::SqliteStore;

pub use tasklist_engine::{FieldUpdate, ReconcileStats, Task, TaskDocument};

use tasklist_engine::Timestamp;

/// Wall clock in milliseconds since the epoch.
pub(crate) fn now_millis() -> Timestamp {
    chrono::Utc::now().timestamp_millis().max(0) as Timestamp
}
