//! Remote collection: the per-user document store tasks are mirrored to.
//!
//! [`RemoteCollection`] is the seam between the repository and whatever
//! document database backs it. [`HttpRemote`] talks to `tasklist-server`;
//! [`MemoryRemote`] keeps documents in process.

mod http;
mod memory;

pub use http::HttpRemote;
pub use memory::{MemoryRemote, RemoteCall};

use async_trait::async_trait;
use tasklist_engine::{FieldUpdate, RawDocument, TaskDocument, TaskId};

/// Errors from the remote collection.
///
/// No distinction is made between transient and permanent failures.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid remote url: {0}")]
    InvalidUrl(String),

    #[error("remote returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("document not found: {0}")]
    NotFound(TaskId),

    #[error("remote collection unavailable")]
    Unavailable,
}

/// A per-user collection of task documents keyed by generated id.
#[async_trait]
pub trait RemoteCollection: Send + Sync {
    /// Allocate a fresh document id. Never touches the network.
    fn new_document_id(&self) -> TaskId;

    /// Write the whole document, replacing any existing one.
    async fn create(&self, owner: &str, document: &TaskDocument) -> Result<(), RemoteError>;

    /// Update a single field of an existing document.
    async fn update_field(
        &self,
        owner: &str,
        task_id: &str,
        update: &FieldUpdate,
    ) -> Result<(), RemoteError>;

    /// Fetch every document under the owner's collection.
    async fn fetch_all(&self, owner: &str) -> Result<Vec<RawDocument>, RemoteError>;

    /// Remove a document. Removing a missing document succeeds.
    async fn delete(&self, owner: &str, task_id: &str) -> Result<(), RemoteError>;
}
