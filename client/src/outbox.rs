//! Outbox of remote writes that have not reached the remote collection.
//!
//! Every local mutation is mirrored by one remote write. When that write
//! fails, or is not attempted because the client is offline, it is queued
//! here so the divergence between the two stores is tracked until a flush
//! replays it.

use serde::{Deserialize, Serialize};
use tasklist_engine::{FieldUpdate, TaskDocument, TaskId, Timestamp, UserId};

/// The remote write a queued entry stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PendingKind {
    /// Write the whole document
    Create { document: TaskDocument },
    /// Update a single field of an existing document
    Update { update: FieldUpdate },
    /// Remove the document
    Delete,
}

impl PendingKind {
    /// Short label used in logs and CLI output.
    pub fn label(&self) -> &'static str {
        match self {
            PendingKind::Create { .. } => "create",
            PendingKind::Update { .. } => "update",
            PendingKind::Delete => "delete",
        }
    }
}

/// A queued remote write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingWrite {
    /// Queue position, increasing in enqueue order
    pub seq: i64,
    pub owner_id: UserId,
    pub task_id: TaskId,
    pub kind: PendingKind,
    /// When the write was queued (milliseconds since epoch)
    pub queued_at: Timestamp,
    /// Error from the most recent attempt, if any
    pub last_error: Option<String>,
}

/// Result of replaying the outbox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlushReport {
    /// Writes accepted by the remote collection
    pub sent: usize,
    /// Updates dropped because their document no longer exists remotely
    pub dropped: usize,
    /// Writes still queued
    pub remaining: usize,
}

impl FlushReport {
    /// Check if the outbox is now empty.
    pub fn is_drained(&self) -> bool {
        self.remaining == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_kind_format() {
        let kind = PendingKind::Update {
            update: FieldUpdate::IsDone(true),
        };
        let json = serde_json::to_string(&kind).unwrap();
        assert_eq!(json, r#"{"type":"update","update":{"isDone":true}}"#);

        let parsed: PendingKind = serde_json::from_str(r#"{"type":"delete"}"#).unwrap();
        assert_eq!(parsed, PendingKind::Delete);
        assert_eq!(parsed.label(), "delete");
    }
}
