//! Task types: the local record and its remote document shape.

use crate::{TaskId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// A to-do item as held in the local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Identifier minted by the remote collection's allocator
    pub id: TaskId,
    /// User that owns this task; scopes every local query
    pub owner_id: UserId,
    /// Free text title
    pub title: String,
    /// When the task was created (milliseconds since epoch), never mutated
    pub created_at: Timestamp,
    /// Whether the task has been checked off
    pub is_done: bool,
}

impl Task {
    /// Create a new, not yet done task.
    pub fn new(
        id: impl Into<TaskId>,
        owner_id: impl Into<UserId>,
        title: impl Into<String>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            title: title.into(),
            created_at,
            is_done: false,
        }
    }

    /// Flip the done flag and return the new value.
    pub fn toggle(&mut self) -> bool {
        self.is_done = !self.is_done;
        self.is_done
    }

    /// Apply a single field update.
    pub fn apply(&mut self, update: &FieldUpdate) {
        match update {
            FieldUpdate::Title(title) => self.title = title.clone(),
            FieldUpdate::IsDone(is_done) => self.is_done = *is_done,
        }
    }

    /// The remote document mirroring this task.
    pub fn to_document(&self) -> TaskDocument {
        TaskDocument::from(self)
    }
}

/// The document written to the remote collection for a task.
///
/// Wire shape: `{"id": "...", "title": "...", "createdAt": 1706745600000, "isDone": false}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDocument {
    pub id: TaskId,
    pub title: String,
    pub created_at: Timestamp,
    pub is_done: bool,
}

impl From<&Task> for TaskDocument {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            created_at: task.created_at,
            is_done: task.is_done,
        }
    }
}

/// A field-level update of one remote document.
///
/// Serialized as a single-key object, e.g. `{"isDone": true}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldUpdate {
    Title(String),
    IsDone(bool),
}

impl FieldUpdate {
    /// Name of the document field this update writes.
    pub fn field(&self) -> &'static str {
        match self {
            FieldUpdate::Title(_) => "title",
            FieldUpdate::IsDone(_) => "isDone",
        }
    }
}
