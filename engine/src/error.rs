//! Error types for the tasklist engine.

use crate::{TaskId, UserId};
use thiserror::Error;

/// All possible errors from the tasklist engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Document errors
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    // Changeset errors
    #[error("task already exists: {0}")]
    DuplicateTask(TaskId),

    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("owner mismatch: expected '{expected}', got '{actual}'")]
    OwnerMismatch { expected: UserId, actual: UserId },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
