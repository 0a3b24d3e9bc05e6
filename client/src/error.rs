//! Unified error handling for the client.

use crate::config::ConfigError;
use crate::remote::RemoteError;

/// Client error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Local store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("Local store migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Engine error: {0}")]
    Engine(#[from] tasklist_engine::Error),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
