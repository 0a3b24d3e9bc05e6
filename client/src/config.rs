//! Configuration management for the client.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default remote collection server.
pub const DEFAULT_REMOTE_URL: &str = "http://127.0.0.1:3000";

/// Default connectivity probe interval in seconds.
pub const DEFAULT_PROBE_INTERVAL_SECS: u64 = 5;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// SQLite file backing the local store
    pub database_path: PathBuf,
    /// Base URL of the remote collection server
    pub remote_url: String,
    /// Authenticated user whose tasks are managed
    pub user_id: Option<String>,
    /// Bearer token for the remote; the user id is sent when unset
    pub token: Option<String>,
    /// How often the connectivity monitor probes the remote
    pub probe_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_path = match lookup("TASKLIST_DATABASE") {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => default_database_path(),
        };

        let remote_url = lookup("TASKLIST_REMOTE_URL")
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_REMOTE_URL.to_string());

        let user_id = lookup("TASKLIST_USER").filter(|user| !user.is_empty());
        let token = lookup("TASKLIST_TOKEN").filter(|token| !token.is_empty());

        let probe_interval_secs = match lookup("TASKLIST_PROBE_INTERVAL_SECS") {
            Some(value) => value
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidProbeInterval)?,
            None => DEFAULT_PROBE_INTERVAL_SECS,
        };

        Ok(Self {
            database_path,
            remote_url,
            user_id,
            token,
            probe_interval: Duration::from_secs(probe_interval_secs),
        })
    }

    /// The configured user, required by every task command.
    pub fn require_user(&self) -> Result<&str, ConfigError> {
        self.user_id.as_deref().ok_or(ConfigError::MissingUserId)
    }
}

/// Platform data directory location of the local database, falling back to
/// the temp directory.
pub fn default_database_path() -> PathBuf {
    let mut path = dirs::data_dir().unwrap_or_else(env::temp_dir);
    path.push("tasklist");
    path.push("tasks.db");
    path
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("TASKLIST_USER (or --user) is required")]
    MissingUserId,

    #[error("TASKLIST_PROBE_INTERVAL_SECS must be a positive integer")]
    InvalidProbeInterval,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.remote_url, DEFAULT_REMOTE_URL);
        assert_eq!(config.database_path, default_database_path());
        assert_eq!(config.user_id, None);
        assert_eq!(config.probe_interval, Duration::from_secs(5));
        assert_eq!(config.require_user(), Err(ConfigError::MissingUserId));
    }

    #[test]
    fn reads_all_variables() {
        let config = config_from(&[
            ("TASKLIST_DATABASE", "/tmp/t.db"),
            ("TASKLIST_REMOTE_URL", "http://remote:8080"),
            ("TASKLIST_USER", "alice"),
            ("TASKLIST_TOKEN", "secret"),
            ("TASKLIST_PROBE_INTERVAL_SECS", "30"),
        ])
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/t.db"));
        assert_eq!(config.remote_url, "http://remote:8080");
        assert_eq!(config.require_user(), Ok("alice"));
        assert_eq!(config.token.as_deref(), Some("secret"));
        assert_eq!(config.probe_interval, Duration::from_secs(30));
    }

    #[test]
    fn empty_values_are_unset() {
        let config = config_from(&[("TASKLIST_USER", ""), ("TASKLIST_TOKEN", "")]).unwrap();
        assert_eq!(config.user_id, None);
        assert_eq!(config.token, None);
    }

    #[test]
    fn rejects_bad_probe_interval() {
        for value in ["0", "-1", "soon"] {
            assert_eq!(
                config_from(&[("TASKLIST_PROBE_INTERVAL_SECS", value)]),
                Err(ConfigError::InvalidProbeInterval)
            );
        }
    }
}
