//! Session configuration
//!
//! Mirrors the environment-driven config style used for the adapter:
//! `Default` for tests and embedding, `from_env()` for deployments.
//!
//! - `GTP_ENGINE_CMD`: engine command line
//! - `GTP_ENGINE_DIR`: working directory (default: `.`)
//! - `GTP_MERGE_STDERR`: `1`/`true` merges stderr into stdout
//! - `GTP_RESTORE_TIMEOUT_SECS`: readiness bound used by `restore_default` (default: 15)
//! - `GTP_LOG_PATH`: optional JSON-lines wire transcript

use std::path::PathBuf;
use std::time::Duration;

use crate::transport::LaunchConfig;

pub const DEFAULT_RESTORE_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub launch: LaunchConfig,
    pub restore_timeout: Duration,
    pub log_path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            launch: LaunchConfig::new(""),
            restore_timeout: Duration::from_secs(DEFAULT_RESTORE_TIMEOUT_SECS),
            log_path: None,
        }
    }
}

impl SessionConfig {
    pub fn new(launch: LaunchConfig) -> Self {
        Self {
            launch,
            ..Self::default()
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| {
            get(key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let command_line = non_empty("GTP_ENGINE_CMD").unwrap_or_default();
        let working_dir = non_empty("GTP_ENGINE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let merge_stderr = non_empty("GTP_MERGE_STDERR")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let restore_timeout = non_empty("GTP_RESTORE_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_RESTORE_TIMEOUT_SECS));
        let log_path = non_empty("GTP_LOG_PATH").map(PathBuf::from);

        Self {
            launch: LaunchConfig {
                command_line,
                working_dir,
                merge_stderr,
            },
            restore_timeout,
            log_path,
        }
    }

    /// True when an engine command line has been configured.
    pub fn is_configured(&self) -> bool {
        !self.launch.command_line.trim().is_empty()
    }
}
