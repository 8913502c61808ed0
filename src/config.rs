//! Runtime configuration, read from the environment

use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{DATA_DIR_NAME, DEFAULT_TIMEOUT_SECS, LOG_FILE_NAME};

const HOME_VAR: &str = "PATCHMAN_HOME";
const TIMEOUT_VAR: &str = "PATCHMAN_TIMEOUT_SECS";

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Where the key-value store and the log file live
    pub data_dir: PathBuf,
    /// Applied by the transport; this crate adds no timeout of its own
    pub request_timeout: Duration,
    pub log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: default_data_dir(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            log_file: LOG_FILE_NAME.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::var(HOME_VAR).ok(),
            std::env::var(TIMEOUT_VAR).ok(),
        )
    }

    fn from_vars(home: Option<String>, timeout: Option<String>) -> Self {
        let mut config = Config::default();

        if let Some(home) = home.filter(|h| !h.trim().is_empty()) {
            config.data_dir = PathBuf::from(home);
        }

        if let Some(raw) = timeout {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.request_timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %raw, "Ignoring invalid {}", TIMEOUT_VAR),
            }
        }

        config
    }

    /// Config rooted at an explicit directory, mostly for tests
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Config {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
}
