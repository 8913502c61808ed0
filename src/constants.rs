//! Application constants
//!
//! Centralized location for magic strings and configuration defaults.

/// Default URL for new HTTP requests
pub const DEFAULT_HTTP_URL: &str = "https://httpbin.org/get";

/// Key holding the JSON array of saved presets
pub const PRESETS_KEY: &str = "presets";

/// Key holding the JSON array of saved profiles
pub const PROFILES_KEY: &str = "profiles";

/// Extension of exported profile files
pub const PROFILE_FILE_EXTENSION: &str = "patchman";

/// Body returned when the URL does not parse
pub const INVALID_URL_MESSAGE: &str = "Invalid URL";

/// Status reported when an exchange produced no HTTP status
pub const NO_STATUS: i32 = -1;

/// Transport timeout when none is configured
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Entries kept in the in-memory request history
pub const MAX_HISTORY: usize = 50;

/// Directory under the home directory holding saved data
pub const DATA_DIR_NAME: &str = ".patchman";

pub const LOG_FILE_NAME: &str = "patchman.log";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
