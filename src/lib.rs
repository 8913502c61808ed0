//! # Patchman
//!
//! An HTTP request composer: assemble a URL, method, headers, query
//! parameters and a JSON body, send it, and inspect the response.
//!
//! ## Features
//! - HTTP methods: GET, POST, PUT, PATCH, DELETE
//! - Cache policy selection
//! - Bulk runs replaying one request over many bodies (CSV or JSON input)
//! - Saved presets and profiles, profile export/import (`.patchman` files)
//!
//! ## Architecture
//! Actor-based with channels:
//! - App Layer (`AppState`) - synchronous session state
//! - Network Layer (Tokio runtime) - async HTTP execution behind a
//!   blocking executor

pub mod app;
pub mod config;
pub mod constants;
pub mod csv_import;
pub mod json_value;
pub mod messages;
pub mod models;
pub mod network;
pub mod storage;

// Re-export commonly used types
pub use app::AppState;
pub use config::Config;
pub use json_value::{JsonObject, JsonValue};
pub use messages::{NetworkCommand, NetworkResponse};
pub use models::{
    CachePolicy, Preset, PresetType, Profile, RequestMethod, RequestSpec, ResponseResult,
    ResponseStatus,
};
pub use network::{BulkProgress, NetworkActor, RequestExecutor};
pub use storage::{FileStore, KeyValueStore, MemoryStore, Storage};
