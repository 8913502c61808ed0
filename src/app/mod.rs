//! App layer - session state and the operations on it
//!
//! A front end edits `AppState`, calls its commands, and renders what
//! it holds. Single requests block inside `send_request`; bulk runs report
//! back through `poll_network` or `wait_for_bulk`.

pub mod state;
pub mod commands;

pub use state::AppState;
