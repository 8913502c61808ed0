//! Message types passed between the session and the network actor.

pub mod network;

pub use network::{NetworkCommand, NetworkResponse};
