//! Network layer - HTTP request execution
//!
//! The Network actor receives commands and sends back responses. The
//! executor wraps it in a blocking API for single requests and a
//! channel-fed API for bulk runs.

pub mod actor;
pub mod bulk;
pub mod client;
pub mod executor;

#[cfg(test)]
pub(crate) mod test_server;

pub use actor::NetworkActor;
pub use bulk::BulkProgress;
pub use executor::RequestExecutor;
