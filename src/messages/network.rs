//! Network messages - communication between the session and the network layer

use tokio::sync::oneshot;

use crate::json_value::JsonObject;
use crate::models::{RequestSpec, ResponseResult};

/// Commands sent to the network actor
#[derive(Debug)]
pub enum NetworkCommand {
    /// Execute one request and hand the outcome back through `reply`
    ExecuteRequest {
        id: u64,
        spec: RequestSpec,
        reply: oneshot::Sender<ResponseResult>,
    },
    /// Replay `spec` once per body, strictly one after another
    ExecuteBulk {
        id: u64,
        spec: RequestSpec,
        bodies: Vec<JsonObject>,
    },
    /// Shutdown the network actor
    Shutdown,
}

/// Responses pushed from the network layer back to the session
#[derive(Debug, Clone)]
pub enum NetworkResponse {
    /// One finished request of a bulk run, in submission order
    BulkItem {
        id: u64,
        index: usize,
        status: i32,
        transcript: String,
    },
}

impl NetworkResponse {
    /// Get the run ID from the response
    pub fn id(&self) -> u64 {
        match self {
            NetworkResponse::BulkItem { id, .. } => *id,
        }
    }
}
