//! Bulk runner - replays one request template over a list of bodies.
//!
//! The worker runs the requests strictly one after another and pushes each
//! outcome through the response channel as soon as it is known. The session
//! side folds those messages into a [`BulkProgress`]; a run is finished once
//! it holds one status per submitted body. No separate "done" message exists.

use tokio::sync::mpsc;

use crate::json_value::JsonObject;
use crate::messages::NetworkResponse;
use crate::models::{is_success, RequestSpec, ResponseResult};
use crate::network::client::execute_request;

/// Worker body for one bulk run.
///
/// A failed request never stops the batch. The loop only ends early when
/// nobody is listening for results any more.
pub async fn run_bulk(
    client: &reqwest::Client,
    id: u64,
    base: RequestSpec,
    bodies: Vec<JsonObject>,
    response_tx: mpsc::UnboundedSender<NetworkResponse>,
) {
    let total = bodies.len();
    tracing::info!(id, total, url = %base.url, method = base.method.as_str(), "Starting bulk run");

    for (index, body) in bodies.into_iter().enumerate() {
        let spec = base.with_body(body);
        let result = execute_request(client, &spec).await;
        let status = result.display_status();
        tracing::debug!(id, index, status, "Bulk item completed");

        let item = NetworkResponse::BulkItem {
            id,
            index,
            status,
            transcript: frame_transcript(index, &result),
        };
        if response_tx.send(item).is_err() {
            tracing::debug!(id, index, "Bulk results no longer observed, stopping");
            return;
        }
    }

    tracing::info!(id, total, "Bulk run finished");
}

/// One response framed by start/end markers for the transcript view
pub fn frame_transcript(index: usize, result: &ResponseResult) -> String {
    let number = index + 1;
    format!(
        "----- Response {number} START (status {}) -----\n{}\n----- Response {number} END -----\n\n",
        result.display_status(),
        result.pretty_body(),
    )
}

/// Outcomes of a bulk run as seen by the session
#[derive(Clone, Debug, Default)]
pub struct BulkProgress {
    pub id: u64,
    expected: usize,
    statuses: Vec<i32>,
    transcript: String,
}

impl BulkProgress {
    pub fn new(id: u64, expected: usize) -> Self {
        BulkProgress {
            id,
            expected,
            statuses: Vec::with_capacity(expected),
            transcript: String::new(),
        }
    }

    /// Fold a network message in. Returns false if it belongs to another run.
    pub fn apply(&mut self, response: &NetworkResponse) -> bool {
        match response {
            NetworkResponse::BulkItem { id, status, transcript, .. } if *id == self.id => {
                self.statuses.push(*status);
                self.transcript.push_str(transcript);
                true
            }
            _ => false,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.statuses.len() == self.expected
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Status codes in submission order, -1 where none was obtained
    pub fn statuses(&self) -> &[i32] {
        &self.statuses
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn success_count(&self) -> usize {
        self.statuses.iter().filter(|&&c| is_success(c)).count()
    }
}
