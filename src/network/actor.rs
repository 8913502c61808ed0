//! Network actor - runs HTTP requests in the Tokio runtime

use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::messages::{NetworkCommand, NetworkResponse};
use crate::network::bulk::run_bulk;
use crate::network::client::execute_request;

/// Network actor that processes request and bulk commands
pub struct NetworkActor {
    client: reqwest::Client,
    response_tx: mpsc::UnboundedSender<NetworkResponse>,
    active_requests: JoinSet<()>,
}

impl NetworkActor {
    pub fn new(client: reqwest::Client, response_tx: mpsc::UnboundedSender<NetworkResponse>) -> Self {
        NetworkActor {
            client,
            response_tx,
            active_requests: JoinSet::new(),
        }
    }

    /// Run the network actor message loop
    pub async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<NetworkCommand>) {
        loop {
            tokio::select! {
                biased;

                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(NetworkCommand::ExecuteRequest { id, spec, reply }) => {
                            let client = self.client.clone();

                            self.active_requests.spawn(async move {
                                tracing::info!(id, url = %spec.url, method = spec.method.as_str(), "Executing request");
                                let result = execute_request(&client, &spec).await;
                                tracing::info!(id, status = result.display_status(), time_ms = result.time_ms, "Request completed");
                                // The caller may have given up waiting; nothing to do then
                                let _ = reply.send(result);
                            });
                        }

                        Some(NetworkCommand::ExecuteBulk { id, spec, bodies }) => {
                            let client = self.client.clone();
                            let response_tx = self.response_tx.clone();

                            self.active_requests.spawn(async move {
                                run_bulk(&client, id, spec, bodies, response_tx).await;
                            });
                        }

                        Some(NetworkCommand::Shutdown) | None => {
                            tracing::debug!(in_flight = self.active_requests.len(), "Network actor stopping");
                            break;
                        }
                    }
                }

                // Clean up completed tasks
                Some(result) = self.active_requests.join_next() => {
                    if let Err(e) = result {
                        tracing::warn!(error = %e, "Network task ended abnormally");
                    }
                }
            }
        }
    }
}
