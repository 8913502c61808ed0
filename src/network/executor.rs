//! Blocking front door to the network actor.
//!
//! The executor owns a small Tokio runtime with the [`NetworkActor`] running
//! on it. Single requests are handed over with a one-shot reply channel and
//! the calling thread parks on that channel until the outcome arrives, so
//! callers see a plain synchronous function. Bulk runs are fire-and-forget;
//! their results come back on the response channel returned by [`RequestExecutor::new`].

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use tokio::runtime::Runtime;
use tokio::sync::{mpsc, oneshot};

use crate::config::Config;
use crate::json_value::JsonObject;
use crate::messages::{NetworkCommand, NetworkResponse};
use crate::models::{RequestSpec, ResponseResult};
use crate::network::client::create_client;
use crate::network::NetworkActor;

const NETWORK_STOPPED: &str = "Network layer is not running";

pub struct RequestExecutor {
    // Owns the actor's threads; dropping it stops the network layer
    _runtime: Runtime,
    cmd_tx: mpsc::UnboundedSender<NetworkCommand>,
    next_id: AtomicU64,
}

impl RequestExecutor {
    /// Start the runtime and the network actor.
    ///
    /// Must be called outside any Tokio runtime.
    pub fn new(config: &Config) -> Result<(Self, mpsc::UnboundedReceiver<NetworkResponse>)> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("patchman-net")
            .enable_all()
            .build()
            .context("starting network runtime")?;

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<NetworkCommand>();
        let (resp_tx, resp_rx) = mpsc::unbounded_channel::<NetworkResponse>();

        let actor = NetworkActor::new(create_client(config), resp_tx);
        runtime.spawn(actor.run(cmd_rx));

        let executor = RequestExecutor {
            _runtime: runtime,
            cmd_tx,
            next_id: AtomicU64::new(1),
        };
        Ok((executor, resp_rx))
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Execute one request, blocking the calling thread until it finishes.
    ///
    /// Always yields exactly one result: the response (any status code), a
    /// transport error rendered as text, or `Invalid URL`. There is no
    /// timeout beyond the transport's own and no way to cancel.
    ///
    /// # Panics
    ///
    /// Panics when called from inside an async context. Parking a runtime
    /// thread on the reply would stall the task that has to produce it.
    pub fn execute(&self, spec: RequestSpec) -> ResponseResult {
        let id = self.next_id();
        let (reply_tx, reply_rx) = oneshot::channel();

        let sent = self.cmd_tx.send(NetworkCommand::ExecuteRequest {
            id,
            spec,
            reply: reply_tx,
        });
        if sent.is_err() {
            return ResponseResult::failure(NETWORK_STOPPED, 0);
        }

        reply_rx
            .blocking_recv()
            .unwrap_or_else(|_| ResponseResult::failure(NETWORK_STOPPED, 0))
    }

    /// Queue a bulk run and return its id without waiting for it
    pub fn submit_bulk(&self, spec: RequestSpec, bodies: Vec<JsonObject>) -> Result<u64> {
        let id = self.next_id();
        self.cmd_tx
            .send(NetworkCommand::ExecuteBulk { id, spec, bodies })
            .map_err(|_| anyhow::anyhow!(NETWORK_STOPPED))?;
        Ok(id)
    }
}

impl Drop for RequestExecutor {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(NetworkCommand::Shutdown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_value::JsonValue;
    use crate::models::{CachePolicy, RequestMethod};
    use crate::network::bulk::BulkProgress;
    use crate::network::test_server::{closed_port_url, response, serve};

    fn executor() -> (RequestExecutor, mpsc::UnboundedReceiver<NetworkResponse>) {
        RequestExecutor::new(&Config::default()).unwrap()
    }

    fn body(pairs: &[(&str, &str)]) -> JsonObject {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), JsonValue::from(*v)))
            .collect()
    }

    fn wait_for(progress: &mut BulkProgress, rx: &mut mpsc::UnboundedReceiver<NetworkResponse>) {
        while !progress.is_complete() {
            let msg = rx.blocking_recv().expect("network actor stopped");
            progress.apply(&msg);
        }
    }

    #[test]
    fn test_invalid_url_yields_placeholder() {
        let (executor, _rx) = executor();
        let result = executor.execute(RequestSpec::new("::not a url::", RequestMethod::GET));
        assert!(result.status.is_none());
        assert_eq!(result.body_bytes, b"Invalid URL");
    }

    #[test]
    fn test_success_returns_raw_body_and_status() {
        let (url, server) = serve(vec![response(200, "OK", r#"{"ok":true}"#)]);
        let (executor, _rx) = executor();

        let mut spec = RequestSpec::new(format!("{}/things?x=1", url), RequestMethod::POST);
        spec.body = body(&[("name", "ada")]);
        spec.headers.insert("X-Api-Key".into(), "secret".into());
        spec.cache_policy = CachePolicy::Revalidate;
        let result = executor.execute(spec);

        let status = result.status.as_ref().unwrap();
        assert_eq!(status.code, 200);
        assert_eq!(status.headers["x-served-by"], "test");
        assert_eq!(result.body_bytes, br#"{"ok":true}"#);

        let captured = server.join().unwrap();
        assert_eq!(captured[0].request_line, "POST /things?x=1 HTTP/1.1");
        assert_eq!(captured[0].header("x-api-key"), Some("secret"));
        assert_eq!(captured[0].header("cache-control"), Some("max-age=0, must-revalidate"));
        assert_eq!(captured[0].body, br#"{"name":"ada"}"#);
    }

    #[test]
    fn test_error_status_is_still_a_response() {
        let (url, server) = serve(vec![response(404, "Not Found", "missing")]);
        let (executor, _rx) = executor();
        let result = executor.execute(RequestSpec::new(url, RequestMethod::DELETE));
        assert_eq!(result.status_code(), Some(404));
        assert_eq!(result.body_text(), "missing");
        let captured = server.join().unwrap();
        assert!(captured[0].body.is_empty());
    }

    #[test]
    fn test_refused_connection_yields_error_text() {
        let (executor, _rx) = executor();
        let result = executor.execute(RequestSpec::new(closed_port_url(), RequestMethod::GET));
        assert!(result.status.is_none());
        assert!(!result.body_bytes.is_empty());
        assert_ne!(result.body_text(), "Invalid URL");
    }

    #[test]
    fn test_bulk_preserves_submission_order() {
        let (url, server) = serve(vec![
            response(201, "Created", "{}"),
            response(500, "Internal Server Error", "oops"),
            response(200, "OK", r#"{"n":3}"#),
        ]);
        let (executor, mut rx) = executor();

        let bodies = vec![body(&[("n", "1")]), body(&[("n", "2")]), body(&[("n", "3")])];
        let mut base = RequestSpec::new(url, RequestMethod::POST);
        base.headers.insert("X-Batch".into(), "yes".into());
        let id = executor.submit_bulk(base, bodies).unwrap();

        let mut progress = BulkProgress::new(id, 3);
        wait_for(&mut progress, &mut rx);

        assert_eq!(progress.statuses(), &[201, 500, 200]);
        assert_eq!(progress.success_count(), 2);
        assert!(progress.transcript().contains("----- Response 2 START (status 500) -----\noops\n"));

        let captured = server.join().unwrap();
        let sent: Vec<String> = captured
            .iter()
            .map(|c| String::from_utf8_lossy(&c.body).into_owned())
            .collect();
        assert_eq!(sent, vec![r#"{"n":"1"}"#, r#"{"n":"2"}"#, r#"{"n":"3"}"#]);
        assert!(captured.iter().all(|c| c.header("x-batch") == Some("yes")));
    }

    #[test]
    fn test_bulk_keeps_going_after_failures() {
        let (executor, mut rx) = executor();
        let bodies = vec![JsonObject::new(); 4];
        let id = executor
            .submit_bulk(RequestSpec::new("no scheme here", RequestMethod::GET), bodies)
            .unwrap();

        let mut progress = BulkProgress::new(id, 4);
        wait_for(&mut progress, &mut rx);
        assert_eq!(progress.statuses(), &[-1, -1, -1, -1]);
        assert_eq!(progress.success_count(), 0);
    }

    #[test]
    fn test_truncated_body_keeps_status() {
        let truncated =
            "HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\nshort".to_string();
        let (url, server) = serve(vec![truncated]);
        let (executor, _rx) = executor();
        let result = executor.execute(RequestSpec::new(url, RequestMethod::GET));
        server.join().unwrap();

        assert_eq!(result.status_code(), Some(200));
        assert!(!result.body_bytes.is_empty());
        assert_ne!(result.body_text(), "short");
    }

    #[test]
    fn test_empty_bulk_sends_nothing() {
        let (executor, mut rx) = executor();
        let empty_id = executor
            .submit_bulk(RequestSpec::new("http://127.0.0.1:9/", RequestMethod::GET), Vec::new())
            .unwrap();
        let later_id = executor
            .submit_bulk(RequestSpec::new("no scheme here", RequestMethod::GET), vec![JsonObject::new()])
            .unwrap();

        let mut seen = Vec::new();
        let mut later = BulkProgress::new(later_id, 1);
        while !later.is_complete() {
            let msg = rx.blocking_recv().expect("network actor stopped");
            seen.push(msg.id());
            later.apply(&msg);
        }
        assert_eq!(later.statuses(), &[-1]);

        // Stopping the runtime closes the channel, so everything ever sent is drained
        drop(executor);
        while let Some(msg) = rx.blocking_recv() {
            seen.push(msg.id());
        }
        assert!(!seen.contains(&empty_id));
        assert_eq!(seen, vec![later_id]);
    }
}
