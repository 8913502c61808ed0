//! HTTP client wrapper - builds reqwest requests from a `RequestSpec` and
//! folds every outcome into a `ResponseResult`

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;
use std::time::Instant;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CACHE_CONTROL, CONTENT_TYPE, PRAGMA};

use crate::config::Config;
use crate::constants::INVALID_URL_MESSAGE;
use crate::models::{RequestMethod, RequestSpec, ResponseResult, ResponseStatus};

/// Why an exchange produced no HTTP status
#[derive(Debug)]
pub enum ExecutionFailure {
    /// The URL text did not parse; nothing was sent
    MalformedUrl,
    /// DNS, connect, TLS, timeout or body read failure
    Transport(reqwest::Error),
}

impl fmt::Display for ExecutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionFailure::MalformedUrl => f.write_str(INVALID_URL_MESSAGE),
            ExecutionFailure::Transport(e) => f.write_str(&describe_transport_error(e)),
        }
    }
}

impl ExecutionFailure {
    fn into_result(self, time_ms: u64) -> ResponseResult {
        ResponseResult::failure(self.to_string(), time_ms)
    }
}

impl From<RequestMethod> for reqwest::Method {
    fn from(method: RequestMethod) -> Self {
        match method {
            RequestMethod::GET => reqwest::Method::GET,
            RequestMethod::POST => reqwest::Method::POST,
            RequestMethod::PUT => reqwest::Method::PUT,
            RequestMethod::PATCH => reqwest::Method::PATCH,
            RequestMethod::DELETE => reqwest::Method::DELETE,
        }
    }
}

/// Build a request from the given spec
pub fn build_request(
    client: &reqwest::Client,
    spec: &RequestSpec,
) -> Result<reqwest::RequestBuilder, ExecutionFailure> {
    let url = reqwest::Url::parse(&spec.url).map_err(|_| ExecutionFailure::MalformedUrl)?;

    let mut headers = HeaderMap::new();

    let directive = spec.cache_policy.directive();
    if let Some(value) = directive.cache_control {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static(value));
    }
    if let Some(value) = directive.pragma {
        headers.insert(PRAGMA, HeaderValue::from_static(value));
    }

    let payload = if spec.body.is_empty() {
        None
    } else {
        match serde_json::to_vec(&spec.body) {
            Ok(bytes) => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                Some(bytes)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Request body is not encodable, sending without payload");
                None
            }
        }
    };

    // User headers go last so they win over anything set above
    for (key, value) in &spec.headers {
        match (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!(header = %key, "Skipping header the transport rejects"),
        }
    }

    let mut req_builder = client.request(spec.method.into(), url).headers(headers);
    if let Some(bytes) = payload {
        req_builder = req_builder.body(bytes);
    }

    Ok(req_builder)
}

/// Execute a request and return the buffered response. Never fails: every
/// error becomes a result whose body is the error text. The status is only
/// present when response headers were received.
pub async fn execute_request(client: &reqwest::Client, spec: &RequestSpec) -> ResponseResult {
    let req_builder = match build_request(client, spec) {
        Ok(builder) => builder,
        Err(failure) => return failure.into_result(0),
    };

    let start = Instant::now();
    let result = req_builder.send().await;

    let resp = match result {
        Ok(resp) => resp,
        Err(e) => {
            let elapsed = start.elapsed().as_millis() as u64;
            return ExecutionFailure::Transport(e).into_result(elapsed);
        }
    };

    let status = ResponseStatus {
        code: resp.status().as_u16(),
        headers: flatten_headers(resp.headers()),
    };

    match resp.bytes().await {
        Ok(bytes) => ResponseResult {
            body_bytes: bytes.to_vec(),
            status: Some(status),
            time_ms: start.elapsed().as_millis() as u64,
        },
        // Headers arrived, so the status is kept alongside the error text
        Err(e) => {
            let elapsed = start.elapsed().as_millis() as u64;
            ResponseResult {
                status: Some(status),
                ..ExecutionFailure::Transport(e).into_result(elapsed)
            }
        }
    }
}

/// Repeated headers are joined with ", "
fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut flat: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        flat.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    flat
}

fn describe_transport_error(e: &reqwest::Error) -> String {
    let mut msg = if e.is_timeout() {
        "Request timed out".to_string()
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else {
        format!("Request failed: {}", e)
    };

    let mut source = e.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}

/// Create an HTTP client with the configured timeout
pub fn create_client(config: &Config) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_value::JsonValue;
    use crate::models::CachePolicy;

    fn built(spec: &RequestSpec) -> reqwest::Request {
        let client = reqwest::Client::new();
        build_request(&client, spec).unwrap().build().unwrap()
    }

    #[test]
    fn test_malformed_url_is_rejected_before_sending() {
        let client = reqwest::Client::new();
        let spec = RequestSpec::new("not a url", RequestMethod::GET);
        let failure = build_request(&client, &spec).err().unwrap();
        assert!(matches!(failure, ExecutionFailure::MalformedUrl));
        assert_eq!(failure.to_string(), "Invalid URL");
    }

    #[test]
    fn test_empty_body_sends_no_payload() {
        let spec = RequestSpec::new("http://localhost/items", RequestMethod::POST);
        let req = built(&spec);
        assert_eq!(req.method(), &reqwest::Method::POST);
        assert!(req.body().is_none());
        assert!(req.headers().get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_body_is_json_encoded() {
        let mut spec = RequestSpec::new("http://localhost/items", RequestMethod::PUT);
        spec.body.insert("name".into(), JsonValue::from("ada"));
        spec.body.insert("age".into(), JsonValue::Int(36));
        let req = built(&spec);
        let bytes = req.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(bytes, br#"{"age":36,"name":"ada"}"#);
        assert_eq!(req.headers()[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_user_headers_override_defaults() {
        let mut spec = RequestSpec::new("http://localhost/", RequestMethod::POST);
        spec.cache_policy = CachePolicy::IgnoreLocalCache;
        spec.body.insert("k".into(), JsonValue::from("v"));
        spec.headers.insert("Content-Type".into(), "text/plain".into());
        spec.headers.insert("Cache-Control".into(), "private".into());
        spec.headers.insert("X-Trace".into(), "abc".into());
        let req = built(&spec);
        assert_eq!(req.headers()[CONTENT_TYPE], "text/plain");
        assert_eq!(req.headers().get_all(CACHE_CONTROL).iter().count(), 1);
        assert_eq!(req.headers()[CACHE_CONTROL], "private");
        assert_eq!(req.headers()["x-trace"], "abc");
    }

    #[test]
    fn test_cache_policy_becomes_headers() {
        let mut spec = RequestSpec::new("http://localhost/", RequestMethod::GET);
        assert!(built(&spec).headers().get(CACHE_CONTROL).is_none());

        spec.cache_policy = CachePolicy::IgnoreLocalAndRemoteCache;
        let req = built(&spec);
        assert_eq!(req.headers()[CACHE_CONTROL], "no-cache, no-store");
        assert_eq!(req.headers()[PRAGMA], "no-cache");
    }

    #[test]
    fn test_invalid_header_is_skipped() {
        let mut spec = RequestSpec::new("http://localhost/", RequestMethod::GET);
        spec.headers.insert("bad header".into(), "x".into());
        spec.headers.insert("X-Ok".into(), "yes".into());
        let req = built(&spec);
        assert_eq!(req.headers().len(), 1);
    }

    #[test]
    fn test_flatten_joins_repeated_headers() {
        let mut map = HeaderMap::new();
        map.append("set-cookie", HeaderValue::from_static("a=1"));
        map.append("set-cookie", HeaderValue::from_static("b=2"));
        let flat = flatten_headers(&map);
        assert_eq!(flat["set-cookie"], "a=1, b=2");
    }
}
