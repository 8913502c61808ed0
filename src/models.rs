use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

use crate::constants::{INVALID_URL_MESSAGE, NO_STATUS};
use crate::json_value::JsonObject;

/// HTTP Method enum
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RequestMethod {
    #[default]
    GET,
    POST,
    PUT,
    PATCH,
    DELETE,
}

impl RequestMethod {
    pub const ALL: [RequestMethod; 5] = [
        RequestMethod::GET,
        RequestMethod::POST,
        RequestMethod::PUT,
        RequestMethod::PATCH,
        RequestMethod::DELETE,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMethod::GET => "GET",
            RequestMethod::POST => "POST",
            RequestMethod::PUT => "PUT",
            RequestMethod::PATCH => "PATCH",
            RequestMethod::DELETE => "DELETE",
        }
    }

    pub fn next(&self) -> RequestMethod {
        match self {
            RequestMethod::GET => RequestMethod::POST,
            RequestMethod::POST => RequestMethod::PUT,
            RequestMethod::PUT => RequestMethod::PATCH,
            RequestMethod::PATCH => RequestMethod::DELETE,
            RequestMethod::DELETE => RequestMethod::GET,
        }
    }

    /// Position in the method picker, which is also the persisted form.
    pub fn ordinal(&self) -> u8 {
        match self {
            RequestMethod::GET => 0,
            RequestMethod::POST => 1,
            RequestMethod::PUT => 2,
            RequestMethod::PATCH => 3,
            RequestMethod::DELETE => 4,
        }
    }

    pub fn from_ordinal(ordinal: u8) -> Option<RequestMethod> {
        Self::ALL.get(ordinal as usize).copied()
    }

    /// Case-insensitive parse of a method name.
    pub fn from_name(name: &str) -> Option<RequestMethod> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl Serialize for RequestMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.ordinal())
    }
}

impl<'de> Deserialize<'de> for RequestMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let ordinal = u8::deserialize(deserializer)?;
        RequestMethod::from_ordinal(ordinal)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown method ordinal {}", ordinal)))
    }
}

/// Cache strategy requested for a single exchange
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CachePolicy {
    #[default]
    UseProtocolDefault,
    IgnoreCache,
    IgnoreLocalCache,
    IgnoreLocalAndRemoteCache,
    Revalidate,
    ReturnCacheOrFail,
    ReturnCacheOrLoad,
}

/// Request headers a cache policy turns into. `None` leaves the
/// transport's own behaviour untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheDirective {
    pub cache_control: Option<&'static str>,
    pub pragma: Option<&'static str>,
}

impl CachePolicy {
    pub const ALL: [CachePolicy; 7] = [
        CachePolicy::UseProtocolDefault,
        CachePolicy::IgnoreCache,
        CachePolicy::IgnoreLocalCache,
        CachePolicy::IgnoreLocalAndRemoteCache,
        CachePolicy::Revalidate,
        CachePolicy::ReturnCacheOrFail,
        CachePolicy::ReturnCacheOrLoad,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CachePolicy::UseProtocolDefault => "use-protocol-default",
            CachePolicy::IgnoreCache => "ignore-cache",
            CachePolicy::IgnoreLocalCache => "ignore-local-cache",
            CachePolicy::IgnoreLocalAndRemoteCache => "ignore-local-and-remote-cache",
            CachePolicy::Revalidate => "revalidate",
            CachePolicy::ReturnCacheOrFail => "return-cache-or-fail",
            CachePolicy::ReturnCacheOrLoad => "return-cache-or-load",
        }
    }

    /// Map a picker label to a policy. Unknown labels get the protocol default.
    pub fn from_label(label: &str) -> CachePolicy {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.label().eq_ignore_ascii_case(label))
            .unwrap_or_default()
    }

    pub fn directive(&self) -> CacheDirective {
        let (cache_control, pragma) = match self {
            CachePolicy::UseProtocolDefault => (None, None),
            CachePolicy::IgnoreCache => (Some("no-store"), None),
            CachePolicy::IgnoreLocalCache => (Some("no-cache"), None),
            CachePolicy::IgnoreLocalAndRemoteCache => (Some("no-cache, no-store"), Some("no-cache")),
            CachePolicy::Revalidate => (Some("max-age=0, must-revalidate"), None),
            CachePolicy::ReturnCacheOrFail => (Some("only-if-cached"), None),
            CachePolicy::ReturnCacheOrLoad => (Some("max-stale"), None),
        };
        CacheDirective { cache_control, pragma }
    }
}

/// One outbound HTTP call
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestSpec {
    /// Raw text as typed; may not parse
    pub url: String,
    pub method: RequestMethod,
    pub cache_policy: CachePolicy,
    /// Empty means "send no payload", not "send {}"
    pub body: JsonObject,
    pub headers: BTreeMap<String, String>,
}

impl RequestSpec {
    pub fn new(url: impl Into<String>, method: RequestMethod) -> Self {
        RequestSpec {
            url: url.into(),
            method,
            ..Default::default()
        }
    }

    /// Same request with a different body; the bulk runner's per-row copy.
    pub fn with_body(&self, body: JsonObject) -> Self {
        RequestSpec {
            body,
            ..self.clone()
        }
    }
}

/// Status line and headers of a completed exchange
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResponseStatus {
    pub code: u16,
    pub headers: BTreeMap<String, String>,
}

/// Outcome of one execution attempt
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResponseResult {
    /// Response body, or an error message as UTF-8 when `status` is `None`
    pub body_bytes: Vec<u8>,
    pub status: Option<ResponseStatus>,
    pub time_ms: u64,
}

impl ResponseResult {
    pub fn invalid_url() -> Self {
        Self::failure(INVALID_URL_MESSAGE, 0)
    }

    /// Pseudo-response carrying an error description instead of a body
    pub fn failure(message: impl Into<String>, time_ms: u64) -> Self {
        ResponseResult {
            body_bytes: message.into().into_bytes(),
            status: None,
            time_ms,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status.as_ref().map(|s| s.code)
    }

    /// Status code for display and bulk outcomes, -1 when there is none
    pub fn display_status(&self) -> i32 {
        self.status_code().map(i32::from).unwrap_or(NO_STATUS)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body_bytes).into_owned()
    }

    /// Body re-indented when it parses as JSON, raw text otherwise
    pub fn pretty_body(&self) -> String {
        match serde_json::from_slice::<serde_json::Value>(&self.body_bytes) {
            Ok(json) => serde_json::to_string_pretty(&json).unwrap_or_else(|_| self.body_text()),
            Err(_) => self.body_text(),
        }
    }

    /// Response headers one `name: value` per line
    pub fn headers_text(&self) -> String {
        self.status
            .as_ref()
            .map(|s| {
                s.headers
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default()
    }
}

pub fn is_success(code: i32) -> bool {
    (200..300).contains(&code)
}

/// Which side of the request a preset fills in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PresetType {
    HeaderField,
    BodyField,
}

/// A reusable header or body key/value pair
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub preset_type: PresetType,
    pub key: String,
    pub value: String,
    pub preset_name: String,
}

impl Preset {
    pub fn new(
        preset_type: PresetType,
        preset_name: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Preset {
            preset_type,
            key: key.into(),
            value: value.into(),
            preset_name: preset_name.into(),
        }
    }
}

/// A saved request configuration, possibly a bulk template
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub profile_name: String,
    pub method: RequestMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub request_body: JsonObject,
    pub is_headers_enabled: bool,
    pub is_bulk_request: bool,
    pub bulk_request_body: Vec<JsonObject>,
}

/// History entry
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    pub request: RequestSpec,
    pub status: i32,
    pub time_ms: u64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}
