//! App state - the request composer and the snapshots it works on

use std::collections::BTreeMap;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::constants::DEFAULT_HTTP_URL;
use crate::json_value::JsonObject;
use crate::messages::NetworkResponse;
use crate::models::{CachePolicy, Preset, Profile, RequestMethod, RequestSpec, ResponseResult};
use crate::network::{BulkProgress, RequestExecutor};
use crate::storage::{FileStore, KeyValueStore, Storage};

/// Everything a front end edits and displays.
///
/// `presets` and `profiles` are detached copies of what is stored. They
/// change only through an explicit reload or after a successful save.
pub struct AppState<S: KeyValueStore = FileStore> {
    // Request composer
    pub url: String,
    pub method: RequestMethod,
    pub cache_policy: CachePolicy,
    pub headers: BTreeMap<String, String>,
    pub body: JsonObject,
    /// Query parameters added since the URL was last edited, as "key : value"
    pub params: Vec<String>,
    pub is_headers_enabled: bool,
    pub is_bulk_request: bool,
    pub bulk_bodies: Vec<JsonObject>,

    // Response
    pub response: Option<ResponseResult>,
    pub show_response_headers: bool,
    pub bulk: Option<BulkProgress>,

    // Saved data
    pub presets: Vec<Preset>,
    pub profiles: Vec<Profile>,
    pub storage: Storage<S>,

    pub(crate) executor: RequestExecutor,
    pub(crate) net_rx: mpsc::UnboundedReceiver<NetworkResponse>,
}

impl AppState<FileStore> {
    pub fn new(config: &Config) -> Result<Self> {
        AppState::with_storage(config, Storage::open(config))
    }
}

impl<S: KeyValueStore> AppState<S> {
    pub fn with_storage(config: &Config, storage: Storage<S>) -> Result<Self> {
        let (executor, net_rx) = RequestExecutor::new(config)?;
        let presets = storage.load_presets();
        let profiles = storage.load_profiles();
        tracing::debug!(presets = presets.len(), profiles = profiles.len(), "Loaded saved data");

        Ok(AppState {
            url: String::from(DEFAULT_HTTP_URL),
            method: RequestMethod::GET,
            cache_policy: CachePolicy::default(),
            headers: BTreeMap::new(),
            body: JsonObject::new(),
            params: Vec::new(),
            is_headers_enabled: false,
            is_bulk_request: false,
            bulk_bodies: Vec::new(),
            response: None,
            show_response_headers: false,
            bulk: None,
            presets,
            profiles,
            storage,
            executor,
            net_rx,
        })
    }

    /// The request the composer currently describes
    pub fn current_spec(&self) -> RequestSpec {
        RequestSpec {
            url: self.url.clone(),
            method: self.method,
            cache_policy: self.cache_policy,
            body: self.body.clone(),
            headers: self.headers.clone(),
        }
    }

    /// Snapshot of the composer as a savable profile
    pub fn to_profile(&self, name: impl Into<String>) -> Profile {
        Profile {
            profile_name: name.into(),
            method: self.method,
            url: self.url.clone(),
            headers: self.headers.clone(),
            request_body: self.body.clone(),
            is_headers_enabled: self.is_headers_enabled,
            is_bulk_request: self.is_bulk_request,
            bulk_request_body: self.bulk_bodies.clone(),
        }
    }

    /// Status of the last single response, -1 when it has none
    pub fn status(&self) -> Option<i32> {
        self.response.as_ref().map(ResponseResult::display_status)
    }

    /// Text for the response pane: pretty body, or headers when toggled
    pub fn response_text(&self) -> String {
        match &self.response {
            Some(resp) if self.show_response_headers => resp.headers_text(),
            Some(resp) => resp.pretty_body(),
            None => String::new(),
        }
    }
}
