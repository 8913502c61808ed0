//! Command handlers - the operations a front end invokes on the session

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

use crate::app::AppState;
use crate::csv_import;
use crate::json_value::{JsonObject, JsonValue};
use crate::messages::NetworkResponse;
use crate::models::{HistoryEntry, Preset, PresetType, Profile, ResponseResult};
use crate::network::BulkProgress;
use crate::storage::{self, KeyValueStore};

impl<S: KeyValueStore> AppState<S> {
    // ========================
    // Composer
    // ========================

    /// Replace the URL text. Previously added params no longer apply.
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
        self.params.clear();
    }

    pub fn cycle_method(&mut self) {
        self.method = self.method.next();
    }

    /// Append `key=value` to the URL's query. Leaves an unparsable URL alone.
    pub fn add_query_param(&mut self, key: &str, value: &str) -> bool {
        let Ok(mut url) = reqwest::Url::parse(&self.url) else {
            tracing::debug!(url = %self.url, "Cannot add query param to unparsable URL");
            return false;
        };
        url.query_pairs_mut().append_pair(key, value);
        self.url = url.to_string();
        self.params.push(format!("{} : {}", key, value));
        true
    }

    pub fn add_header(&mut self, key: &str, value: &str) {
        if key.trim().is_empty() {
            return;
        }
        self.headers.insert(key.to_string(), value.to_string());
    }

    pub fn clear_headers(&mut self) {
        self.headers.clear();
    }

    pub fn add_body_field(&mut self, key: &str, value: impl Into<JsonValue>) {
        if key.trim().is_empty() {
            return;
        }
        self.body.insert(key.to_string(), value.into());
    }

    pub fn clear_body(&mut self) {
        self.body.clear();
    }

    // ========================
    // Presets
    // ========================

    pub fn apply_preset(&mut self, preset: &Preset) {
        match preset.preset_type {
            PresetType::HeaderField => self.add_header(&preset.key, &preset.value),
            PresetType::BodyField => self.add_body_field(&preset.key, preset.value.as_str()),
        }
    }

    pub fn save_preset(
        &mut self,
        preset_type: PresetType,
        name: &str,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let preset = Preset::new(preset_type, name, key, value);
        self.storage.append_preset(preset.clone())?;
        self.presets.push(preset);
        Ok(())
    }

    // ========================
    // Profiles
    // ========================

    pub fn save_profile(&mut self, name: &str) -> Result<Profile> {
        let profile = self.to_profile(name);
        self.storage.append_profile(profile.clone())?;
        self.profiles.push(profile.clone());
        tracing::info!(profile = name, "Saved profile");
        Ok(profile)
    }

    fn find_profile(&self, name: &str) -> Option<&Profile> {
        // Later saves under the same name shadow earlier ones
        self.profiles.iter().rev().find(|p| p.profile_name == name)
    }

    /// Load a saved profile into the composer
    pub fn select_profile(&mut self, name: &str) -> bool {
        let Some(profile) = self.find_profile(name).cloned() else {
            return false;
        };
        self.method = profile.method;
        self.set_url(profile.url);
        self.headers = profile.headers;
        self.body = profile.request_body;
        self.is_headers_enabled = profile.is_headers_enabled;
        self.is_bulk_request = profile.is_bulk_request;
        self.bulk_bodies = profile.bulk_request_body;
        true
    }

    /// Drop a profile from the in-memory list only. Storage keeps it and
    /// it comes back on the next reload.
    pub fn forget_profile(&mut self, name: &str) -> bool {
        let before = self.profiles.len();
        self.profiles.retain(|p| p.profile_name != name);
        before != self.profiles.len()
    }

    /// Refresh the snapshots from storage
    pub fn reload_saved(&mut self) {
        self.presets = self.storage.load_presets();
        self.profiles = self.storage.load_profiles();
    }

    pub fn export_profile(&self, name: &str, path: &Path) -> Result<PathBuf> {
        let profile = self
            .find_profile(name)
            .ok_or_else(|| anyhow!("no profile named {}", name))?;
        storage::export_profile(profile, path)
    }

    pub fn import_profile(&mut self, path: &Path) -> Result<Profile> {
        let profile = storage::import_profile(path)?;
        self.storage.append_profile(profile.clone())?;
        self.profiles.push(profile.clone());
        tracing::info!(profile = %profile.profile_name, path = %path.display(), "Imported profile");
        Ok(profile)
    }

    // ========================
    // Bulk bodies
    // ========================

    pub fn set_bulk_bodies(&mut self, bodies: Vec<JsonObject>) {
        self.bulk_bodies = bodies;
        self.is_bulk_request = true;
    }

    /// Load bulk bodies from a CSV file, returning how many rows were kept
    pub fn import_bulk_csv(&mut self, path: &Path) -> Result<usize> {
        let bodies = csv_import::read_bulk_csv(path)?;
        let count = bodies.len();
        self.set_bulk_bodies(bodies);
        Ok(count)
    }

    // ========================
    // Execution
    // ========================

    /// Run the composed request. Blocks until the exchange is over.
    pub fn send_request(&mut self) -> &ResponseResult {
        let spec = self.current_spec();
        let result = self.executor.execute(spec.clone());

        self.storage.add_to_history(HistoryEntry {
            request: spec,
            status: result.display_status(),
            time_ms: result.time_ms,
            timestamp: chrono::Utc::now(),
        });

        self.show_response_headers = false;
        self.response.insert(result)
    }

    /// Start replaying the composer over `bulk_bodies` in the background
    pub fn start_bulk(&mut self) -> Result<u64> {
        let bodies = self.bulk_bodies.clone();
        let expected = bodies.len();
        let id = self.executor.submit_bulk(self.current_spec(), bodies)?;
        self.bulk = Some(BulkProgress::new(id, expected));
        tracing::info!(id, expected, "Bulk run submitted");
        Ok(id)
    }

    /// Drain pending network messages without blocking. Returns true if
    /// anything changed.
    pub fn poll_network(&mut self) -> bool {
        let mut changed = false;
        while let Ok(response) = self.net_rx.try_recv() {
            changed |= self.handle_response(response);
        }
        changed
    }

    /// Block until the current bulk run has one outcome per body
    pub fn wait_for_bulk(&mut self) -> Option<&BulkProgress> {
        while self.bulk.as_ref().is_some_and(|b| !b.is_complete()) {
            match self.net_rx.blocking_recv() {
                Some(response) => {
                    self.handle_response(response);
                }
                None => break,
            }
        }
        self.bulk.as_ref()
    }

    fn handle_response(&mut self, response: NetworkResponse) -> bool {
        match self.bulk.as_mut() {
            Some(progress) => progress.apply(&response),
            None => {
                tracing::debug!(id = response.id(), "Dropping response for unknown run");
                false
            }
        }
    }

    /// (succeeded, total) of the current bulk run
    pub fn bulk_summary(&self) -> Option<(usize, usize)> {
        self.bulk
            .as_ref()
            .map(|b| (b.success_count(), b.statuses().len()))
    }

    // ========================
    // History and display
    // ========================

    /// Load a past request back into the composer (0 = most recent)
    pub fn restore_history(&mut self, index: usize) -> bool {
        let Some(entry) = self.storage.get_history(index) else {
            return false;
        };
        let request = entry.request.clone();
        self.method = request.method;
        self.cache_policy = request.cache_policy;
        self.set_url(request.url);
        self.headers = request.headers;
        self.body = request.body;
        true
    }

    pub fn toggle_response_headers(&mut self) {
        self.show_response_headers = !self.show_response_headers;
    }
}
