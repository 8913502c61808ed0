use crate::config::Config;
use crate::constants::{MAX_HISTORY, PRESETS_KEY, PROFILES_KEY, PROFILE_FILE_EXTENSION};
use crate::models::{HistoryEntry, Preset, Profile};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

/// Named slots holding opaque blobs, like a settings store
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<Vec<u8>>;
    fn set(&mut self, key: &str, value: &[u8]) -> Result<()>;
}

/// One `<key>.json` file per slot inside a directory
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStore { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Ensure config directory exists
    fn ensure_dir(&self) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)
                .with_context(|| format!("creating {}", self.dir.display()))?;
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        fs::read(self.path_for(key)).ok()
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.ensure_dir()?;
        let path = self.path_for(key);
        fs::write(&path, value).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

/// Volatile store, used by tests and dry runs
#[derive(Default)]
pub struct MemoryStore {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

/// Saved presets and profiles plus the in-memory request history.
///
/// Each collection is one JSON array under a single key. Appends are
/// read-modify-write on the whole blob with no locking: two writers
/// appending to the same key concurrently can lose one of the records.
/// Callers must serialize writes per key.
pub struct Storage<S: KeyValueStore = FileStore> {
    pub history: VecDeque<HistoryEntry>,
    store: S,
}

impl Storage<FileStore> {
    pub fn open(config: &Config) -> Self {
        Storage::with_store(FileStore::new(&config.data_dir))
    }
}

impl<S: KeyValueStore> Storage<S> {
    pub fn with_store(store: S) -> Self {
        Storage {
            history: VecDeque::with_capacity(MAX_HISTORY),
            store,
        }
    }

    /// Saved presets; empty when nothing is stored or the blob is unreadable
    pub fn load_presets(&self) -> Vec<Preset> {
        self.load_list(PRESETS_KEY)
    }

    /// Saved profiles; empty when nothing is stored or the blob is unreadable
    pub fn load_profiles(&self) -> Vec<Profile> {
        self.load_list(PROFILES_KEY)
    }

    pub fn append_preset(&mut self, preset: Preset) -> Result<()> {
        self.append_to_list(PRESETS_KEY, preset)
    }

    pub fn append_profile(&mut self, profile: Profile) -> Result<()> {
        self.append_to_list(PROFILES_KEY, profile)
    }

    fn load_list<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        let Some(raw) = self.store.get(key) else {
            return Vec::new();
        };
        match serde_json::from_slice(&raw) {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(key, error = %e, "Stored list is unreadable, treating as empty");
                Vec::new()
            }
        }
    }

    fn append_to_list<T: Serialize + DeserializeOwned>(&mut self, key: &str, item: T) -> Result<()> {
        let mut items: Vec<T> = self.load_list(key);
        items.push(item);
        let encoded = serde_json::to_vec(&items).with_context(|| format!("encoding {}", key))?;
        // Non-finite floats encode as `null`, which would make the whole list unreadable
        serde_json::from_slice::<Vec<T>>(&encoded)
            .with_context(|| format!("{} record would not read back, nothing saved", key))?;
        self.store.set(key, &encoded)?;
        tracing::debug!(key, count = items.len(), "Appended record");
        Ok(())
    }

    /// Add entry to history
    pub fn add_to_history(&mut self, entry: HistoryEntry) {
        if self.history.len() >= MAX_HISTORY {
            self.history.pop_back();
        }
        self.history.push_front(entry);
    }

    /// Get history item by index (0 = most recent)
    pub fn get_history(&self, index: usize) -> Option<&HistoryEntry> {
        self.history.get(index)
    }

    /// History length
    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

/// Write one profile as a standalone `.patchman` file. The extension is
/// forced; the path actually written is returned.
pub fn export_profile(profile: &Profile, path: &Path) -> Result<PathBuf> {
    let path = path.with_extension(PROFILE_FILE_EXTENSION);
    let content = serde_json::to_vec_pretty(profile)?;
    fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

/// Read a single profile record (not an array) from an exported file
pub fn import_profile(path: &Path) -> Result<Profile> {
    let content = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let profile = serde_json::from_slice(&content)
        .with_context(|| format!("{} is not a profile file", path.display()))?;
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_value::{JsonObject, JsonValue};
    use crate::models::{PresetType, RequestMethod};
    use std::collections::BTreeMap;

    fn sample_profile(name: &str) -> Profile {
        let mut body = JsonObject::new();
        body.insert(
            "outer".into(),
            JsonValue::object_from_json_text(r#"{"mid":{"inner":[1,"two",3.5]}}"#)
                .map(JsonValue::Object)
                .unwrap(),
        );
        Profile {
            profile_name: name.into(),
            method: RequestMethod::POST,
            url: "https://api.example.com/users".into(),
            headers: BTreeMap::from([("Accept".to_string(), "application/json".to_string())]),
            request_body: body.clone(),
            is_headers_enabled: true,
            is_bulk_request: false,
            bulk_request_body: vec![body],
        }
    }

    #[test]
    fn test_empty_store_loads_nothing() {
        let storage = Storage::with_store(MemoryStore::new());
        assert!(storage.load_presets().is_empty());
        assert!(storage.load_profiles().is_empty());
    }

    #[test]
    fn test_append_then_reload() {
        let mut storage = Storage::with_store(MemoryStore::new());
        let first = Preset::new(PresetType::HeaderField, "auth", "Authorization", "Bearer x");
        let second = Preset::new(PresetType::BodyField, "user", "name", "ada");
        storage.append_preset(first.clone()).unwrap();
        storage.append_preset(second.clone()).unwrap();
        assert_eq!(storage.load_presets(), vec![first, second]);

        storage.append_profile(sample_profile("one")).unwrap();
        assert_eq!(storage.load_profiles(), vec![sample_profile("one")]);
    }

    #[test]
    fn test_corrupt_blob_is_treated_as_empty() {
        let mut store = MemoryStore::new();
        store.set(PRESETS_KEY, b"{not json").unwrap();
        store.set(PROFILES_KEY, br#"{"profileName":"single"}"#).unwrap();
        let mut storage = Storage::with_store(store);
        assert!(storage.load_presets().is_empty());
        assert!(storage.load_profiles().is_empty());

        let preset = Preset::new(PresetType::BodyField, "p", "k", "v");
        storage.append_preset(preset.clone()).unwrap();
        assert_eq!(storage.load_presets(), vec![preset]);
    }

    #[test]
    fn test_unreadable_record_is_rejected_and_list_kept() {
        let mut storage = Storage::with_store(MemoryStore::new());
        storage.append_profile(sample_profile("keep")).unwrap();

        for bad in [f64::NAN, f64::INFINITY] {
            let mut profile = sample_profile("broken");
            profile.request_body = JsonObject::from([("x".to_string(), JsonValue::from(bad))]);
            assert!(storage.append_profile(profile).is_err());
        }

        assert_eq!(storage.load_profiles(), vec![sample_profile("keep")]);
        storage.append_profile(sample_profile("after")).unwrap();
        assert_eq!(storage.load_profiles().len(), 2);
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = Config::with_data_dir(temp_dir.path().join("nested"));

        let mut storage = Storage::open(&config);
        storage.append_profile(sample_profile("saved")).unwrap();
        assert!(temp_dir.path().join("nested/profiles.json").exists());

        let reopened = Storage::open(&config);
        assert_eq!(reopened.load_profiles(), vec![sample_profile("saved")]);
        assert!(reopened.load_presets().is_empty());
    }

    #[test]
    fn test_export_forces_extension_and_imports_back() {
        let temp_dir = tempfile::tempdir().unwrap();
        let written = export_profile(&sample_profile("shared"), &temp_dir.path().join("shared.json")).unwrap();
        assert_eq!(written.extension().unwrap(), "patchman");

        let imported = import_profile(&written).unwrap();
        assert_eq!(imported, sample_profile("shared"));
    }

    #[test]
    fn test_import_rejects_array_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("many.patchman");
        fs::write(&path, serde_json::to_vec(&vec![sample_profile("a")]).unwrap()).unwrap();
        assert!(import_profile(&path).is_err());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut storage = Storage::with_store(MemoryStore::new());
        for i in 0..(MAX_HISTORY + 5) {
            storage.add_to_history(HistoryEntry {
                request: crate::models::RequestSpec::new(format!("http://h/{}", i), RequestMethod::GET),
                status: 200,
                time_ms: 1,
                timestamp: chrono::Utc::now(),
            });
        }
        assert_eq!(storage.history_len(), MAX_HISTORY);
        assert_eq!(
            storage.get_history(0).unwrap().request.url,
            format!("http://h/{}", MAX_HISTORY + 4)
        );
    }
}
