//! Last viewport location, kept in a key/value store between sessions.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Storage key the location is written under.
pub const LOCATION_STORAGE_KEY: &str = "dz-viewer/location";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportLocation {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
    pub rotation: f64,
    pub persistence_id: String,
}

/// String key/value storage, like a browser's local storage.
pub trait LocationStore {
    fn load(&self, key: &str) -> Option<String>;
    fn save(&mut self, key: &str, value: String);
}

#[derive(Debug, Clone, Default)]
pub struct MemoryLocationStore {
    entries: FxHashMap<String, String>,
}

impl MemoryLocationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocationStore for MemoryLocationStore {
    fn load(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn save(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }
}

pub fn save_location(
    store: &mut dyn LocationStore,
    location: &ViewportLocation,
) -> Result<(), serde_json::Error> {
    let json = serde_json::to_string(location)?;
    store.save(LOCATION_STORAGE_KEY, json);
    Ok(())
}

/// Stored location, if it was written for `persistence_id`.
#[must_use]
pub fn load_location(store: &dyn LocationStore, persistence_id: &str) -> Option<ViewportLocation> {
    let raw = store.load(LOCATION_STORAGE_KEY)?;
    let location: ViewportLocation = match serde_json::from_str(&raw) {
        Ok(location) => location,
        Err(err) => {
            warn!("Ignoring unreadable stored viewport location: {err}");
            return None;
        }
    };
    if location.persistence_id != persistence_id {
        debug!(
            "Stored viewport location belongs to {}, not {persistence_id}",
            location.persistence_id
        );
        return None;
    }
    Some(location)
}
