//! Keyed cache cells with durable write-through.
//!
//! Each key addresses one mutable cell, readable as a watch channel. A cell
//! is created on first access, seeded from a synchronous lookup in the
//! durable file, and shared by all readers of that key. Every `set` writes
//! through to disk before the in-memory publish, so a restart sees the last
//! value written.
//!
//! Concurrency convention: a key has a single designated writer at a time
//! (the view that owns that key's pipeline). Nothing here locks writers out;
//! the convention is what keeps readers from seeing interleaved values.

use crate::model::PeriodKey;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::warn;

/// A map of keyed cells backed by one JSON file.
pub struct ReactiveCache {
    cells: Mutex<HashMap<String, watch::Sender<Option<String>>>>,
    disk: DurableMap,
}

impl ReactiveCache {
    /// Opens the cache at `path`, loading whatever was persisted there. A
    /// missing file is an empty cache; an unreadable one is logged and
    /// treated as empty, since the cache is a fallback and never the source
    /// of truth.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
            disk: DurableMap::load(path.into()),
        }
    }

    /// The cell for `key`, created and seeded from durable storage if this
    /// is the first access. Repeated calls with an equal key observe the
    /// same cell.
    pub fn get(&self, key: &str) -> watch::Receiver<Option<String>> {
        let mut cells = self.lock();
        cells
            .entry(key.to_string())
            .or_insert_with(|| watch::channel(self.disk.get(key)).0)
            .subscribe()
    }

    /// Persists `value` durably, then updates the in-memory cell, notifying
    /// every current reader.
    pub fn set(&self, key: &str, value: impl Into<String>) {
        let value = value.into();
        // Write-through happens before the publish so no reader can observe
        // a value that did not reach disk.
        self.disk.set(key, &value);
        let mut cells = self.lock();
        match cells.get(key) {
            Some(cell) => {
                cell.send_replace(Some(value));
            }
            None => {
                cells.insert(key.to_string(), watch::channel(Some(value)).0);
            }
        }
    }

    /// The cache key holding the JSON-encoded report for one period.
    pub fn report_key(period: PeriodKey) -> String {
        format!("budget-{}-{}", period.month, period.year)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, watch::Sender<Option<String>>>> {
        self.cells.lock().expect("cache lock poisoned")
    }
}

/// The durable side: a flat string map serialized to one JSON file,
/// rewritten synchronously on every set.
struct DurableMap {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl DurableMap {
    fn load(path: PathBuf) -> Self {
        let values = read_map(&path).unwrap_or_default();
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().expect("cache disk lock poisoned").get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut values = self.values.lock().expect("cache disk lock poisoned");
        values.insert(key.to_string(), value.to_string());
        let json = serde_json::to_string_pretty(&*values).expect("string map serializes");
        if let Err(e) = std::fs::write(&self.path, json) {
            warn!("unable to persist cache to {}: {e}", self.path.display());
        }
    }
}

fn read_map(path: &Path) -> Option<HashMap<String, String>> {
    if !path.is_file() {
        return None;
    }
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("unable to read cache at {}: {e}", path.display());
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(map) => Some(map),
        Err(e) => {
            warn!("ignoring malformed cache at {}: {e}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cache_in(dir: &TempDir) -> ReactiveCache {
        ReactiveCache::open(dir.path().join("cache.json"))
    }

    #[test]
    fn test_get_before_set_is_empty() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        assert!(cache.get("budget-3-2025").borrow().is_none());
    }

    #[test]
    fn test_readers_observe_sets() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        let mut reader = cache.get("budget-3-2025");
        cache.set("budget-3-2025", "{}");
        assert!(reader.has_changed().unwrap());
        assert_eq!(reader.borrow_and_update().as_deref(), Some("{}"));
    }

    #[test]
    fn test_equal_keys_share_a_cell() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        let first = cache.get("k");
        let second = cache.get("k");
        assert!(first.same_channel(&second));
    }

    #[test]
    fn test_set_before_get_seeds_cell() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        cache.set("k", "v");
        assert_eq!(cache.get("k").borrow().as_deref(), Some("v"));
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let cache = cache_in(&dir);
            cache.set("budget-3-2025", r#"{"entries":[]}"#);
        }
        let reopened = cache_in(&dir);
        assert_eq!(
            reopened.get("budget-3-2025").borrow().as_deref(),
            Some(r#"{"entries":[]}"#)
        );
    }

    #[test]
    fn test_report_key_format() {
        assert_eq!(
            ReactiveCache::report_key(PeriodKey::new(3, 2025)),
            "budget-3-2025"
        );
    }
}
