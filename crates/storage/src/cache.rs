//! Device-local key-value cache holding string-serialized progress values.
//!
//! Reads never touch the network. Adapters are synchronous so the progress
//! store can update the cache and notify observers before any remote work
//! starts.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::repository::StorageError;

/// Stable cache keys shared by every adapter.
pub mod keys {
    use sensei_core::model::TopicId;

    /// Cumulative points as a decimal integer string.
    pub const POINTS: &str = "points";
    /// JSON object mapping topic id to an array of scores in `[0, 1]`.
    pub const MASTERY: &str = "mastery";
    /// `"true"` while demo mode is enabled.
    pub const DEMO: &str = "demo";
    /// JSON object mapping topic id to a displayed mastery fraction.
    pub const DEMO_MASTERY: &str = "demo_mastery";

    /// JSON array of user-authored flashcards for `topic`.
    #[must_use]
    pub fn custom_cards(topic: &TopicId) -> String {
        format!("custom_cards_{topic}")
    }

    /// Index of the last flashcard viewed for `topic`.
    #[must_use]
    pub fn flashcard_index(topic: &TopicId) -> String {
        format!("flash_{topic}_index")
    }
}

/// Synchronous key-value store scoped to the device.
pub trait LocalCache: Send + Sync {
    /// Read a value; `Ok(None)` when the key is absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert or replace a value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be persisted.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value; removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be updated.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

/// Process-local cache for tests and ephemeral sessions.
#[derive(Clone, Default)]
pub struct InMemoryCache {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LocalCache for InMemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }
}

//
// ─── JSON FILE ─────────────────────────────────────────────────────────────────
//

/// Durable cache persisted as a single JSON object on disk.
///
/// The whole map is rewritten on every mutation. A missing, unreadable, or
/// malformed file opens as an empty cache.
pub struct JsonFileCache {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileCache {
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load_entries(&path);
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| StorageError::Connection(e.to_string()))?;
            }
        }
        let raw = serde_json::to_string_pretty(entries)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        fs::write(&self.path, raw).map_err(|e| StorageError::Connection(e.to_string()))
    }

    fn mutate(
        &self,
        apply: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        apply(&mut guard);
        self.persist(&guard)
    }
}

fn load_entries(path: &Path) -> BTreeMap<String, String> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "local cache unreadable, starting empty");
            return BTreeMap::new();
        }
    };
    serde_json::from_str(&raw).unwrap_or_else(|err| {
        warn!(path = %path.display(), error = %err, "local cache malformed, starting empty");
        BTreeMap::new()
    })
}

impl LocalCache for JsonFileCache {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.mutate(|entries| {
            entries.insert(key.to_owned(), value.to_owned());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.mutate(|entries| {
            entries.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensei_core::model::TopicId;

    #[test]
    fn in_memory_round_trip() {
        let cache = InMemoryCache::new();
        assert_eq!(cache.get(keys::POINTS).unwrap(), None);

        cache.set(keys::POINTS, "15").unwrap();
        assert_eq!(cache.get(keys::POINTS).unwrap().as_deref(), Some("15"));

        cache.remove(keys::POINTS).unwrap();
        cache.remove(keys::POINTS).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn in_memory_clones_share_entries() {
        let cache = InMemoryCache::new();
        let other = cache.clone();
        cache.set("a", "1").unwrap();
        assert_eq!(other.get("a").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn file_cache_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");

        let cache = JsonFileCache::open(&path);
        cache.set(keys::POINTS, "42").unwrap();
        cache.set(keys::DEMO, "true").unwrap();
        cache.remove(keys::DEMO).unwrap();

        let reopened = JsonFileCache::open(&path);
        assert_eq!(reopened.get(keys::POINTS).unwrap().as_deref(), Some("42"));
        assert_eq!(reopened.get(keys::DEMO).unwrap(), None);
    }

    #[test]
    fn malformed_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "{ definitely not json").unwrap();

        let cache = JsonFileCache::open(&path);
        assert_eq!(cache.get(keys::POINTS).unwrap(), None);

        cache.set(keys::POINTS, "3").unwrap();
        let reopened = JsonFileCache::open(&path);
        assert_eq!(reopened.get(keys::POINTS).unwrap().as_deref(), Some("3"));
    }

    #[test]
    fn per_topic_keys() {
        let topic = TopicId::new("functions");
        assert_eq!(keys::custom_cards(&topic), "custom_cards_functions");
        assert_eq!(keys::flashcard_index(&topic), "flash_functions_index");
    }
}
