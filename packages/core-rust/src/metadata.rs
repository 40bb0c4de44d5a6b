//! Per-request mutable key/value metadata.
//!
//! # Synchronisation
//!
//! A chain executes one step at a time, so within one request there is
//! never more than one concurrent writer. The store is still guarded by a
//! `parking_lot::Mutex`: tokio's multi-threaded runtime may resume a
//! chain on a different worker thread, and code may hand the context to
//! spawned tasks that genuinely run in parallel. Every operation takes the
//! lock for its own duration only; no lock is held across an `.await`.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Metadata owned by exactly one [`crate::RequestContext`].
#[derive(Debug, Default)]
pub struct MetadataStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MetadataStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites `key`.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.lock().insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().get(key).cloned()
    }

    /// Typed view of the value under `key`.
    ///
    /// The store does not track types: `None` means the key is absent or
    /// the stored value does not deserialize as `T`.
    #[must_use]
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| serde_json::from_value(v).ok())
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Removes `key`; returns whether an entry existed.
    pub fn remove(&self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Owned copy of all entries at call time.
    #[must_use]
    pub fn snapshot(&self) -> Map<String, Value> {
        self.entries
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
