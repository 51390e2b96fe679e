//! # Response cache.
//!
//! Maps a target URL (exact string, no normalization) to the provider payload
//! received for it. No expiry, no size bound; the cache lives as long as the
//! embedder owning it.
//!
//! Entries are stored as `Arc<Value>`: a written entry is never mutated, only
//! replaced by a newer write for the same key.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

/// Per-embedder URL → payload map.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: Mutex<HashMap<String, Arc<Value>>>,
}

impl ResponseCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the payload cached for `url`, if any.
    pub fn get(&self, url: &str) -> Option<Arc<Value>> {
        self.entries().get(url).cloned()
    }

    /// Stores (or replaces) the payload for `url`.
    pub fn put(&self, url: impl Into<String>, response: Arc<Value>) {
        self.entries().insert(url.into(), response);
    }

    /// Number of cached URLs.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// True if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Arc<Value>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
