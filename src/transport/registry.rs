//! # Callback registry: one-shot response slots addressed by key.
//!
//! Every outstanding JSONP request owns exactly one slot. The provider resource
//! refers to its slot by name (`embedCallbacks[<key>]`) and "invokes" it with the
//! response payload.
//!
//! ## Rules
//! - Keys come from a [`KeyCounter`] that only ever increases; a key is never
//!   reused, even after release, so a late response can never hit a newer slot.
//! - A slot is removed exactly once: by [`CallbackRegistry::resolve`] (invoking
//!   the handler) or by [`CallbackRegistry::release`] (dropping it).
//! - `resolve`/`release` on an unknown key is a no-op returning `false`.
//! - Handlers run **outside** the internal lock; a handler may touch the registry.
//!
//! ## Example
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use embedvisor::CallbackRegistry;
//!
//! let registry = CallbackRegistry::default();
//! let got = Arc::new(Mutex::new(None));
//! let sink = got.clone();
//! let key = registry.allocate(move |payload| *sink.lock().unwrap() = Some(payload));
//!
//! assert!(registry.resolve(key, serde_json::json!({"type": "rich", "html": "<b>x</b>"})));
//! assert!(!registry.resolve(key, serde_json::json!(null)));
//! assert!(got.lock().unwrap().is_some());
//! assert!(registry.is_empty());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

/// Namespace of slot names as they appear in request URLs and provider scripts.
pub const SLOT_NAMESPACE: &str = "embedCallbacks";

/// One-shot response handler stored in a slot.
pub type Handler = Box<dyn FnOnce(Value) + Send + 'static>;

/// Identifier of a registry slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackKey(u64);

impl CallbackKey {
    /// Raw numeric key.
    pub fn get(self) -> u64 {
        self.0
    }

    /// Name by which a provider script addresses this slot.
    pub fn slot_name(self) -> String {
        format!("{SLOT_NAMESPACE}[{}]", self.0)
    }

    /// Parses a slot name produced by [`CallbackKey::slot_name`].
    pub fn from_slot_name(name: &str) -> Option<Self> {
        name.trim()
            .strip_prefix(SLOT_NAMESPACE)?
            .strip_prefix('[')?
            .strip_suffix(']')?
            .trim()
            .parse()
            .ok()
            .map(CallbackKey)
    }
}

impl fmt::Display for CallbackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Strictly increasing key source.
///
/// Share one counter (`Arc<KeyCounter>`) between registries that must never
/// issue the same key, e.g. several embedders answering through one provider.
#[derive(Debug)]
pub struct KeyCounter {
    next: AtomicU64,
}

impl KeyCounter {
    /// Creates a counter whose first key is 1.
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Creates a counter whose first key is `first`.
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Issues the next key.
    pub fn next_key(&self) -> CallbackKey {
        CallbackKey(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for KeyCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Table of outstanding one-shot handlers.
pub struct CallbackRegistry {
    counter: Arc<KeyCounter>,
    slots: Mutex<HashMap<CallbackKey, Handler>>,
}

impl CallbackRegistry {
    /// Creates an empty registry drawing keys from `counter`.
    pub fn new(counter: Arc<KeyCounter>) -> Self {
        Self {
            counter,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Stores `handler` under a fresh key.
    pub fn allocate<F>(&self, handler: F) -> CallbackKey
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.allocate_with(|_| handler)
    }

    /// Stores the handler built by `make` under a fresh key; `make` receives that key.
    ///
    /// Lets a handler refer to its own slot (e.g. to clean up artifacts tagged with it).
    pub fn allocate_with<M, F>(&self, make: M) -> CallbackKey
    where
        M: FnOnce(CallbackKey) -> F,
        F: FnOnce(Value) + Send + 'static,
    {
        let key = self.counter.next_key();
        let handler: Handler = Box::new(make(key));
        self.slots().insert(key, handler);
        key
    }

    /// Removes the slot and invokes its handler with `payload`.
    ///
    /// Returns `false` (and does nothing) when the key is unknown or already settled.
    pub fn resolve(&self, key: CallbackKey, payload: Value) -> bool {
        let handler = self.slots().remove(&key);
        match handler {
            Some(handler) => {
                handler(payload);
                true
            }
            None => false,
        }
    }

    /// Resolves the slot addressed by `name` (see [`CallbackKey::slot_name`]).
    pub fn resolve_slot(&self, name: &str, payload: Value) -> bool {
        CallbackKey::from_slot_name(name).is_some_and(|key| self.resolve(key, payload))
    }

    /// Removes the slot without invoking it. Returns `false` when it was already gone.
    pub fn release(&self, key: CallbackKey) -> bool {
        self.slots().remove(&key).is_some()
    }

    /// True if `key` is still outstanding.
    pub fn contains(&self, key: CallbackKey) -> bool {
        self.slots().contains_key(&key)
    }

    /// Number of outstanding slots.
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    /// True if no slot is outstanding.
    pub fn is_empty(&self) -> bool {
        self.slots().is_empty()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<CallbackKey, Handler>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new(Arc::new(KeyCounter::new()))
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<CallbackKey> = self.slots().keys().copied().collect();
        keys.sort_unstable();
        f.debug_struct("CallbackRegistry")
            .field("outstanding", &keys)
            .finish()
    }
}
