//! # In-memory provider.
//!
//! [`StubProvider`] plays the provider side of the JSONP protocol without any
//! network: it reads the `url` and `callback` parameters of the request and
//! answers with a script invoking that callback, or with a load failure.
//! Useful for host tests and offline demos.
//!
//! ## Example
//! ```rust
//! use embedvisor::{StubProvider, StubReply};
//! use serde_json::json;
//!
//! let provider = StubProvider::new()
//!     .with_reply("https://a.com/i.jpg", StubReply::Payload(json!({
//!         "type": "photo", "url": "https://a.com/i.jpg", "title": "Cat"
//!     })))
//!     .with_reply("https://down.example", StubReply::Fail("connection refused".into()));
//! assert_eq!(provider.load_count(), 0);
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use super::loader::{ScriptLoader, absolutize};
use crate::error::TransportError;

/// How the stub answers a request for one target URL.
#[derive(Clone, Debug)]
pub enum StubReply {
    /// Invoke the callback once with this payload.
    Payload(Value),
    /// Invoke the callback twice with this payload (a script executed twice).
    Twice(Value),
    /// Load fine but never invoke the callback.
    Silent,
    /// Answer with this exact script text.
    Raw(String),
    /// Fail to load with this reason.
    Fail(String),
    /// Fail to load with this HTTP status.
    Status(u16),
}

/// In-memory [`ScriptLoader`] keyed by target URL.
///
/// Targets without a configured reply fail with a 404 status.
#[derive(Debug, Default)]
pub struct StubProvider {
    replies: Mutex<HashMap<String, StubReply>>,
    loads: Mutex<Vec<String>>,
}

impl StubProvider {
    /// Creates a provider without replies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a reply for `target` (builder style).
    pub fn with_reply(self, target: impl Into<String>, reply: StubReply) -> Self {
        self.set_reply(target, reply);
        self
    }

    /// Adds or replaces the reply for `target`.
    pub fn set_reply(&self, target: impl Into<String>, reply: StubReply) {
        lock(&self.replies).insert(target.into(), reply);
    }

    /// Request URLs loaded so far, in order.
    pub fn loads(&self) -> Vec<String> {
        lock(&self.loads).clone()
    }

    /// Number of loads so far.
    pub fn load_count(&self) -> usize {
        lock(&self.loads).len()
    }
}

#[async_trait]
impl ScriptLoader for StubProvider {
    async fn load(&self, src: &str) -> Result<String, TransportError> {
        lock(&self.loads).push(src.to_string());

        let url = absolutize(src, "https")?;
        let mut target = None;
        let mut callback = None;
        for (name, value) in url.query_pairs() {
            match name.as_ref() {
                "url" => target = Some(value.into_owned()),
                "callback" => callback = Some(value.into_owned()),
                _ => {}
            }
        }
        let target = target.unwrap_or_default();
        let callback = callback.unwrap_or_default();

        let reply = lock(&self.replies)
            .get(&target)
            .cloned()
            .unwrap_or(StubReply::Status(404));

        match reply {
            StubReply::Payload(payload) => Ok(format!("/**/ {callback}({payload});")),
            StubReply::Twice(payload) => {
                Ok(format!("{callback}({payload});\n{callback}({payload});"))
            }
            StubReply::Silent => Ok("/* provider had nothing to say */".to_string()),
            StubReply::Raw(body) => Ok(body),
            StubReply::Fail(reason) => Err(TransportError::Load {
                src: src.to_string(),
                reason,
            }),
            StubReply::Status(status) => Err(TransportError::Status {
                src: src.to_string(),
                status,
            }),
        }
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
