use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;

use super::content::{ContentSink, ContentSlot};
use super::embedder::{Embedder, EmbedderParts};
use super::hooks::{Hooks, ResponseHook, SendHook, ValidateHook};
use crate::aggregator::{Notifier, TracingNotifier};
use crate::config::Config;
use crate::events::Bus;
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::transport::{CallbackRegistry, JsonpTransport, KeyCounter, ScriptLoader};

/// Builder for constructing an [`Embedder`] with optional parts.
pub struct EmbedderBuilder {
    cfg: Config,
    loader: Option<Arc<dyn ScriptLoader>>,
    notifier: Option<Arc<dyn Notifier>>,
    content: Option<Arc<dyn ContentSink>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    hooks: Hooks,
    keys: Option<Arc<KeyCounter>>,
}

impl EmbedderBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            loader: None,
            notifier: None,
            content: None,
            subscribers: Vec::new(),
            hooks: Hooks::default(),
            keys: None,
        }
    }

    /// Sets how provider resources are fetched.
    ///
    /// Defaults to `HttpScriptLoader` with the configured default scheme. Without
    /// the `http` feature the default is an empty [`StubProvider`](crate::StubProvider),
    /// so every request fails.
    pub fn with_loader(mut self, loader: Arc<dyn ScriptLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Sets where progress and warnings are shown. Defaults to [`TracingNotifier`].
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Sets the consumer of rendered markup. Defaults to a fresh [`ContentSlot`].
    pub fn with_content_sink(mut self, content: Arc<dyn ContentSink>) -> Self {
        self.content = Some(content);
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive embed events (cache hits, transport failures, task
    /// bookkeeping, etc.) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Installs a hook that may adjust the provider request of every fresh load.
    pub fn with_send_hook(mut self, hook: Arc<dyn SendHook>) -> Self {
        self.hooks.send = Some(hook);
        self
    }

    /// Installs a hook that may veto URLs accepted by the baseline pattern.
    pub fn with_validate_hook(mut self, hook: Arc<dyn ValidateHook>) -> Self {
        self.hooks.validate = Some(hook);
        self
    }

    /// Installs a hook that may replace or suppress the rendered markup.
    pub fn with_response_hook(mut self, hook: Arc<dyn ResponseHook>) -> Self {
        self.hooks.response = Some(hook);
        self
    }

    /// Shares a key counter with other embedders, so their registry keys never collide.
    pub fn with_key_counter(mut self, keys: Arc<KeyCounter>) -> Self {
        self.keys = Some(keys);
        self
    }

    /// Builds and returns the Embedder instance.
    ///
    /// This consumes the builder and initializes all runtime components:
    /// - Event bus for broadcasting
    /// - Callback registry and JSONP transport
    /// - Subscriber workers and the listener feeding them
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Arc<Embedder> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        if !subs.is_empty() {
            subscriber_listener(&bus, Arc::clone(&subs));
        }

        let loader = self.loader.unwrap_or_else(|| default_loader(&self.cfg));
        let registry = Arc::new(CallbackRegistry::new(self.keys.unwrap_or_default()));
        let transport = JsonpTransport::new(loader, registry, bus.clone());

        Arc::new(Embedder::new_internal(EmbedderParts {
            cfg: self.cfg,
            transport,
            notifier: self
                .notifier
                .unwrap_or_else(|| Arc::new(TracingNotifier::new())),
            content: self.content.unwrap_or_else(|| Arc::new(ContentSlot::new())),
            hooks: self.hooks,
            bus,
            subs,
        }))
    }
}

/// Subscribes to the bus and forwards events to the subscriber set (fire-and-forget).
fn subscriber_listener(bus: &Bus, set: Arc<SubscriberSet>) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => set.emit(&ev),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event listener lagged behind the bus");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

#[cfg(feature = "http")]
fn default_loader(cfg: &Config) -> Arc<dyn ScriptLoader> {
    Arc::new(
        crate::transport::HttpScriptLoader::new().with_default_scheme(cfg.default_scheme.as_str()),
    )
}

#[cfg(not(feature = "http"))]
fn default_loader(_cfg: &Config) -> Arc<dyn ScriptLoader> {
    Arc::new(crate::transport::StubProvider::new())
}
