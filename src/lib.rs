//! # embedvisor
//!
//! **Embedvisor** turns a URL into embeddable markup by asking an oEmbed-style
//! provider about it over a JSONP transport.
//!
//! It provides the pieces a host (an editor, a previewer, a bot) needs to
//! embed remote content: a callback registry and cross-origin transport, a
//! per-instance response cache, one progress notification shared by all
//! concurrent loads, and a renderer turning provider payloads into HTML.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   host ── is_url_valid(url) ──► Embedder ◄── hooks (send / validate / response)
//!        ── load_content(url) ──►    │
//!                                    ├──► ResponseCache          (url → payload)
//!                                    ├──► Aggregator ──► Notifier (progress, warnings)
//!                                    ├──► JsonpTransport
//!                                    │      ├─ CallbackRegistry  (embedCallbacks[key])
//!                                    │      └─ ScriptLoader      (HTTP or StubProvider)
//!                                    └──► render ──► ContentSink::set_content(url, html)
//!
//!   Embedder / JsonpTransport / Aggregator ── publish(Event) ──► Bus
//!                                                                 │
//!                                                      subscriber_listener
//!                                                                 ▼
//!                                                           SubscriberSet
//!                                                       ┌─────────┼─────────┐
//!                                                       ▼         ▼         ▼
//!                                                   LogWriter   custom    custom
//! ```
//!
//! ### Lifecycle of one load
//! ```text
//! load_content(url)
//!   ├─ cached  ─► next tick ─► deliver
//!   └─ fresh   ─► task + request ─► provider script runs embedCallbacks[key](payload)
//!                                     ├─ payload    ─► next tick ─► cache, task.done, deliver
//!                                     └─ load error ─► task.cancel, warning, error callback
//!
//! deliver = response hook ─► render ─► set_content ─► success callback
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                          |
//! |-------------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Orchestration** | Cache check, request, delivery, failure handling.            | [`Embedder`], [`LoadOptions`], [`Loaded`]   |
//! | **Transport**     | JSONP requests resolved through one-shot registry slots.     | [`JsonpTransport`], [`CallbackRegistry`]    |
//! | **Hooks**         | Adjust requests, veto URLs, override markup.                 | [`SendHook`], [`ValidateHook`], [`ResponseHook`] |
//! | **Progress**      | One notification for all concurrent loads.                   | [`Aggregator`], [`Notifier`]                |
//! | **Rendering**     | Provider payload to HTML fragment.                           | [`ProviderResponse`], [`render()`]          |
//! | **Subscriber API**| Observe every state transition.                              | [`Subscribe`], [`Event`]                    |
//! | **Errors**        | Typed errors for transport and load failures.                | [`TransportError`], [`LoadError`]           |
//! | **Configuration** | Provider endpoint, messages, bus capacity.                   | [`Config`], [`Messages`]                    |
//!
//! ## Optional features
//! - `http` _(default)_: [`HttpScriptLoader`], fetching provider scripts with `reqwest`.
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use embedvisor::{Config, Embedder, LoadOptions, StubProvider, StubReply};
//! use serde_json::json;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Build subscribers (optional)
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn embedvisor::Subscribe>> = {
//!         use embedvisor::LogWriter;
//!         vec![Arc::new(LogWriter::default())]
//!     };
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn embedvisor::Subscribe>> = Vec::new();
//!
//!     let provider = StubProvider::new().with_reply(
//!         "https://example.com/cat.jpg",
//!         StubReply::Payload(json!({"type": "photo", "url": "https://example.com/cat.jpg", "title": "Cat"})),
//!     );
//!
//!     let embedder = Embedder::builder(Config::default())
//!         .with_loader(Arc::new(provider))
//!         .with_subscribers(subs)
//!         .build();
//!
//!     // Callback style
//!     embedder.load_content(
//!         "https://example.com/cat.jpg",
//!         LoadOptions::new().on_success(|loaded| println!("{}", loaded.html)),
//!     );
//!
//!     // Future style
//!     let loaded = embedder.load("https://example.com/cat.jpg", false).await?;
//!     assert!(loaded.html.starts_with("<img src=\"https://example.com/cat.jpg\""));
//!     Ok(())
//! }
//! ```
mod aggregator;
mod cache;
mod config;
mod core;
mod error;
mod events;
mod render;
mod subscribers;
mod template;
mod transport;

// ---- Public re-exports ----

pub use aggregator::{
    Aggregator, NotificationId, NotificationKind, Notifier, TaskHandle, TracingNotifier,
};
pub use cache::ResponseCache;
pub use config::{Config, DEFAULT_PROVIDER_URL, Messages};
pub use self::core::{
    Content, ContentSink, ContentSlot, Embedder, EmbedderBuilder, HookOutcome, Hooks, LoadOptions,
    Loaded, OutgoingRequest, ResponseContext, ResponseHook, SendHook, ValidateHook,
    matches_url_pattern,
};
pub use error::{LoadError, TransportError};
pub use events::{Bus, Event, EventKind};
pub use render::{ProviderResponse, encode_attr, encode_text, render, render_value};
pub use subscribers::{Subscribe, SubscriberSet};
pub use template::{Params, Template};
pub use transport::script::{Invocation, parse_invocations};
pub use transport::{
    CallbackKey, CallbackRegistry, JsonpTransport, KeyCounter, ScriptLoader, StubProvider,
    StubReply,
};

// Optional: HTTP(S) script loader backed by reqwest.
// Enabled by default; disable with `--no-default-features`.
#[cfg(feature = "http")]
pub use transport::HttpScriptLoader;

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
