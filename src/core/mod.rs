//! Embedding core: load orchestration and its host-facing seams.
//!
//! The only entry point from this module is [`Embedder`], built via
//! [`EmbedderBuilder`]. The rest are the types a host plugs into it.
//!
//! Internal modules:
//! - [`embedder`]: the per-URL load state machine (cache, transport, aggregator);
//! - [`builder`]: wires bus, subscribers, registry and transport together;
//! - [`hooks`]: typed pre-send, validation and response hooks;
//! - [`content`]: the consumer interface receiving rendered markup;
//! - [`request`]: per-load options and results;
//! - [`validate`]: the baseline URL pattern.

mod builder;
mod content;
mod embedder;
mod hooks;
mod request;
mod validate;

pub use builder::EmbedderBuilder;
pub use content::{Content, ContentSink, ContentSlot};
pub use embedder::Embedder;
pub use hooks::{
    HookOutcome, Hooks, OutgoingRequest, ResponseContext, ResponseHook, SendHook, ValidateHook,
};
pub use request::{LoadOptions, Loaded};
pub use validate::matches_url_pattern;
