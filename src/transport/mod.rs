//! # Cross-origin transport.
//!
//! This module implements the JSONP protocol used to talk to embed providers:
//! - [`registry`]: [`CallbackRegistry`], the table of one-shot response slots;
//! - [`jsonp`]: [`JsonpTransport`], one request per call, resolved by slot invocation
//!   or by the load-error signal;
//! - [`loader`]: the [`ScriptLoader`] host seam and the HTTP implementation;
//! - [`script`]: execution of a loaded resource (`name(payload);` statements);
//! - [`stub`]: [`StubProvider`], an in-memory provider.

pub mod jsonp;
pub mod loader;
pub mod registry;
pub mod script;
pub mod stub;

pub use jsonp::JsonpTransport;
#[cfg(feature = "http")]
pub use loader::HttpScriptLoader;
pub use loader::ScriptLoader;
pub use registry::{CallbackKey, CallbackRegistry, KeyCounter};
pub use stub::{StubProvider, StubReply};
