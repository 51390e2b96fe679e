//! # Extension hooks.
//!
//! Three typed seams let a host adjust the load pipeline. Each one is optional;
//! when absent the embedder behaves as if the hook approved everything.
//!
//! | hook             | called                              | may                                              |
//! |------------------|-------------------------------------|--------------------------------------------------|
//! | [`SendHook`]     | before the provider request is sent | rewrite the target URL, add provider parameters  |
//! | [`ValidateHook`] | from `is_url_valid`                 | veto a URL (`false`)                             |
//! | [`ResponseHook`] | after a response arrived            | supply markup, suppress `set_content`            |
//!
//! Plain closures implement the hooks:
//! ```rust
//! use embedvisor::{HookOutcome, ResponseContext, ValidateHook};
//!
//! let only_https = |url: &str| url.starts_with("https://");
//! assert!(!only_https.validate("http://a.com"));
//!
//! let _hide_links = |ctx: &mut ResponseContext<'_>| {
//!     if ctx.response["type"] == "link" { HookOutcome::Suppress } else { HookOutcome::Continue }
//! };
//! ```

use std::sync::Arc;

use serde_json::Value;

use crate::template::Params;

/// Provider request about to be sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingRequest {
    url: String,
    extra: Params,
}

impl OutgoingRequest {
    /// Creates a request for `url` without extra parameters.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            extra: Params::new(),
        }
    }

    /// Target URL passed to the provider as `url`.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Replaces the target URL sent to the provider.
    ///
    /// Caching and `set_content` keep using the URL the load was started with.
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    /// Adds a provider parameter, substituted into the template by name.
    ///
    /// `url` and `callback` are reserved and ignored here.
    pub fn insert_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if name != "url" && name != crate::transport::jsonp::CALLBACK_PARAM {
            self.extra.insert(name, value.into());
        }
    }

    /// All parameters handed to the transport (unencoded).
    pub fn params(&self) -> Params {
        let mut params = self.extra.clone();
        params.insert("url".to_string(), self.url.clone());
        params
    }
}

/// Runs before the provider request is sent.
pub trait SendHook: Send + Sync + 'static {
    /// Adjusts `request` in place: the target URL or extra template parameters.
    fn before_send(&self, request: &mut OutgoingRequest);
}

impl<F> SendHook for F
where
    F: Fn(&mut OutgoingRequest) + Send + Sync + 'static,
{
    fn before_send(&self, request: &mut OutgoingRequest) {
        self(request)
    }
}

/// Vetoes URLs that pass the baseline pattern.
pub trait ValidateHook: Send + Sync + 'static {
    /// `false` rejects the URL.
    fn validate(&self, url: &str) -> bool;
}

impl<F> ValidateHook for F
where
    F: Fn(&str) -> bool + Send + Sync + 'static,
{
    fn validate(&self, url: &str) -> bool {
        self(url)
    }
}

/// Data a [`ResponseHook`] works on.
#[derive(Debug)]
pub struct ResponseContext<'a> {
    /// URL the load was started with.
    pub url: &'a str,
    /// Raw provider payload.
    pub response: &'a Value,
    /// Markup to use instead of the built-in rendering (`None` or empty = render).
    pub html: Option<String>,
}

/// What happens after a [`ResponseHook`] ran.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HookOutcome {
    /// Hand the markup to the content sink.
    #[default]
    Continue,
    /// Skip the content sink for this load.
    Suppress,
}

/// Overrides the markup produced for a response.
pub trait ResponseHook: Send + Sync + 'static {
    /// Sets `ctx.html` to override the markup, or returns
    /// [`HookOutcome::Suppress`] to keep it from the content sink.
    fn handle_response(&self, ctx: &mut ResponseContext<'_>) -> HookOutcome;
}

impl<F> ResponseHook for F
where
    F: Fn(&mut ResponseContext<'_>) -> HookOutcome + Send + Sync + 'static,
{
    fn handle_response(&self, ctx: &mut ResponseContext<'_>) -> HookOutcome {
        self(ctx)
    }
}

/// The installed hooks.
#[derive(Clone, Default)]
pub struct Hooks {
    /// Runs before each provider request.
    pub send: Option<Arc<dyn SendHook>>,
    /// Consulted by `is_url_valid` after the baseline pattern.
    pub validate: Option<Arc<dyn ValidateHook>>,
    /// Runs on every delivered response, cached or fresh.
    pub response: Option<Arc<dyn ResponseHook>>,
}
