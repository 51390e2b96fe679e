//! # Script loaders: how an injected resource is fetched.
//!
//! [`ScriptLoader`] is the host seam of the transport. In a browser it would be a
//! `<script>` element; here it is an async fetch returning the resource text,
//! which the transport then executes (see [`script`](super::script)).
//!
//! A loader reports the native load-error signal as `Err(TransportError)`.
//! A successful load says nothing about whether the provider invoked its slot.

use async_trait::async_trait;

use crate::error::TransportError;

/// Fetches the executable resource at `src`.
#[async_trait]
pub trait ScriptLoader: Send + Sync + 'static {
    /// Loads the resource text, or fails with the load-error signal.
    async fn load(&self, src: &str) -> Result<String, TransportError>;

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Resolves protocol-relative `//host/...` URLs against `scheme`.
pub(crate) fn absolutize(src: &str, scheme: &str) -> Result<url::Url, TransportError> {
    let candidate = if src.starts_with("//") {
        format!("{scheme}:{src}")
    } else {
        src.to_string()
    };
    url::Url::parse(&candidate).map_err(|e| TransportError::InvalidUrl {
        src: src.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(feature = "http")]
pub use http::HttpScriptLoader;

#[cfg(feature = "http")]
mod http {
    use async_trait::async_trait;

    use super::{ScriptLoader, absolutize};
    use crate::error::TransportError;

    /// Loader fetching provider resources over HTTP(S) with `reqwest`.
    #[derive(Clone, Debug)]
    pub struct HttpScriptLoader {
        client: reqwest::Client,
        default_scheme: String,
    }

    impl HttpScriptLoader {
        /// Creates a loader with a fresh client; protocol-relative URLs use `https`.
        pub fn new() -> Self {
            Self::with_client(reqwest::Client::new())
        }

        /// Creates a loader around an existing client.
        pub fn with_client(client: reqwest::Client) -> Self {
            Self {
                client,
                default_scheme: "https".to_string(),
            }
        }

        /// Overrides the scheme applied to protocol-relative URLs.
        pub fn with_default_scheme(mut self, scheme: impl Into<String>) -> Self {
            self.default_scheme = scheme.into();
            self
        }
    }

    impl Default for HttpScriptLoader {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl ScriptLoader for HttpScriptLoader {
        async fn load(&self, src: &str) -> Result<String, TransportError> {
            let url = absolutize(src, &self.default_scheme)?;
            let load_failed = |e: reqwest::Error| TransportError::Load {
                src: src.to_string(),
                reason: e.to_string(),
            };

            let response = self.client.get(url).send().await.map_err(load_failed)?;
            let status = response.status();
            if !status.is_success() {
                return Err(TransportError::Status {
                    src: src.to_string(),
                    status: status.as_u16(),
                });
            }
            response.text().await.map_err(load_failed)
        }

        fn name(&self) -> &'static str {
            "http"
        }
    }
}
