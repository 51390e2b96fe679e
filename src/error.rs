//! Error types used by the embed transport and the load orchestrator.
//!
//! This module defines two main error enums:
//!
//! - [`TransportError`] — failures to fetch the provider resource.
//! - [`LoadError`] — failures reported to `load_content` callers.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.
//! A malformed provider payload is **not** an error: it is rendered through the
//! raw-HTML passthrough branch (see [`render_value`](crate::render_value)).

use thiserror::Error;

/// # Errors produced by the cross-origin transport.
///
/// Every variant corresponds to the native "load error" signal of an injected
/// resource; the provider never supplies a structured error payload.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The resource could not be fetched (network failure, refused connection, ...).
    #[error("failed to load {src}: {reason}")]
    Load {
        /// Final request URL of the injected resource.
        src: String,
        /// Underlying failure message.
        reason: String,
    },

    /// The resource was reached but answered with a non-success status.
    #[error("loading {src} returned status {status}")]
    Status {
        /// Final request URL of the injected resource.
        src: String,
        /// HTTP status code.
        status: u16,
    },

    /// The final request URL could not be resolved into a fetchable address.
    #[error("invalid request url {src}: {reason}")]
    InvalidUrl {
        /// The offending URL.
        src: String,
        /// Parser message.
        reason: String,
    },
}

impl TransportError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use embedvisor::TransportError;
    ///
    /// let err = TransportError::Status { src: "//p/oembed".into(), status: 404 };
    /// assert_eq!(err.as_label(), "transport_status");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TransportError::Load { .. } => "transport_load",
            TransportError::Status { .. } => "transport_status",
            TransportError::InvalidUrl { .. } => "transport_invalid_url",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TransportError::Load { reason, .. } => format!("load failed: {reason}"),
            TransportError::Status { status, .. } => format!("status: {status}"),
            TransportError::InvalidUrl { reason, .. } => format!("invalid url: {reason}"),
        }
    }

    /// The request URL the failure refers to.
    pub fn src(&self) -> &str {
        match self {
            TransportError::Load { src, .. }
            | TransportError::Status { src, .. }
            | TransportError::InvalidUrl { src, .. } => src,
        }
    }
}

/// # Errors reported to callers of the load orchestrator.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// Fetching the provider resource failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The URL failed the baseline pattern or was vetoed by a validation hook.
    #[error("url is not supported: {url}")]
    UnsupportedUrl {
        /// The rejected URL.
        url: String,
    },

    /// The load was abandoned before either callback fired (runtime shut down).
    #[error("load interrupted")]
    Interrupted,
}

impl LoadError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use embedvisor::LoadError;
    ///
    /// let err = LoadError::UnsupportedUrl { url: "not a url".into() };
    /// assert_eq!(err.as_label(), "load_unsupported_url");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            LoadError::Transport(e) => e.as_label(),
            LoadError::UnsupportedUrl { .. } => "load_unsupported_url",
            LoadError::Interrupted => "load_interrupted",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            LoadError::Transport(e) => e.as_message(),
            LoadError::UnsupportedUrl { url } => format!("unsupported url: {url}"),
            LoadError::Interrupted => "load interrupted".to_string(),
        }
    }
}
