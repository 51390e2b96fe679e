//! # Embedder configuration.
//!
//! Provides [`Config`], the centralized settings of an [`Embedder`](crate::Embedder),
//! and [`Messages`], the user-visible notification templates.
//!
//! There is no configuration file: hosts build a `Config` in code (usually
//! starting from [`Config::default`]) and pass it to
//! [`Embedder::builder`](crate::Embedder::builder).
//!
//! ## Sentinel values
//! - `bus_capacity = 0` → clamped to 1 by [`Config::bus_capacity_clamped`]
//! - `warning_url_chars = 0` → the warning shows only the ellipsis

use crate::template::Template;

/// Default provider endpoint. `{url}` receives the embedded target, `{callback}` the registry slot.
pub const DEFAULT_PROVIDER_URL: &str =
    "//ckeditor.iframe.ly/api/oembed?url={url}&callback={callback}";

/// Configuration of an embedder instance.
///
/// ## Field semantics
/// - `provider_url`: URL template of the provider endpoint
/// - `default_scheme`: scheme used to resolve protocol-relative request URLs
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
/// - `warning_url_chars`: how many characters of a failing URL the warning shows
/// - `messages`: notification templates
#[derive(Clone, Debug)]
pub struct Config {
    /// Provider endpoint template.
    ///
    /// Must contain a `{callback}` placeholder; `{url}` receives the target URL.
    /// Extra params added by a send hook are substituted by name as well.
    pub provider_url: String,

    /// Scheme applied to protocol-relative (`//host/...`) request URLs, without the colon.
    pub default_scheme: String,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Number of leading characters of the URL quoted in the fetch-failed warning.
    pub warning_url_chars: usize,

    /// Notification message templates.
    pub messages: Messages,
}

impl Config {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the provider endpoint as a [`Template`].
    #[inline]
    pub fn provider_template(&self) -> Template {
        Template::new(self.provider_url.clone())
    }

    /// Shortens `url` for the fetch-failed warning: leading characters plus `...`.
    ///
    /// The ellipsis is always appended, even when nothing was cut.
    pub fn truncate_for_warning(&self, url: &str) -> String {
        let head: String = url.chars().take(self.warning_url_chars).collect();
        format!("{head}...")
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `provider_url = DEFAULT_PROVIDER_URL`
    /// - `default_scheme = "https"`
    /// - `bus_capacity = 1024`
    /// - `warning_url_chars = 40`
    /// - `messages = Messages::default()`
    fn default() -> Self {
        Self {
            provider_url: DEFAULT_PROVIDER_URL.to_string(),
            default_scheme: "https".to_string(),
            bus_capacity: 1024,
            warning_url_chars: 40,
            messages: Messages::default(),
        }
    }
}

/// User-visible notification templates.
#[derive(Clone, Debug)]
pub struct Messages {
    /// Progress message while a single load is outstanding.
    pub fetching_one: String,
    /// Progress message while several loads are outstanding (`{current}`, `{max}`).
    pub fetching_many: String,
    /// Warning shown when a load fails (`{url}`).
    pub fetching_failed: String,
    /// Message for URLs rejected by validation (`{url}`).
    pub unsupported_url: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            fetching_one: "Fetching oEmbed response...".to_string(),
            fetching_many: "Fetching oEmbed responses, {current} of {max} done...".to_string(),
            fetching_failed: "Failed to fetch content for {url}.".to_string(),
            unsupported_url: "The URL {url} is not supported.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_keeps_forty_chars_and_appends_ellipsis() {
        let cfg = Config::default();
        let url = "https://www.example.com/a/very/long/path/to/some/embeddable/video";
        let short = cfg.truncate_for_warning(url);
        assert_eq!(short, "https://www.example.com/a/very/long/path...");
        assert_eq!(short.chars().count(), 43);
    }

    #[test]
    fn warning_counts_chars_not_bytes() {
        let cfg = Config {
            warning_url_chars: 3,
            ..Config::default()
        };
        assert_eq!(cfg.truncate_for_warning("żółw.pl"), "żół...");
        assert_eq!(cfg.truncate_for_warning("ab"), "ab...");
    }

    #[test]
    fn bus_capacity_is_clamped() {
        let cfg = Config {
            bus_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
