//! Baseline URL acceptance.
//!
//! Accepted shapes (case-insensitive):
//! - `http://`, `https://`, `ftp://` absolute URLs;
//! - protocol-relative `//host/...`;
//! - `www.`-prefixed hosts without a scheme.
//!
//! The first character after the prefix may not be whitespace, `/`, `$`, `.`,
//! `?` or `#`, and no whitespace may follow.

use std::sync::LazyLock;

use regex::Regex;

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(?:https?:|ftp:)?//|www\.)[^\s/$.?#].[^\s]*$")
        .expect("url pattern is valid")
});

/// True if `url` has one of the accepted shapes.
pub fn matches_url_pattern(url: &str) -> bool {
    URL_PATTERN.is_match(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_supported_shapes() {
        for url in [
            "https://www.youtube.com/watch?v=abc",
            "http://a.com",
            "HTTP://A.COM/X",
            "ftp://files.example.org/x.bin",
            "//cdn.example.com/x",
            "www.example.com",
            "WWW.example.com/path?q=1#frag",
        ] {
            assert!(matches_url_pattern(url), "{url}");
        }
    }

    #[test]
    fn rejects_everything_else() {
        for url in [
            "",
            "example.com",
            "not a url",
            "mailto:a@b.c",
            "javascript:alert(1)",
            "https://",
            "https:///x",
            "https://.a.com",
            "https://a.com/with space",
            "ws://a.com",
            "https://a",
        ] {
            assert!(!matches_url_pattern(url), "{url}");
        }
    }
}
