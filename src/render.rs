//! # Provider response → markup.
//!
//! [`ProviderResponse::from_value`] classifies a raw payload by its `type`
//! discriminator; [`render`] maps it to an HTML fragment.
//!
//! | type                 | output                                                        |
//! |----------------------|---------------------------------------------------------------|
//! | `photo`              | `<img>` with encoded `src`, `alt` (title or empty), max-width |
//! | `link`               | `<a>` to `url` (or the requested URL), `title` only if set    |
//! | `video`, `rich`      | `html` verbatim                                               |
//! | anything else        | `html` verbatim, or nothing                                   |
//!
//! Payloads lacking the fields their type needs are [`ProviderResponse::Unknown`]
//! and take the passthrough branch; the provider is trusted with that markup.
//! Optional fields of the wrong JSON type are treated as absent.

use serde::Deserialize;
use serde_json::Value;

/// A provider payload, classified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderResponse {
    /// A picture.
    Photo {
        /// Image address.
        url: String,
        /// Optional caption, used as `alt`.
        title: Option<String>,
    },
    /// A plain link; the provider may omit the address.
    Link {
        /// Link address; falls back to the requested URL.
        url: Option<String>,
        /// Optional title attribute.
        title: Option<String>,
    },
    /// Player markup.
    Video {
        /// Markup supplied by the provider.
        html: String,
    },
    /// Arbitrary provider markup.
    Rich {
        /// Markup supplied by the provider.
        html: String,
    },
    /// Unrecognized `type` or a payload missing required fields.
    Unknown {
        /// Whatever `html` string the payload carried.
        html: Option<String>,
    },
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Known {
    Photo {
        url: String,
        #[serde(default, deserialize_with = "string_or_none")]
        title: Option<String>,
    },
    Link {
        #[serde(default, deserialize_with = "string_or_none")]
        url: Option<String>,
        #[serde(default, deserialize_with = "string_or_none")]
        title: Option<String>,
    },
    Video {
        html: String,
    },
    Rich {
        html: String,
    },
}

fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

impl ProviderResponse {
    /// Classifies a raw payload.
    pub fn from_value(value: &Value) -> Self {
        match Known::deserialize(value) {
            Ok(Known::Photo { url, title }) => ProviderResponse::Photo { url, title },
            Ok(Known::Link { url, title }) => ProviderResponse::Link { url, title },
            Ok(Known::Video { html }) => ProviderResponse::Video { html },
            Ok(Known::Rich { html }) => ProviderResponse::Rich { html },
            Err(_) => ProviderResponse::Unknown {
                html: value.get("html").and_then(Value::as_str).map(str::to_owned),
            },
        }
    }

    /// The payload's type name (`"unknown"` for the passthrough fallback).
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderResponse::Photo { .. } => "photo",
            ProviderResponse::Link { .. } => "link",
            ProviderResponse::Video { .. } => "video",
            ProviderResponse::Rich { .. } => "rich",
            ProviderResponse::Unknown { .. } => "unknown",
        }
    }
}

/// Renders `response` for the requested `url`.
pub fn render(url: &str, response: &ProviderResponse) -> String {
    match response {
        ProviderResponse::Photo { url: src, title } => format!(
            "<img src=\"{}\" alt=\"{}\" style=\"max-width:100%;height:auto\" />",
            encode_attr(src),
            encode_attr(title.as_deref().unwrap_or_default()),
        ),
        ProviderResponse::Link { url: href, title } => {
            let href = href.as_deref().filter(|h| !h.is_empty()).unwrap_or(url);
            let title = title
                .as_deref()
                .filter(|t| !t.is_empty())
                .map(|t| format!(" title=\"{}\"", encode_attr(t)))
                .unwrap_or_default();
            format!(
                "<a href=\"{}\"{title}>{}</a>",
                encode_attr(href),
                encode_text(href)
            )
        }
        ProviderResponse::Video { html } | ProviderResponse::Rich { html } => html.clone(),
        ProviderResponse::Unknown { html } => html.clone().unwrap_or_default(),
    }
}

/// Renders a raw payload for the requested `url`.
pub fn render_value(url: &str, response: &Value) -> String {
    render(url, &ProviderResponse::from_value(response))
}

/// Encodes text for use inside a double- or single-quoted attribute value.
pub fn encode_attr(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Encodes text for use as element content.
pub fn encode_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
