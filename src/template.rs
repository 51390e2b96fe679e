//! # Placeholder templates.
//!
//! [`Template`] substitutes `{name}` placeholders with caller-supplied values.
//! It is used for the provider endpoint and for notification messages.
//!
//! ## Rules
//! - Placeholder names consist of ASCII alphanumerics and `_`.
//! - A placeholder without a value is left untouched (`{missing}` stays `{missing}`).
//! - Values are inserted verbatim; encoding is the caller's job.
//!
//! ## Example
//! ```rust
//! use std::collections::BTreeMap;
//! use embedvisor::Template;
//!
//! let tpl = Template::new("Fetching {current} of {max}...");
//! let mut params = BTreeMap::new();
//! params.insert("current".to_string(), "1".to_string());
//! params.insert("max".to_string(), "3".to_string());
//! assert_eq!(tpl.output(&params), "Fetching 1 of 3...");
//! ```

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z0-9_]+)\}").expect("placeholder pattern is valid"));

/// Named parameters for [`Template::output`].
pub type Params = BTreeMap<String, String>;

/// A string with `{name}` placeholders.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    source: String,
}

impl Template {
    /// Creates a template from its source text.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Returns the raw template text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Renders the template with `params`.
    pub fn output(&self, params: &Params) -> String {
        PLACEHOLDER
            .replace_all(&self.source, |caps: &Captures<'_>| match params.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Renders the template with a single parameter.
    pub fn output_one(&self, name: &str, value: impl Into<String>) -> String {
        let mut params = Params::new();
        params.insert(name.to_string(), value.into());
        self.output(&params)
    }
}

impl From<&str> for Template {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}
