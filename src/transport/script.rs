//! # Execution of fetched JSONP resources.
//!
//! A provider answers with executable text such as
//!
//! ```text
//! /**/ embedCallbacks[3]({"type":"photo","url":"https://..."});
//! /**/ typeof embedCallbacks[3] === 'function' && embedCallbacks[3]({...});
//! try { embedCallbacks[3]({...}) } catch (e) {}
//! ```
//!
//! [`parse_invocations`] finds every `name(<json>)` call in the body, wherever
//! it appears: guards, `try` blocks and `&&` chains around the call are
//! skipped. Calls whose argument is not a single JSON value are ignored, and
//! so is anything inside comments or string literals.

use serde_json::{Deserializer, Value};

/// One `name(payload)` call found in a script.
#[derive(Clone, Debug, PartialEq)]
pub struct Invocation {
    /// Callee as written (e.g. `embedCallbacks[3]`).
    pub callee: String,
    /// The single JSON argument.
    pub payload: Value,
}

/// Extracts the invocations of `body` in source order.
pub fn parse_invocations(body: &str) -> Vec<Invocation> {
    let mut out = Vec::new();
    let mut rest = body;

    while let Some(c) = rest.chars().next() {
        if let Some(tail) = skip_comment(rest) {
            rest = tail;
        } else if matches!(c, '"' | '\'' | '`') {
            rest = skip_string(&rest[1..], c);
        } else if is_callee_char(c) {
            let len = rest
                .find(|c: char| !is_callee_char(c))
                .unwrap_or(rest.len());
            let (callee, after) = rest.split_at(len);
            rest = after;
            if !is_callee_start(c) {
                continue;
            }
            if let Some((payload, tail)) = parse_argument(after) {
                out.push(Invocation {
                    callee: callee.to_string(),
                    payload,
                });
                rest = tail;
            }
        } else {
            rest = &rest[c.len_utf8()..];
        }
    }
    out
}

/// Parses `( <json> )` at the start of `src` (leading whitespace allowed).
fn parse_argument(src: &str) -> Option<(Value, &str)> {
    let args = src.trim_start().strip_prefix('(')?.trim_start();

    // The stream deserializer rejects scalars followed by `)`, so scalars are cut at the paren.
    let (payload, rest) = if args.starts_with(['{', '[', '"']) {
        let mut values = Deserializer::from_str(args).into_iter::<Value>();
        let payload = values.next()?.ok()?;
        (payload, &args[values.byte_offset()..])
    } else {
        let end = args.find(')')?;
        (serde_json::from_str(args[..end].trim()).ok()?, &args[end..])
    };

    let tail = rest.trim_start().strip_prefix(')')?;
    Some((payload, tail))
}

fn is_callee_start(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, '_' | '$')
}

fn is_callee_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.' | '[' | ']')
}

/// Skips one `/* */` or `//` comment at the start of `src`.
fn skip_comment(src: &str) -> Option<&str> {
    if let Some(comment) = src.strip_prefix("/*") {
        return Some(comment.find("*/").map_or("", |end| &comment[end + 2..]));
    }
    let comment = src.strip_prefix("//")?;
    Some(comment.find('\n').map_or("", |end| &comment[end + 1..]))
}

/// Skips the rest of a string literal opened by `quote`.
fn skip_string(src: &str, quote: char) -> &str {
    let mut chars = src.char_indices();
    while let Some((i, c)) = chars.next() {
        if c == '\\' {
            chars.next();
        } else if c == quote {
            return &src[i + c.len_utf8()..];
        }
    }
    ""
}
