//! Consumer side of a load: where rendered markup ends up.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Receives rendered markup for a loaded URL.
pub trait ContentSink: Send + Sync + 'static {
    /// Called at most once per successful load, never on the error path.
    fn set_content(&self, url: &str, html: &str);
}

/// Markup last handed to a [`ContentSlot`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Content {
    pub url: String,
    pub html: String,
}

/// Default sink keeping the most recent content.
#[derive(Debug, Default)]
pub struct ContentSlot {
    current: Mutex<Option<Content>>,
    updates: AtomicUsize,
}

impl ContentSlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent content, if any was set.
    pub fn current(&self) -> Option<Content> {
        lock(&self.current).clone()
    }

    /// How many times content was set.
    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

impl ContentSink for ContentSlot {
    fn set_content(&self, url: &str, html: &str) {
        *lock(&self.current) = Some(Content {
            url: url.to_string(),
            html: html.to_string(),
        });
        self.updates.fetch_add(1, Ordering::SeqCst);
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_the_latest_content() {
        let slot = ContentSlot::new();
        assert_eq!(slot.current(), None);

        slot.set_content("a", "<b>a</b>");
        slot.set_content("b", "<b>b</b>");
        assert_eq!(
            slot.current(),
            Some(Content {
                url: "b".into(),
                html: "<b>b</b>".into()
            })
        );
        assert_eq!(slot.updates(), 2);
    }
}
