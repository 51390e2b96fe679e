//! Per-load options and results.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::aggregator::TaskHandle;
use crate::error::LoadError;

pub(crate) type SuccessCallback = Box<dyn FnOnce(Loaded) + Send + 'static>;
pub(crate) type ErrorCallback = Box<dyn FnOnce(LoadError) + Send + 'static>;

/// Outcome of a successful load.
#[derive(Clone, Debug, PartialEq)]
pub struct Loaded {
    /// URL the load was started with.
    pub url: String,
    /// Markup produced for the response (after the response hook).
    pub html: String,
    /// Raw provider payload, shared with the cache.
    pub response: Arc<Value>,
}

/// Options of one [`Embedder::load_content`](crate::Embedder::load_content) call.
///
/// ```rust
/// use embedvisor::LoadOptions;
///
/// let opts = LoadOptions::new()
///     .on_success(|loaded| println!("{}", loaded.html))
///     .on_error(|err| eprintln!("{err}"))
///     .without_notifications();
/// assert!(opts.notifications_suppressed());
/// ```
#[derive(Default)]
pub struct LoadOptions {
    pub(crate) callback: Option<SuccessCallback>,
    pub(crate) error_callback: Option<ErrorCallback>,
    pub(crate) no_notifications: bool,
}

impl LoadOptions {
    /// Options without callbacks, with notifications on.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs once after the content was handled.
    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(Loaded) + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Runs once if the request failed.
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(LoadError) + Send + 'static,
    {
        self.error_callback = Some(Box::new(callback));
        self
    }

    /// No progress task and no failure warning for this load.
    pub fn without_notifications(mut self) -> Self {
        self.no_notifications = true;
        self
    }

    /// True after [`without_notifications`](Self::without_notifications).
    pub fn notifications_suppressed(&self) -> bool {
        self.no_notifications
    }
}

impl fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadOptions")
            .field("callback", &self.callback.is_some())
            .field("error_callback", &self.error_callback.is_some())
            .field("no_notifications", &self.no_notifications)
            .finish()
    }
}

/// A load in flight.
pub(crate) struct PendingLoad {
    pub url: String,
    pub task: Option<TaskHandle>,
    pub callback: Option<SuccessCallback>,
    pub error_callback: Option<ErrorCallback>,
}

impl PendingLoad {
    pub fn new(url: String, task: Option<TaskHandle>, opts: LoadOptions) -> Self {
        Self {
            url,
            task,
            callback: opts.callback,
            error_callback: opts.error_callback,
        }
    }
}
