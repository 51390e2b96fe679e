//! # Task aggregation and notifications.
//!
//! - [`Aggregator`] / [`TaskHandle`]: groups concurrent loads into one progress unit;
//! - [`Notifier`]: the host display used for progress and warnings.

#[allow(clippy::module_inception)]
mod aggregator;
mod notifier;

pub use aggregator::{Aggregator, TaskHandle};
pub use notifier::{NotificationId, NotificationKind, Notifier, TracingNotifier};

#[cfg(test)]
pub(crate) use notifier::testing;
