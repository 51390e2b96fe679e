//! # Task aggregator: many loads, one progress notification.
//!
//! An [`Aggregator`] counts outstanding [`TaskHandle`]s and keeps a single
//! progress notification in sync with them. Once every task created on it has
//! been marked done or cancelled, it **finishes**: the finish handlers run, the
//! [`finished_token`](Aggregator::finished_token) is cancelled and
//! `AggregatorFinished` is published. This happens once per aggregator.
//!
//! ## Counting
//! ```text
//! create_task   total += 1
//! task.done     done  += 1
//! task.cancel   total -= 1           (a cancelled task no longer counts)
//! finished   ⇔  done == total
//! ```
//!
//! ## Notification
//! - shown (`Progress`) when the first task is created, updated on every change;
//! - message: `fetching_one` while `total == 1`, otherwise `fetching_many`
//!   with `{current}` = done and `{max}` = total;
//! - never hidden by the aggregator itself: a finish handler does that.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

use super::notifier::{NotificationId, NotificationKind, Notifier};
use crate::config::Messages;
use crate::events::{Bus, Event, EventKind};
use crate::template::{Params, Template};

type FinishHandler = Box<dyn FnOnce(&Aggregator) + Send + 'static>;

#[derive(Debug, Default)]
struct State {
    total: u32,
    done: u32,
    notification: Option<NotificationId>,
    finished: bool,
}

struct Inner {
    state: Mutex<State>,
    handlers: Mutex<Vec<FinishHandler>>,
    finished: CancellationToken,
    notifier: Arc<dyn Notifier>,
    messages: Messages,
    bus: Bus,
}

/// Groups concurrent tasks under one progress notification.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct Aggregator {
    inner: Arc<Inner>,
}

impl Aggregator {
    /// Creates an aggregator without tasks.
    pub fn new(notifier: Arc<dyn Notifier>, messages: Messages, bus: Bus) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                handlers: Mutex::new(Vec::new()),
                finished: CancellationToken::new(),
                notifier,
                messages,
                bus,
            }),
        }
    }

    /// Adds one outstanding unit of work.
    ///
    /// Tasks created after the aggregator finished are still counted and shown,
    /// but the finish signal does not fire a second time. Use
    /// [`try_create_task`](Self::try_create_task) to refuse them instead.
    pub fn create_task(&self) -> TaskHandle {
        self.change(EventKind::TaskCreated, |s| {
            s.total += 1;
            true
        });
        self.handle()
    }

    /// Adds one outstanding unit of work unless the aggregator already finished.
    ///
    /// The check and the increment happen under the same lock as finishing, so a
    /// task is never added to an aggregator that finishes concurrently.
    pub fn try_create_task(&self) -> Option<TaskHandle> {
        self.change(EventKind::TaskCreated, |s| {
            if s.finished {
                return false;
            }
            s.total += 1;
            true
        })
        .then(|| self.handle())
    }

    fn handle(&self) -> TaskHandle {
        TaskHandle {
            aggregator: self.clone(),
            settled: false,
        }
    }

    /// True once every created task is done or cancelled.
    pub fn is_finished(&self) -> bool {
        self.state().finished
    }

    /// `(done, total)` counters.
    pub fn progress(&self) -> (u32, u32) {
        let s = self.state();
        (s.done, s.total)
    }

    /// The progress notification, once shown.
    pub fn notification(&self) -> Option<NotificationId> {
        self.state().notification
    }

    /// Token cancelled when the aggregator finishes.
    pub fn finished_token(&self) -> CancellationToken {
        self.inner.finished.clone()
    }

    /// Registers a handler run once when the aggregator finishes.
    ///
    /// Runs immediately if it already has.
    pub fn on_finished<F>(&self, handler: F)
    where
        F: FnOnce(&Aggregator) + Send + 'static,
    {
        if self.is_finished() {
            handler(self);
            return;
        }
        lock(&self.inner.handlers).push(Box::new(handler));
        // Finish may have happened between the check and the push.
        if self.is_finished() {
            self.run_finish_handlers();
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        lock(&self.inner.state)
    }

    /// Applies a counter change, refreshes the notification and finishes if settled.
    ///
    /// `apply` returns false to leave the state untouched; nothing is shown,
    /// published or finished then, and `change` returns false.
    fn change(&self, kind: EventKind, apply: impl FnOnce(&mut State) -> bool) -> bool {
        let (done, total, just_finished) = {
            let mut s = self.state();
            if !apply(&mut s) {
                return false;
            }

            let message = self.message(s.done, s.total);
            match s.notification {
                Some(id) => {
                    self.inner
                        .notifier
                        .update(id, &message, progress_ratio(s.done, s.total));
                }
                None => {
                    let id = self
                        .inner
                        .notifier
                        .show(&message, NotificationKind::Progress);
                    s.notification = Some(id);
                }
            }

            let just_finished = !s.finished && kind != EventKind::TaskCreated && s.done == s.total;
            s.finished |= just_finished;
            (s.done, s.total, just_finished)
        };

        self.inner
            .bus
            .publish(Event::new(kind).with_progress(done, total));

        if just_finished {
            self.inner.finished.cancel();
            self.inner.bus.publish(
                Event::new(EventKind::AggregatorFinished).with_progress(done, total),
            );
            self.run_finish_handlers();
        }
        true
    }

    fn run_finish_handlers(&self) {
        let handlers: Vec<FinishHandler> = lock(&self.inner.handlers).drain(..).collect();
        for handler in handlers {
            handler(self);
        }
    }

    fn message(&self, done: u32, total: u32) -> String {
        let messages = &self.inner.messages;
        if total <= 1 {
            return messages.fetching_one.clone();
        }
        let mut params = Params::new();
        params.insert("current".to_string(), done.to_string());
        params.insert("max".to_string(), total.to_string());
        Template::new(messages.fetching_many.as_str()).output(&params)
    }
}

fn progress_ratio(done: u32, total: u32) -> Option<f32> {
    (total > 0).then(|| done as f32 / total as f32)
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One outstanding unit of an [`Aggregator`].
///
/// Settled exactly once: by [`done`](TaskHandle::done), by
/// [`cancel`](TaskHandle::cancel), or by being dropped (which cancels).
pub struct TaskHandle {
    aggregator: Aggregator,
    settled: bool,
}

impl TaskHandle {
    /// Marks the task as completed.
    pub fn done(mut self) {
        self.settled = true;
        self.aggregator.change(EventKind::TaskDone, |s| {
            s.done += 1;
            true
        });
    }

    /// Marks the task as no longer pending; it stops counting toward the total.
    pub fn cancel(mut self) {
        self.settle_cancelled();
    }

    fn settle_cancelled(&mut self) {
        self.settled = true;
        self.aggregator.change(EventKind::TaskCanceled, |s| {
            s.total = s.total.saturating_sub(1);
            true
        });
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        if !self.settled {
            self.settle_cancelled();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::notifier::testing::{Call, RecordingNotifier};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn aggregator() -> (Aggregator, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let agg = Aggregator::new(notifier.clone(), Messages::default(), Bus::new(64));
        (agg, notifier)
    }

    fn count_finishes(agg: &Aggregator) -> Arc<AtomicUsize> {
        let finishes = Arc::new(AtomicUsize::new(0));
        let counter = finishes.clone();
        agg.on_finished(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        finishes
    }

    #[test]
    fn finishes_once_after_every_task_settles() {
        let (agg, _) = aggregator();
        let finishes = count_finishes(&agg);

        let tasks: Vec<TaskHandle> = (0..3).map(|_| agg.create_task()).collect();
        let mut tasks = tasks.into_iter();

        tasks.next().expect("task").done();
        assert!(!agg.is_finished());
        tasks.next().expect("task").cancel();
        assert!(!agg.is_finished());
        assert_eq!(finishes.load(Ordering::SeqCst), 0);

        tasks.next().expect("task").done();
        assert!(agg.is_finished());
        assert!(agg.finished_token().is_cancelled());
        assert_eq!(agg.progress(), (2, 2));
        assert_eq!(finishes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_a_task_cancels_it() {
        let (agg, _) = aggregator();
        let finishes = count_finishes(&agg);
        drop(agg.create_task());

        assert!(agg.is_finished());
        assert_eq!(agg.progress(), (0, 0));
        assert_eq!(finishes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn late_tasks_do_not_refire_finish() {
        let (agg, _) = aggregator();
        let finishes = count_finishes(&agg);
        agg.create_task().done();
        agg.create_task().done();
        assert_eq!(finishes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn try_create_task_refuses_a_finished_aggregator() {
        let (agg, notifier) = aggregator();
        let first = agg.try_create_task().expect("open aggregator");
        first.done();
        assert!(agg.is_finished());
        let calls = notifier.calls().len();

        assert!(agg.try_create_task().is_none());
        assert_eq!(agg.progress(), (1, 1));
        assert_eq!(notifier.calls().len(), calls);
    }

    #[test]
    fn handler_registered_after_finish_runs_immediately() {
        let (agg, _) = aggregator();
        agg.create_task().done();
        let finishes = count_finishes(&agg);
        assert_eq!(finishes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn notification_tracks_progress() {
        let (agg, notifier) = aggregator();
        let a = agg.create_task();
        let b = agg.create_task();
        a.done();
        b.done();

        let id = agg.notification().expect("shown");
        assert_eq!(
            notifier.calls(),
            vec![
                Call::Show(id, "Fetching oEmbed response...".into(), NotificationKind::Progress),
                Call::Update(
                    id,
                    "Fetching oEmbed responses, 0 of 2 done...".into(),
                    Some(0.0)
                ),
                Call::Update(
                    id,
                    "Fetching oEmbed responses, 1 of 2 done...".into(),
                    Some(0.5)
                ),
                Call::Update(
                    id,
                    "Fetching oEmbed responses, 2 of 2 done...".into(),
                    Some(1.0)
                ),
            ]
        );
    }

    #[test]
    fn finish_handler_can_hide_the_notification() {
        let (agg, notifier) = aggregator();
        let hider = notifier.clone();
        agg.on_finished(move |agg| {
            if let Some(id) = agg.notification() {
                hider.hide(id);
            }
        });

        agg.create_task().done();
        assert_eq!(notifier.hidden(), vec![agg.notification().expect("shown")]);
    }
}
