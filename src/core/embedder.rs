//! # Embedder: loads remote content for a URL and hands it to the host.
//!
//! One [`Embedder`] owns a transport, a response cache and the current
//! progress [`Aggregator`]. Every call to [`load_content`](Embedder::load_content)
//! walks the same state machine:
//!
//! ```text
//! load_content(url, opts)
//!   └─► cache.get(url)
//!         ├─ hit  ─► publish CacheHit ─► next tick: finish_loading(cached)
//!         └─ miss ─► task = aggregator.create_task()        (unless notifications off)
//!                    send hook may rewrite the outgoing request
//!                    transport.send_request(provider, {url})  publish RequestSent
//!                      ├─ success ─► finish_loading(payload)
//!                      └─ error   ─► handle_error
//!
//! finish_loading(payload)
//!   ├─► cache.put(url, payload)
//!   ├─► task.done()
//!   ├─► response hook, then render (unless the hook supplied markup)
//!   ├─► content.set_content(url, html)   publish ContentSet    (unless suppressed)
//!   └─► callback(Loaded)
//!
//! handle_error(err)
//!   ├─► task.cancel() and warning "Failed to fetch content for <40 chars>..."
//!   ├─► publish LoadFailed
//!   └─► error_callback(err)
//! ```
//!
//! ## Rules
//! - Exactly one of `callback` / `error_callback` runs per load, always after
//!   `load_content` returned.
//! - `load_content` does not validate; hosts call [`is_url_valid`](Embedder::is_url_valid) first.
//! - A new aggregator is created only when none exists or the current one finished;
//!   its finish handler hides the progress notification.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use embedvisor::{Config, ContentSlot, Embedder, StubProvider, StubReply};
//! use serde_json::json;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = StubProvider::new().with_reply(
//!         "https://example.com/post",
//!         StubReply::Payload(json!({"type": "rich", "html": "<blockquote>post</blockquote>"})),
//!     );
//!     let slot = Arc::new(ContentSlot::new());
//!     let embedder = Embedder::builder(Config::default())
//!         .with_loader(Arc::new(provider))
//!         .with_content_sink(slot.clone())
//!         .build();
//!
//!     let url = "https://example.com/post";
//!     assert!(embedder.is_url_valid(url));
//!     let loaded = embedder.load(url, false).await?;
//!     assert_eq!(loaded.html, "<blockquote>post</blockquote>");
//!     assert_eq!(slot.current().map(|c| c.url).as_deref(), Some(url));
//!     Ok(())
//! }
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::{broadcast, oneshot};

use super::content::ContentSink;
use super::hooks::{HookOutcome, Hooks, OutgoingRequest, ResponseContext};
use super::request::{LoadOptions, Loaded, PendingLoad};
use super::validate::matches_url_pattern;
use crate::aggregator::{Aggregator, NotificationKind, Notifier, TaskHandle};
use crate::cache::ResponseCache;
use crate::config::Config;
use crate::error::{LoadError, TransportError};
use crate::events::{Bus, Event, EventKind};
use crate::render::render_value;
use crate::subscribers::SubscriberSet;
use crate::template::Template;
use crate::transport::JsonpTransport;

/// Parts assembled by [`EmbedderBuilder`](super::EmbedderBuilder).
pub(super) struct EmbedderParts {
    pub cfg: Config,
    pub transport: JsonpTransport,
    pub notifier: Arc<dyn Notifier>,
    pub content: Arc<dyn ContentSink>,
    pub hooks: Hooks,
    pub bus: Bus,
    pub subs: Arc<SubscriberSet>,
}

/// Loads embeddable content through a provider and hands the markup to a [`ContentSink`].
pub struct Embedder {
    cfg: Config,
    provider: Template,
    transport: JsonpTransport,
    cache: ResponseCache,
    aggregator: Mutex<Option<Aggregator>>,
    notifier: Arc<dyn Notifier>,
    content: Arc<dyn ContentSink>,
    hooks: Hooks,
    bus: Bus,
    subs: Arc<SubscriberSet>,
}

type Pending = Arc<Mutex<Option<PendingLoad>>>;
type Reply = Arc<Mutex<Option<oneshot::Sender<Result<Loaded, LoadError>>>>>;

impl Embedder {
    /// Starts building an embedder.
    pub fn builder(cfg: Config) -> super::EmbedderBuilder {
        super::EmbedderBuilder::new(cfg)
    }

    pub(super) fn new_internal(parts: EmbedderParts) -> Self {
        Self {
            provider: parts.cfg.provider_template(),
            cfg: parts.cfg,
            transport: parts.transport,
            cache: ResponseCache::new(),
            aggregator: Mutex::new(None),
            notifier: parts.notifier,
            content: parts.content,
            hooks: parts.hooks,
            bus: parts.bus,
            subs: parts.subs,
        }
    }

    /// Configuration this embedder was built with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Creates a receiver for events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Number of subscribers the events are fanned out to.
    pub fn subscriber_count(&self) -> usize {
        self.subs.len()
    }

    /// True if `url` has a supported shape and no validation hook vetoes it.
    pub fn is_url_valid(&self, url: &str) -> bool {
        matches_url_pattern(url)
            && self
                .hooks
                .validate
                .as_ref()
                .is_none_or(|hook| hook.validate(url))
    }

    /// Like [`is_url_valid`](Self::is_url_valid) with a typed error.
    pub fn validate(&self, url: &str) -> Result<(), LoadError> {
        if self.is_url_valid(url) {
            Ok(())
        } else {
            Err(LoadError::UnsupportedUrl {
                url: url.to_string(),
            })
        }
    }

    /// User-facing message for a rejected URL.
    pub fn unsupported_message(&self, url: &str) -> String {
        Template::new(self.cfg.messages.unsupported_url.as_str()).output_one("url", url)
    }

    /// Loads content for `url`. The outcome arrives through `opts`' callbacks.
    ///
    /// Never completes synchronously. Must be called from within a tokio runtime.
    pub fn load_content(self: &Arc<Self>, url: impl Into<String>, opts: LoadOptions) {
        let url = url.into();

        if let Some(response) = self.cache.get(&url) {
            self.bus
                .publish(Event::new(EventKind::CacheHit).with_url(url.as_str()));
            let load = PendingLoad::new(url, None, opts);
            let this = Arc::clone(self);
            tokio::spawn(async move {
                this.finish_loading(load, response);
            });
            return;
        }

        let task = (!opts.no_notifications).then(|| self.create_task());
        let mut request = OutgoingRequest::new(url.as_str());
        if let Some(hook) = &self.hooks.send {
            hook.before_send(&mut request);
        }

        let pending: Pending =
            Arc::new(Mutex::new(Some(PendingLoad::new(url.clone(), task, opts))));

        let on_success = {
            let this = Arc::clone(self);
            let pending = Arc::clone(&pending);
            move |payload: Value| {
                if let Some(load) = take(&pending) {
                    this.finish_loading(load, Arc::new(payload));
                }
            }
        };
        let on_error = {
            let this = Arc::clone(self);
            move |err: TransportError| {
                if let Some(load) = take(&pending) {
                    this.handle_error(load, err);
                }
            }
        };

        let key = self
            .transport
            .send_request(&self.provider, &request.params(), on_success, on_error);
        self.bus.publish(
            Event::new(EventKind::RequestSent)
                .with_url(url.as_str())
                .with_key(key.get()),
        );
    }

    /// Loads content for `url` and waits for the outcome.
    ///
    /// A request the provider never answers keeps this future pending; wrap it in
    /// `tokio::time::timeout` if that matters to the caller.
    pub async fn load(
        self: &Arc<Self>,
        url: impl Into<String>,
        no_notifications: bool,
    ) -> Result<Loaded, LoadError> {
        let (tx, rx) = oneshot::channel();
        let tx: Reply = Arc::new(Mutex::new(Some(tx)));
        let err_tx = Arc::clone(&tx);

        let mut opts = LoadOptions::new()
            .on_success(move |loaded| send_once(&tx, Ok(loaded)))
            .on_error(move |err| send_once(&err_tx, Err(err)));
        if no_notifications {
            opts = opts.without_notifications();
        }

        self.load_content(url, opts);
        rx.await.unwrap_or(Err(LoadError::Interrupted))
    }

    /// Payload cached for `url`, if any.
    pub fn cached(&self, url: &str) -> Option<Arc<Value>> {
        self.cache.get(url)
    }

    /// Requests whose registry slot is still outstanding.
    pub fn pending_requests(&self) -> usize {
        self.transport.registry().len()
    }

    /// Injected resources not removed yet.
    pub fn attached_scripts(&self) -> usize {
        self.transport.attached_scripts()
    }

    /// The current aggregator, finished or not.
    pub fn aggregator(&self) -> Option<Aggregator> {
        lock(&self.aggregator).clone()
    }

    /// Adds a task to the current aggregator, replacing it first if absent or finished.
    fn create_task(&self) -> TaskHandle {
        let mut current = lock(&self.aggregator);
        if let Some(task) = current.as_ref().and_then(Aggregator::try_create_task) {
            return task;
        }

        let agg = Aggregator::new(
            Arc::clone(&self.notifier),
            self.cfg.messages.clone(),
            self.bus.clone(),
        );
        let notifier = Arc::clone(&self.notifier);
        agg.on_finished(move |agg| {
            if let Some(id) = agg.notification() {
                notifier.hide(id);
            }
        });
        self.bus.publish(Event::new(EventKind::AggregatorCreated));

        let task = agg.create_task();
        *current = Some(agg);
        task
    }

    fn finish_loading(&self, load: PendingLoad, response: Arc<Value>) {
        let PendingLoad {
            url,
            task,
            callback,
            ..
        } = load;

        self.cache.put(url.as_str(), Arc::clone(&response));
        if let Some(task) = task {
            task.done();
        }

        let mut ctx = ResponseContext {
            url: &url,
            response: &response,
            html: None,
        };
        let outcome = self
            .hooks
            .response
            .as_ref()
            .map_or(HookOutcome::Continue, |hook| hook.handle_response(&mut ctx));
        let html = ctx
            .html
            .filter(|html| !html.is_empty())
            .unwrap_or_else(|| render_value(&url, &response));

        match outcome {
            HookOutcome::Continue => {
                self.content.set_content(&url, &html);
                self.bus
                    .publish(Event::new(EventKind::ContentSet).with_url(url.as_str()));
            }
            HookOutcome::Suppress => {
                self.bus
                    .publish(Event::new(EventKind::ResponseSuppressed).with_url(url.as_str()));
            }
        }

        if let Some(callback) = callback {
            callback(Loaded {
                url,
                html,
                response,
            });
        }
    }

    fn handle_error(&self, load: PendingLoad, err: TransportError) {
        let PendingLoad {
            url,
            task,
            error_callback,
            ..
        } = load;

        if let Some(task) = task {
            task.cancel();
            let message = Template::new(self.cfg.messages.fetching_failed.as_str())
                .output_one("url", &self.cfg.truncate_for_warning(&url));
            self.notifier.show(&message, NotificationKind::Warning);
        }

        self.bus.publish(
            Event::new(EventKind::LoadFailed)
                .with_url(url.as_str())
                .with_reason(err.as_message()),
        );

        if let Some(error_callback) = error_callback {
            error_callback(LoadError::Transport(err));
        }
    }
}

fn take(pending: &Pending) -> Option<PendingLoad> {
    lock(pending).take()
}

fn send_once(tx: &Reply, value: Result<Loaded, LoadError>) {
    let sender = lock(tx).take();
    if let Some(sender) = sender {
        let _ = sender.send(value);
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::testing::{Call, RecordingNotifier};
    use crate::core::content::ContentSlot;
    use crate::core::EmbedderBuilder;
    use crate::subscribers::Subscribe;
    use crate::transport::{StubProvider, StubReply};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    struct Harness {
        embedder: Arc<Embedder>,
        provider: Arc<StubProvider>,
        notifier: Arc<RecordingNotifier>,
        slot: Arc<ContentSlot>,
    }

    fn harness_with(
        cfg: Config,
        provider: StubProvider,
        customize: impl FnOnce(EmbedderBuilder) -> EmbedderBuilder,
    ) -> Harness {
        let provider = Arc::new(provider);
        let notifier = Arc::new(RecordingNotifier::default());
        let slot = Arc::new(ContentSlot::new());
        let builder = Embedder::builder(cfg)
            .with_loader(provider.clone())
            .with_notifier(notifier.clone())
            .with_content_sink(slot.clone());
        Harness {
            embedder: customize(builder).build(),
            provider,
            notifier,
            slot,
        }
    }

    fn harness(provider: StubProvider) -> Harness {
        harness_with(Config::default(), provider, |b| b)
    }

    fn rich(html: &str) -> StubReply {
        StubReply::Payload(json!({"type": "rich", "html": html}))
    }

    fn progress_shows(notifier: &RecordingNotifier) -> usize {
        notifier
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::Show(_, _, NotificationKind::Progress)))
            .count()
    }

    #[tokio::test]
    async fn success_sets_content_and_caches() {
        let h = harness(StubProvider::new().with_reply("https://a.com/x", rich("<b>x</b>")));

        let loaded = h.embedder.load("https://a.com/x", false).await.expect("loaded");
        assert_eq!(loaded.url, "https://a.com/x");
        assert_eq!(loaded.html, "<b>x</b>");
        assert_eq!(h.slot.current().expect("content").html, "<b>x</b>");
        assert_eq!(h.slot.updates(), 1);
        assert_eq!(
            h.embedder.cached("https://a.com/x").as_deref(),
            Some(&json!({"type": "rich", "html": "<b>x</b>"}))
        );
        assert_eq!(h.embedder.pending_requests(), 0);
        assert_eq!(h.embedder.attached_scripts(), 0);
    }

    #[tokio::test]
    async fn cache_hit_is_delivered_later_without_a_request() {
        let h = harness(StubProvider::new().with_reply("https://a.com/x", rich("<b>x</b>")));
        let first = h.embedder.load("https://a.com/x", false).await.expect("loaded");
        assert_eq!(h.provider.load_count(), 1);

        let returned = Arc::new(AtomicBool::new(false));
        let seen_return = returned.clone();
        let (tx, rx) = oneshot::channel();
        h.embedder.load_content(
            "https://a.com/x",
            LoadOptions::new().on_success(move |loaded| {
                assert!(seen_return.load(Ordering::SeqCst));
                let _ = tx.send(loaded);
            }),
        );
        returned.store(true, Ordering::SeqCst);

        let second = rx.await.expect("delivered");
        assert!(Arc::ptr_eq(&first.response, &second.response));
        assert_eq!(h.provider.load_count(), 1);
        assert_eq!(h.slot.updates(), 2);
    }

    #[tokio::test]
    async fn concurrent_loads_share_one_aggregator() {
        let urls = ["https://a.com/1", "https://a.com/2", "https://a.com/3"];
        let provider = urls
            .iter()
            .fold(StubProvider::new(), |p, url| p.with_reply(*url, rich(url)));
        let h = harness(provider);

        let results =
            futures::future::join_all(urls.iter().map(|url| h.embedder.load(*url, false))).await;
        assert!(results.iter().all(Result::is_ok));

        let agg = h.embedder.aggregator().expect("aggregator");
        assert!(agg.is_finished());
        assert_eq!(agg.progress(), (3, 3));
        assert_eq!(progress_shows(&h.notifier), 1);
        assert_eq!(h.notifier.hidden(), vec![agg.notification().expect("shown")]);
    }

    #[tokio::test]
    async fn finished_aggregator_is_replaced() {
        let h = harness(
            StubProvider::new()
                .with_reply("https://a.com/1", rich("1"))
                .with_reply("https://a.com/2", rich("2")),
        );
        let mut events = h.embedder.subscribe();

        h.embedder.load("https://a.com/1", false).await.expect("first");
        h.embedder.load("https://a.com/2", false).await.expect("second");

        let mut created = 0;
        while let Ok(ev) = events.try_recv() {
            if ev.kind == EventKind::AggregatorCreated {
                created += 1;
            }
        }
        assert_eq!(created, 2);
        assert_eq!(progress_shows(&h.notifier), 2);
        assert_eq!(h.notifier.hidden().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn tasks_never_land_on_a_finished_aggregator() {
        let h = harness(StubProvider::new());
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let embedder = Arc::clone(&h.embedder);
                tokio::spawn(async move {
                    for _ in 0..250 {
                        embedder.create_task().done();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.await.expect("worker");
        }

        let mut hidden = Vec::new();
        for call in h.notifier.calls() {
            match call {
                Call::Update(id, ..) => assert!(!hidden.contains(&id), "{id:?} updated after hide"),
                Call::Hide(id) => hidden.push(id),
                Call::Show(..) => {}
            }
        }
        assert_eq!(hidden.len(), progress_shows(&h.notifier));
        assert!(h.embedder.aggregator().expect("aggregator").is_finished());
    }

    #[tokio::test]
    async fn transport_failure_cancels_task_and_warns() {
        let url = "https://down.example.com/a/very/long/path/to/video";
        let h = harness(StubProvider::new().with_reply(url, StubReply::Fail("refused".into())));

        let errors = Arc::new(AtomicUsize::new(0));
        let counted = errors.clone();
        let (tx, rx) = oneshot::channel();
        h.embedder.load_content(
            url,
            LoadOptions::new()
                .on_success(|_| panic!("success on a failed load"))
                .on_error(move |err| {
                    counted.fetch_add(1, Ordering::SeqCst);
                    let _ = tx.send(err);
                }),
        );

        let err = rx.await.expect("error callback");
        tokio::task::yield_now().await;
        assert_eq!(err.as_label(), "transport_load");
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(h.embedder.pending_requests(), 0);
        assert_eq!(h.embedder.attached_scripts(), 0);
        assert!(h.embedder.cached(url).is_none());
        assert_eq!(h.slot.current(), None);

        let agg = h.embedder.aggregator().expect("aggregator");
        assert!(agg.is_finished());
        assert_eq!(agg.progress(), (0, 0));
        assert_eq!(
            h.notifier.warnings(),
            vec!["Failed to fetch content for https://down.example.com/a/very/long/pat...."]
        );
    }

    #[tokio::test]
    async fn suppressed_notifications_skip_task_and_warning() {
        let h = harness(StubProvider::new().with_reply("https://a.com/x", StubReply::Status(500)));

        let err = h
            .embedder
            .load("https://a.com/x", true)
            .await
            .expect_err("status 500");
        assert_eq!(err.as_label(), "transport_status");
        assert!(h.embedder.aggregator().is_none());
        assert!(h.notifier.calls().is_empty());
    }

    #[tokio::test]
    async fn response_hook_supplies_markup() {
        let hook = |ctx: &mut ResponseContext<'_>| {
            let title = ctx.response["title"].as_str().unwrap_or_default();
            ctx.html = Some(format!("<figure>{title}</figure>"));
            HookOutcome::Continue
        };
        let h = harness_with(
            Config::default(),
            StubProvider::new().with_reply(
                "https://a.com/p",
                StubReply::Payload(json!({"type": "photo", "url": "i.png", "title": "Cat"})),
            ),
            |b| b.with_response_hook(Arc::new(hook)),
        );

        let loaded = h.embedder.load("https://a.com/p", false).await.expect("loaded");
        assert_eq!(loaded.html, "<figure>Cat</figure>");
        assert_eq!(h.slot.current().expect("content").html, "<figure>Cat</figure>");
    }

    #[tokio::test]
    async fn suppressing_response_hook_skips_content_but_reports_success() {
        let hook = |_: &mut ResponseContext<'_>| HookOutcome::Suppress;
        let h = harness_with(
            Config::default(),
            StubProvider::new()
                .with_reply("https://a.com/l", StubReply::Payload(json!({"type": "link"}))),
            |b| b.with_response_hook(Arc::new(hook)),
        );

        let loaded = h.embedder.load("https://a.com/l", false).await.expect("loaded");
        assert_eq!(loaded.html, "<a href=\"https://a.com/l\">https://a.com/l</a>");
        assert_eq!(h.slot.updates(), 0);
        assert!(h.embedder.cached("https://a.com/l").is_some());
    }

    #[tokio::test]
    async fn send_hook_adjusts_the_outgoing_request() {
        let cfg = Config {
            provider_url: "//p.example/oembed?url={url}&maxwidth={maxwidth}&callback={callback}"
                .into(),
            ..Config::default()
        };
        let hook = |req: &mut OutgoingRequest| {
            req.insert_param("maxwidth", "640");
            let canonical = req.url().replace("/short", "/long");
            req.set_url(canonical);
        };
        let h = harness_with(
            cfg,
            StubProvider::new().with_reply("https://a.com/long", rich("<i>long</i>")),
            |b| b.with_send_hook(Arc::new(hook)),
        );

        let loaded = h.embedder.load("https://a.com/short", false).await.expect("loaded");
        assert_eq!(loaded.url, "https://a.com/short");
        assert!(h.embedder.cached("https://a.com/short").is_some());
        assert!(h.embedder.cached("https://a.com/long").is_none());

        let src = &h.provider.loads()[0];
        assert!(src.starts_with(
            "//p.example/oembed?url=https%3A%2F%2Fa.com%2Flong&maxwidth=640&callback="
        ));
    }

    #[tokio::test]
    async fn silent_provider_keeps_the_request_pending() {
        let h = harness(StubProvider::new().with_reply("https://hang.example", StubReply::Silent));
        let mut events = h.embedder.subscribe();

        h.embedder.load_content(
            "https://hang.example",
            LoadOptions::new()
                .on_success(|_| panic!("no payload was sent"))
                .on_error(|_| panic!("the load did not fail")),
        );
        loop {
            if events.recv().await.expect("event").kind == EventKind::CallbackMissing {
                break;
            }
        }

        assert_eq!(h.embedder.pending_requests(), 1);
        assert_eq!(h.embedder.attached_scripts(), 1);
        assert!(!h.embedder.aggregator().expect("aggregator").is_finished());
    }

    #[tokio::test]
    async fn validation_combines_pattern_and_hook() {
        let veto = |url: &str| !url.contains("blocked.example");
        let h = harness_with(Config::default(), StubProvider::new(), |b| {
            b.with_validate_hook(Arc::new(veto))
        });

        assert!(h.embedder.is_url_valid("https://example.com/x"));
        assert!(h.embedder.is_url_valid("www.example.com"));
        assert!(h.embedder.is_url_valid("ftp://x.com/y"));
        assert!(!h.embedder.is_url_valid("not a url"));
        assert!(!h.embedder.is_url_valid("https://blocked.example/x"));
        assert_eq!(
            h.embedder.validate("not a url"),
            Err(LoadError::UnsupportedUrl {
                url: "not a url".into()
            })
        );
        assert_eq!(
            h.embedder.unsupported_message("not a url"),
            "The URL not a url is not supported."
        );
    }

    struct Forward(mpsc::UnboundedSender<EventKind>);

    #[async_trait]
    impl Subscribe for Forward {
        async fn on_event(&self, event: &Event) {
            let _ = self.0.send(event.kind);
        }
    }

    #[tokio::test]
    async fn subscribers_receive_load_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let h = harness_with(
            Config::default(),
            StubProvider::new().with_reply("https://a.com/x", rich("x")),
            |b| b.with_subscribers(vec![Arc::new(Forward(tx))]),
        );
        assert_eq!(h.embedder.subscriber_count(), 1);

        h.embedder.load("https://a.com/x", false).await.expect("loaded");
        loop {
            if rx.recv().await.expect("event") == EventKind::ContentSet {
                break;
            }
        }
    }
}
