//! # JSONP transport: one cross-origin request per call.
//!
//! ## Flow
//! ```text
//! send_request(template, params, on_success, on_error)
//!   ├─► registry.allocate_with(key → handler)          slot embedCallbacks[key]
//!   ├─► src = template.output(encoded params + callback=slot name)
//!   ├─► attach script (tracked until removed)          publish ScriptAttached
//!   └─► spawn: loader.load(src)
//!         ├─ Err(e) ─► registry.release(key)?
//!         │             ├─ true  ─► remove script, publish TransportFailed, on_error(e)
//!         │             └─ false ─► (slot already settled) nothing
//!         └─ Ok(body) ─► execute body: every `name(payload)` → registry.resolve_slot
//!                          └─ handler: publish ResponseReceived
//!                                      └─ next tick: remove script, on_success(payload)
//! ```
//!
//! ## Rules
//! - Exactly one of `on_success` / `on_error` runs per request, never synchronously
//!   inside `send_request`.
//! - Success is always deferred one tick after the slot is invoked, even when the
//!   invocation happens during injection.
//! - No retry and no timeout: a resource that loads but never invokes its slot
//!   leaves the slot and the script attached (`CallbackMissing` is published).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use super::loader::ScriptLoader;
use super::registry::{CallbackKey, CallbackRegistry};
use super::script::parse_invocations;
use crate::error::TransportError;
use crate::events::{Bus, Event, EventKind};
use crate::template::{Params, Template};

/// Name of the request parameter carrying the slot name.
pub const CALLBACK_PARAM: &str = "callback";

/// Injected resources that are still attached, by slot.
type Scripts = Arc<Mutex<HashMap<CallbackKey, String>>>;

/// Cross-origin request transport over a [`CallbackRegistry`].
#[derive(Clone)]
pub struct JsonpTransport {
    registry: Arc<CallbackRegistry>,
    loader: Arc<dyn ScriptLoader>,
    scripts: Scripts,
    bus: Bus,
}

impl JsonpTransport {
    /// Creates a transport resolving through `registry` and fetching with `loader`.
    pub fn new(loader: Arc<dyn ScriptLoader>, registry: Arc<CallbackRegistry>, bus: Bus) -> Self {
        Self {
            registry,
            loader,
            scripts: Arc::new(Mutex::new(HashMap::new())),
            bus,
        }
    }

    /// The registry owning this transport's slots.
    pub fn registry(&self) -> &Arc<CallbackRegistry> {
        &self.registry
    }

    /// Number of injected resources not removed yet.
    pub fn attached_scripts(&self) -> usize {
        lock(&self.scripts).len()
    }

    /// Builds the final request URL: URL-encoded `params` plus the slot name.
    pub fn request_url(template: &Template, params: &Params, key: CallbackKey) -> String {
        let mut encoded: Params = params
            .iter()
            .map(|(name, value)| (name.clone(), urlencoding::encode(value).into_owned()))
            .collect();
        encoded.insert(
            CALLBACK_PARAM.to_string(),
            urlencoding::encode(&key.slot_name()).into_owned(),
        );
        template.output(&encoded)
    }

    /// Issues one request. Returns the slot key; the outcome arrives via the callbacks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn send_request<S, E>(
        &self,
        template: &Template,
        params: &Params,
        on_success: S,
        on_error: E,
    ) -> CallbackKey
    where
        S: FnOnce(Value) + Send + 'static,
        E: FnOnce(TransportError) + Send + 'static,
    {
        let key = self.registry.allocate_with(|key| {
            let scripts = Arc::clone(&self.scripts);
            let bus = self.bus.clone();
            move |payload: Value| {
                bus.publish(Event::new(EventKind::ResponseReceived).with_key(key.get()));
                tokio::spawn(async move {
                    remove_script(&scripts, &bus, key);
                    on_success(payload);
                });
            }
        });

        let src = Self::request_url(template, params, key);
        lock(&self.scripts).insert(key, src.clone());
        self.bus.publish(
            Event::new(EventKind::ScriptAttached)
                .with_url(src.as_str())
                .with_key(key.get()),
        );

        let this = self.clone();
        tokio::spawn(async move {
            match this.loader.load(&src).await {
                Ok(body) => this.execute(&body, key, &src),
                Err(err) => {
                    if this.registry.release(key) {
                        remove_script(&this.scripts, &this.bus, key);
                        this.bus.publish(
                            Event::new(EventKind::TransportFailed)
                                .with_url(src.as_str())
                                .with_key(key.get())
                                .with_reason(err.as_message()),
                        );
                        on_error(err);
                    }
                }
            }
        });

        key
    }

    /// Runs a loaded resource: routes each invocation to its slot.
    fn execute(&self, body: &str, key: CallbackKey, src: &str) {
        for invocation in parse_invocations(body) {
            if !self.registry.resolve_slot(&invocation.callee, invocation.payload) {
                self.bus.publish(
                    Event::new(EventKind::UnmatchedCallback).with_reason(invocation.callee),
                );
            }
        }

        if self.registry.contains(key) {
            tracing::warn!(key = key.get(), src, "provider script did not invoke its callback");
            self.bus.publish(
                Event::new(EventKind::CallbackMissing)
                    .with_url(src)
                    .with_key(key.get()),
            );
        }
    }
}

fn remove_script(scripts: &Scripts, bus: &Bus, key: CallbackKey) {
    if lock(scripts).remove(&key).is_some() {
        bus.publish(Event::new(EventKind::ScriptRemoved).with_key(key.get()));
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::stub::{StubProvider, StubReply};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    const TEMPLATE: &str = "//p.example/oembed?url={url}&callback={callback}";

    fn transport(provider: StubProvider) -> (JsonpTransport, Arc<StubProvider>) {
        let provider = Arc::new(provider);
        let t = JsonpTransport::new(
            provider.clone(),
            Arc::new(CallbackRegistry::default()),
            Bus::new(64),
        );
        (t, provider)
    }

    fn target(url: &str) -> Params {
        let mut params = Params::new();
        params.insert("url".into(), url.into());
        params
    }

    #[test]
    fn request_url_encodes_params_and_names_the_slot() {
        let key = CallbackRegistry::default().allocate(|_| {});
        let src = JsonpTransport::request_url(
            &Template::new(TEMPLATE),
            &target("https://a.com/v?x=1&y=2"),
            key,
        );
        assert_eq!(
            src,
            format!(
                concat!(
                    "//p.example/oembed?url=https%3A%2F%2Fa.com%2Fv%3Fx%3D1%26y%3D2",
                    "&callback=embedCallbacks%5B{}%5D",
                ),
                key
            )
        );
    }

    #[tokio::test]
    async fn success_runs_after_send_returns_and_cleans_up() {
        let (t, _) = transport(StubProvider::new().with_reply(
            "https://a.com/x",
            StubReply::Payload(json!({"type": "rich", "html": "<i>x</i>"})),
        ));
        let returned = Arc::new(AtomicBool::new(false));
        let (tx, rx) = oneshot::channel();

        let seen_return = returned.clone();
        let key = t.send_request(
            &Template::new(TEMPLATE),
            &target("https://a.com/x"),
            move |payload| {
                assert!(seen_return.load(Ordering::SeqCst));
                let _ = tx.send(payload);
            },
            |err| panic!("unexpected error: {err}"),
        );
        returned.store(true, Ordering::SeqCst);
        assert!(t.registry().contains(key));
        assert_eq!(t.attached_scripts(), 1);

        let payload = rx.await.expect("success");
        assert_eq!(payload["html"], "<i>x</i>");
        assert!(t.registry().is_empty());
        assert_eq!(t.attached_scripts(), 0);
    }

    #[tokio::test]
    async fn load_failure_releases_slot_and_reports_once() {
        let (t, _) = transport(
            StubProvider::new().with_reply("https://down", StubReply::Fail("refused".into())),
        );
        let (tx, rx) = oneshot::channel();

        t.send_request(
            &Template::new(TEMPLATE),
            &target("https://down"),
            |_| panic!("success on a failed load"),
            move |err| {
                let _ = tx.send(err);
            },
        );

        let err = rx.await.expect("error callback");
        assert_eq!(err.as_label(), "transport_load");
        assert!(t.registry().is_empty());
        assert_eq!(t.attached_scripts(), 0);
    }

    #[tokio::test]
    async fn duplicate_execution_delivers_once() {
        let (t, _) = transport(
            StubProvider::new()
                .with_reply("https://dup", StubReply::Twice(json!({"type": "link"}))),
        );
        let mut events = t.bus.subscribe();
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = oneshot::channel();

        let counted = calls.clone();
        t.send_request(
            &Template::new(TEMPLATE),
            &target("https://dup"),
            move |_| {
                counted.fetch_add(1, Ordering::SeqCst);
                let _ = tx.send(());
            },
            |_| panic!("error on a successful load"),
        );
        rx.await.expect("success");
        tokio::task::yield_now().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let mut unmatched = 0;
        while let Ok(ev) = events.try_recv() {
            if ev.kind == EventKind::UnmatchedCallback {
                unmatched += 1;
            }
        }
        assert_eq!(unmatched, 1);
    }

    #[tokio::test]
    async fn guarded_callback_is_delivered() {
        // A fresh registry issues key 1 first.
        let body = "/**/ typeof embedCallbacks[1] === 'function' && \
                    embedCallbacks[1]({\"type\":\"rich\",\"html\":\"<p>ok</p>\"});";
        let (t, _) = transport(
            StubProvider::new().with_reply("https://guarded", StubReply::Raw(body.into())),
        );
        let (tx, rx) = oneshot::channel();

        let key = t.send_request(
            &Template::new(TEMPLATE),
            &target("https://guarded"),
            move |payload| {
                let _ = tx.send(payload);
            },
            |err| panic!("unexpected error: {err}"),
        );
        assert_eq!(key.get(), 1);

        let payload = rx.await.expect("payload");
        assert_eq!(payload["html"], "<p>ok</p>");
        assert!(t.registry().is_empty());
        assert_eq!(t.attached_scripts(), 0);
    }

    #[tokio::test]
    async fn silent_provider_leaves_the_request_pending() {
        let (t, provider) =
            transport(StubProvider::new().with_reply("https://hang", StubReply::Silent));
        let mut events = t.bus.subscribe();

        let key = t.send_request(
            &Template::new(TEMPLATE),
            &target("https://hang"),
            |_| panic!("no payload was sent"),
            |_| panic!("the load did not fail"),
        );

        loop {
            let ev = events.recv().await.expect("event");
            if ev.kind == EventKind::CallbackMissing {
                assert_eq!(ev.key, Some(key.get()));
                break;
            }
        }
        assert_eq!(provider.load_count(), 1);
        assert!(t.registry().contains(key));
        assert_eq!(t.attached_scripts(), 1);
    }

    #[tokio::test]
    async fn concurrent_requests_use_distinct_slots() {
        let provider = (0..8).fold(StubProvider::new(), |p, i| {
            p.with_reply(format!("https://a.com/{i}"), StubReply::Payload(json!({"n": i})))
        });
        let (t, _) = transport(provider);

        let mut keys = Vec::new();
        let mut waits = Vec::new();
        for i in 0..8 {
            let (tx, rx) = oneshot::channel();
            keys.push(t.send_request(
                &Template::new(TEMPLATE),
                &target(&format!("https://a.com/{i}")),
                move |payload| {
                    let _ = tx.send(payload);
                },
                |err| panic!("unexpected error: {err}"),
            ));
            waits.push((i, rx));
        }

        let mut sorted = keys.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), keys.len());

        for (i, rx) in waits {
            assert_eq!(rx.await.expect("payload")["n"], i);
        }
        assert!(keys.iter().all(|k| !t.registry().contains(*k)));
        assert_eq!(t.attached_scripts(), 0);
    }
}
