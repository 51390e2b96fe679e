//! # Example: load_embed
//!
//! Loads several URLs through an in-memory provider and prints the markup.
//!
//! Shows how to:
//! - Build an [`Embedder`] with a [`StubProvider`], the [`LogWriter`] subscriber
//!   and a response hook.
//! - Validate URLs before loading them.
//! - Await concurrent loads sharing one progress notification.
//! - Hit the response cache on a repeated load.
//!
//! ## Flow
//! ```text
//! is_url_valid(url) ──► load(url)
//!     ├─► JsonpTransport ──► StubProvider ──► embedCallbacks[key](payload)
//!     ├─► Aggregator ──► TracingNotifier (progress, warning on failure)
//!     └─► render ──► ContentSlot
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example load_embed --features logging
//! ```

use std::sync::Arc;

use embedvisor::{
    Config, ContentSlot, Embedder, HookOutcome, LogWriter, ResponseContext, StubProvider,
    StubReply, Subscribe,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let provider = StubProvider::new()
        .with_reply(
            "https://example.com/cat.jpg",
            StubReply::Payload(json!({
                "type": "photo",
                "url": "https://example.com/cat.jpg",
                "title": "A cat & a hat"
            })),
        )
        .with_reply(
            "https://example.com/article",
            StubReply::Payload(json!({"type": "link", "title": "Article"})),
        )
        .with_reply(
            "https://video.example.com/watch?v=42",
            StubReply::Payload(json!({
                "type": "video",
                "html": "<iframe src=\"https://video.example.com/embed/42\"></iframe>"
            })),
        )
        .with_reply(
            "https://unreachable.example.com/some/rather/long/path/to/a/resource",
            StubReply::Fail("connection refused".into()),
        );

    // Wrap videos in a responsive container; leave everything else to the renderer.
    let wrap_videos = |ctx: &mut ResponseContext<'_>| {
        if ctx.response["type"] == "video" {
            let player = ctx.response["html"].as_str().unwrap_or_default();
            ctx.html = Some(format!("<div class=\"embed-responsive\">{player}</div>"));
        }
        HookOutcome::Continue
    };

    let slot = Arc::new(ContentSlot::new());
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let embedder = Embedder::builder(Config::default())
        .with_loader(Arc::new(provider))
        .with_content_sink(slot.clone())
        .with_subscribers(subs)
        .with_response_hook(Arc::new(wrap_videos))
        .build();

    let urls = [
        "https://example.com/cat.jpg",
        "https://example.com/article",
        "https://video.example.com/watch?v=42",
        "https://unreachable.example.com/some/rather/long/path/to/a/resource",
        "not a url",
    ];

    let valid: Vec<&str> = urls
        .iter()
        .copied()
        .filter(|url| {
            let ok = embedder.is_url_valid(url);
            if !ok {
                println!("[skip] {}", embedder.unsupported_message(url));
            }
            ok
        })
        .collect();

    let results =
        futures::future::join_all(valid.iter().map(|url| embedder.load(*url, false))).await;
    for (url, result) in valid.iter().zip(results) {
        match result {
            Ok(loaded) => println!("[ok]   {url}\n       {}", loaded.html),
            Err(err) => println!("[err]  {url}: {err} ({})", err.as_label()),
        }
    }

    // Second load of the same URL is answered from the cache.
    let again = embedder.load("https://example.com/cat.jpg", false).await?;
    println!("[hit]  {} (cached: {})", again.url, embedder.cached(&again.url).is_some());

    if let Some(content) = slot.current() {
        println!("[slot] {} ─► {}", content.url, content.html);
    }
    println!(
        "[done] pending requests: {}, attached scripts: {}",
        embedder.pending_requests(),
        embedder.attached_scripts()
    );

    // Let subscriber workers drain before exiting.
    tokio::task::yield_now().await;
    Ok(())
}
