//! Connect, query status, evaluate an expression, end the session.
//!
//! Demonstrates:
//! - Connecting with a validated builder
//! - `session.status`
//! - Listing browsing contexts and evaluating script in one
//! - Printing console entries from `log.entryAdded`
//!
//! Usage:
//!   cargo run --example session_status -- ws://127.0.0.1:9222/session
//!   cargo run --example session_status -- ws://127.0.0.1:9222/session --debug

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use bidi_webdriver::modules::script::{EvaluateParameters, Target};
use bidi_webdriver::{BiDi, SubscriptionOptions};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    init_logging(args.iter().any(|a| a == "--debug"));

    let url = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .cloned()
        .unwrap_or_else(|| "ws://127.0.0.1:9222/session".to_owned());

    if let Err(e) = run(&url).await {
        eprintln!("\n[ERROR] {e:#}");
        std::process::exit(1);
    }
}

async fn run(url: &str) -> Result<()> {
    println!("=== session_status ===\n");

    let bidi = BiDi::builder()
        .url(url)
        .command_timeout(Duration::from_secs(10))
        .connect()
        .await
        .with_context(|| format!("connecting to {url}"))?;

    let status = bidi.status().await?;
    println!("[Status] ready={} message={:?}", status.ready, status.message);

    let mut entries = bidi.log().on_entry_added(SubscriptionOptions::default()).await?;

    let tree = bidi.browsing_context().get_tree(Default::default()).await?;
    let context = tree
        .first()
        .map(|info| info.context.clone())
        .context("remote end has no browsing context")?;
    println!("[Context] {context}");

    let result = bidi
        .script()
        .evaluate(EvaluateParameters::new(
            "console.log('hello from bidi'); 6 * 7",
            Target::context(context),
        ))
        .await?
        .into_value()?;
    println!("[Evaluate] {:?}", result.as_f64());

    if let Ok(Some(entry)) = tokio::time::timeout(Duration::from_secs(2), entries.recv()).await {
        println!("[Console] {:?}", entry?.text());
    }

    entries.unsubscribe().await?;
    bidi.end().await?;
    println!("\n[Done]");
    Ok(())
}

/// Initialize tracing/logging.
fn init_logging(debug: bool) {
    let filter = if debug {
        "bidi_webdriver=debug"
    } else {
        "bidi_webdriver=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}
