//! Queue event subscription.
//!
//! Demonstrates:
//! - Subscribing to a subset of queue events
//! - Reading events until Ctrl+C
//!
//! Usage:
//!   cargo run --example queue_events
//!   cargo run --example queue_events -- --queue=emails --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use bullmq_proxy_client::{Error, Result};
use common::Args;

// ============================================================================
// Constants
// ============================================================================

const EVENTS: &[&str] = &["added", "active", "completed", "failed", "progress"];

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== Queue Events ===\n");

    let client = common::client(&args)?;
    let events = client.dial_queue_events(&args.queue, EVENTS).await?;
    println!("[Setup] Listening on '{}' for {EVENTS:?}\n", args.queue);

    loop {
        tokio::select! {
            event = events.next_event() => match event {
                Ok(event) => println!("        {} job={:?}", event.event, event.job_id()),
                Err(Error::Decode { message }) => println!("        [skip] {message}"),
                Err(e) => return Err(e),
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    events.close().await;
    println!("\n=== Done ===");
    Ok(())
}
