//! Job processing with a concurrent worker.
//!
//! Demonstrates:
//! - Opening a worker with a closure processor
//! - Returning results and failing jobs
//!
//! Usage:
//!   cargo run --example worker
//!   cargo run --example worker -- --queue=emails --token=1234

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use bullmq_proxy_client::{BoxError, Result};
use common::Args;
use serde_json::{Value, json};

// ============================================================================
// Constants
// ============================================================================

const CONCURRENCY: u32 = 4;

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
    println!("=== Worker ===\n");

    let client = common::client(&args)?;
    let worker = client
        .dial_worker(&args.queue, CONCURRENCY, process)
        .await?;
    println!("[Setup] Processing '{}' with concurrency {CONCURRENCY}\n", args.queue);

    common::wait_for_exit().await;

    worker.close().await;
    println!("\n=== Done ===");
    Ok(())
}

// ============================================================================
// Processor
// ============================================================================

/// Receives the job's data as added by the producer, e.g. `{"index": 3}`.
async fn process(data: Value) -> std::result::Result<Value, BoxError> {
    println!("        → {data}");

    if data["fail"].as_bool() == Some(true) {
        return Err("job asked to fail".into());
    }

    tokio::time::sleep(Duration::from_millis(200)).await;
    Ok(json!({ "processed": data }))
}
