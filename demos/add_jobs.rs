//! Queue commands over one multiplexed connection.
//!
//! Demonstrates:
//! - Adding jobs concurrently
//! - Adding a delayed job with options
//! - Reading job counts and job lists
//! - Writing and reading job logs
//!
//! Usage:
//!   cargo run --example add_jobs
//!   cargo run --example add_jobs -- --url=http://localhost:8080 --token=1234
//!   cargo run --example add_jobs -- --queue=emails --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use bullmq_proxy_client::{JobOptions, JobState, Result};
use common::Args;
use serde_json::json;

// ============================================================================
// Constants
// ============================================================================

const JOB_COUNT: usize = 10;

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
    println!("=== Add Jobs ===\n");

    let client = common::client(&args)?;
    let queue = client.dial_queue(&args.queue).await?;
    println!("[Setup] Connected to queue '{}'\n", args.queue);

    // ========================================================================
    // Concurrent Adds
    // ========================================================================

    println!("[1] Adding {JOB_COUNT} jobs concurrently...");
    let adds: Vec<_> = (0..JOB_COUNT)
        .map(|i| {
            let queue = queue.clone();
            async move { queue.add("greeting", &json!({ "index": i }), None).await }
        })
        .collect();

    for job in futures_util::future::try_join_all(adds).await? {
        println!("        ✓ job {:?}", job.id);
    }

    // ========================================================================
    // Delayed Job
    // ========================================================================

    println!("\n[2] Adding a delayed job...");
    let opts = JobOptions {
        delay: Some(5_000),
        attempts: Some(3),
        ..Default::default()
    };
    let delayed = queue.add("reminder", &json!({ "in": "5s" }), Some(&opts)).await?;
    println!("        ✓ job {:?} delayed by {} ms", delayed.id, delayed.delay);

    // ========================================================================
    // Inspection
    // ========================================================================

    println!("\n[3] Job counts:");
    let counts = queue
        .get_job_counts(&[JobState::Waiting, JobState::Delayed, JobState::Completed])
        .await?;
    for (state, count) in &counts {
        println!("        {state}: {count}");
    }

    println!("\n[4] First waiting jobs:");
    for job in queue.get_jobs(JobState::Waiting, 0, 4, true).await? {
        println!("        {:?} {} {}", job.id, job.name, job.data);
    }

    // ========================================================================
    // Logs
    // ========================================================================

    if let Some(job_id) = delayed.id.as_deref() {
        println!("\n[5] Job logs for {job_id}:");
        queue.add_job_log(job_id, "scheduled by add_jobs demo", None).await?;
        let logs = queue.get_job_logs(job_id, None, None).await?;
        for row in &logs.logs {
            println!("        {row}");
        }
    }

    queue.close().await;
    println!("\n=== Done ===");
    Ok(())
}
