//! Shared utilities for demos.
//!
//! Provides common functionality used across all demos:
//! - Command-line argument parsing
//! - Logging initialization
//! - Client construction

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use bullmq_proxy_client::{Client, Result};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments for demos.
///
/// `--url=<root>`, `--token=<token>`, `--queue=<name>`, `--debug`.
#[derive(Debug, Clone)]
pub struct Args {
    pub debug: bool,
    pub url: String,
    pub token: Option<String>,
    pub queue: String,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let value = |key: &str| {
            args.iter()
                .find_map(|a| a.strip_prefix(key).map(str::to_owned))
        };

        Self {
            debug: args.iter().any(|a| a == "--debug"),
            url: value("--url=").unwrap_or_else(|| "http://localhost:8080".to_owned()),
            token: value("--token="),
            queue: value("--queue=").unwrap_or_else(|| "demo".to_owned()),
        }
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Initialize tracing/logging.
pub fn init_logging(debug: bool) {
    let filter = if debug {
        "bullmq_proxy_client=debug"
    } else {
        "bullmq_proxy_client=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

/// Build a client from the parsed arguments.
pub fn client(args: &Args) -> Result<Client> {
    let mut builder = Client::builder().root_url(&args.url);
    if let Some(token) = &args.token {
        builder = builder.auth_token(token);
    }
    builder.build()
}

/// Wait for Ctrl+C.
pub async fn wait_for_exit() {
    println!("Press Ctrl+C to exit...");
    tokio::signal::ctrl_c().await.ok();
}
