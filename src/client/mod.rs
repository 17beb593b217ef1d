//! Client module.
//!
//! This module provides the main entry point for talking to a BullMQ proxy.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Client`] | Factory for queue, worker and event connections |
//! | [`ClientBuilder`] | Fluent configuration builder |
//! | [`ClientOptions`] | Resolved configuration and endpoint URLs |
//!
//! # Example
//!
//! ```no_run
//! use bullmq_proxy_client::{Client, Result};
//!
//! # async fn example() -> Result<()> {
//! let client = Client::builder()
//!     .root_url("http://localhost:8080")
//!     .auth_token("1234")
//!     .build()?;
//!
//! let queue = client.dial_queue("emails").await?;
//! queue.pause().await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for client configuration.
pub mod builder;

/// Core client implementation.
pub mod core;

/// Resolved configuration and endpoint construction.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use core::Client;
pub use options::{ClientOptions, DEFAULT_ROOT_URL};
