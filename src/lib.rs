//! BullMQ proxy client - multiplexed WebSocket access to BullMQ queues.
//!
//! This library talks to a BullMQ proxy over WebSocket. Every connection
//! carries JSON envelopes `{"id", "data"}` and multiplexes any number of
//! concurrent requests over one socket.
//!
//! # Architecture
//!
//! - **Local End (Rust)**: Sends queue commands, answers worker pushes,
//!   receives queue events
//! - **Remote End (Proxy)**: Runs the BullMQ queue, pushes jobs and events
//!
//! Key design principles:
//!
//! - One [`Transport`](transport::Transport) per connection, one reader task
//!   per transport
//! - Responses are matched to callers by correlation ID, in any order
//! - Every request completes exactly once: result, remote error, timeout or
//!   connection closed
//! - Unmatched inbound frames are server pushes, delivered in arrival order
//!
//! # Quick Start
//!
//! ```no_run
//! use bullmq_proxy_client::{BoxError, Client, Result};
//! use serde_json::{Value, json};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::builder()
//!         .root_url("http://localhost:8080")
//!         .auth_token("1234")
//!         .build()?;
//!
//!     // Add a job
//!     let queue = client.dial_queue("emails").await?;
//!     let job = queue.add("welcome", &json!({ "to": "a@b.c" }), None).await?;
//!     println!("added job {:?}", job.id);
//!
//!     // Process jobs; the processor receives each job's data
//!     let worker = client
//!         .dial_worker("emails", 4, |job: Value| async move {
//!             Ok::<_, BoxError>(json!({ "sent": job["to"] }))
//!         })
//!         .await?;
//!
//!     worker.close().await;
//!     queue.close().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Client factory and configuration |
//! | [`queue`] | [`Queue`], [`Worker`], [`QueueEvents`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | WebSocket message types |
//! | [`transport`] | Multiplexed WebSocket transport |
//!
//! # Features
//!
//! - **Multiplexed**: thousands of in-flight requests on one socket
//! - **Cancellation-safe**: dropping a pending call frees its slot
//! - **TLS**: `wss://` via the `rustls` feature

// ============================================================================
// Modules
// ============================================================================

/// Client factory and configuration.
///
/// Use [`Client::builder()`] to create a configured client.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// WebSocket protocol message types.
///
/// Envelopes, queue commands, worker pushes and queue events.
pub mod protocol;

/// Queue, worker and event connections.
pub mod queue;

/// WebSocket transport layer.
///
/// Request/response correlation and push delivery over one connection.
pub mod transport;

#[cfg(test)]
mod testing;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{Client, ClientBuilder, ClientOptions};

// Queue types
pub use queue::{BoxError, Processor, Queue, QueueEvents, Worker};

// Protocol types
pub use protocol::{Job, JobLogs, JobOptions, JobState, QueueEvent};

// Transport types
pub use transport::{ConnectionState, Transport, TransportOptions};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::CorrelationId;
