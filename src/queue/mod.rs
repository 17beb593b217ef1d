//! Queue-level API built on the transport.
//!
//! # Components
//!
//! | Type | Endpoint | Role |
//! |------|----------|------|
//! | [`Queue`] | `/queues/{queue}` | Issues queue methods |
//! | [`Worker`] | `/queues/{queue}/process/{n}` | Answers process pushes |
//! | [`QueueEvents`] | `/queues/{queue}/events` | Receives event pushes |
//!
//! Each value owns one connection. Open them with
//! [`Client`](crate::Client).

// ============================================================================
// Submodules
// ============================================================================

/// Queue event subscription.
pub mod events;

/// Queue command connection.
pub mod producer;

/// Worker connection and job processing.
pub mod worker;

// ============================================================================
// Re-exports
// ============================================================================

pub use events::QueueEvents;
pub use producer::Queue;
pub use worker::{BoxError, Processor, Worker};
