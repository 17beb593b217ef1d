//! WebSocket protocol message types.
//!
//! This module defines the frames exchanged with the BullMQ proxy.
//!
//! # Protocol Overview
//!
//! Every frame is one JSON document `{"id": <int>, "data": <any>}`:
//!
//! | Message | Direction | `data` |
//! |---------|-----------|--------|
//! | Request | Local → Proxy | [`QueueCommand`] |
//! | Response | Proxy → Local | [`ResultBody`] (`ok` / `err`) |
//! | Push | Proxy → Local | [`WorkerCommand`], [`QueueEvent`] |
//! | Reply | Local → Proxy | [`WorkerReply`] |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `envelope` | Envelope and result body types |
//! | `command` | Queue and worker commands |
//! | `event` | Queue event pushes |
//! | `job` | Job records and options |

// ============================================================================
// Submodules
// ============================================================================

/// Queue and worker command definitions.
pub mod command;

/// Envelope and result message types.
pub mod envelope;

/// Queue event message types.
pub mod event;

/// Job records and options.
pub mod job;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{QueueCommand, QueueFn, WorkerCommand, WorkerReply};
pub use envelope::{Envelope, ErrorDetail, RawEnvelope, RemoteFailure, ResultBody};
pub use event::QueueEvent;
pub use job::{Job, JobLogs, JobOptions, JobState};
