//! WebSocket transport layer.
//!
//! This module multiplexes request/response calls and server pushes over a
//! single WebSocket connection to the proxy.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐                    ┌─────────────────┐
//! │  callers (many tasks)    │                    │  BullMQ proxy   │
//! │    │ send / respond      │     WebSocket      │                 │
//! │    ▼                     │  {"id", "data"}    │                 │
//! │  Transport ── writer ────┼───────────────────►│                 │
//! │    ▲                     │                    │                 │
//! │    │ waiters / pushes    │                    │                 │
//! │  read loop ◄─────────────┼────────────────────│                 │
//! └──────────────────────────┘                    └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Transport::connect` - Handshake and spawn the read loop
//! 2. `Transport::send` / `Channel::request` - Correlated requests
//! 3. `Transport::receive_next` / `Channel::receive` - Server pushes
//! 4. `Transport::close` - Fail pending requests and release the socket
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Connection, waiter registry and read loop |
//! | `channel` | Typed request/push channel |

// ============================================================================
// Submodules
// ============================================================================

/// Typed channel over a transport.
pub mod channel;

/// WebSocket connection and read loop.
pub mod connection;

// ============================================================================
// Re-exports
// ============================================================================

pub use channel::Channel;
pub use connection::{ConnectionState, Transport, TransportOptions};
