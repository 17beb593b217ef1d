//! Error types for the BullMQ proxy client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use bullmq_proxy_client::{Client, Result};
//!
//! async fn example(client: &Client) -> Result<()> {
//!     let queue = client.dial_queue("emails").await?;
//!     queue.pause().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants | Scope |
//! |----------|----------|-------|
//! | Configuration | [`Error::Config`] | Client construction |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`] | Whole connection |
//! | Request | [`Error::Remote`], [`Error::RequestTimeout`], [`Error::Decode`] | One call |
//! | Framing | [`Error::Protocol`] | Whole connection |
//! | External | [`Error::Json`], [`Error::WebSocket`] | Varies |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::CorrelationId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Transport-level faults ([`Error::Protocol`], read failures) close the
/// connection and reach every pending caller as [`Error::ConnectionClosed`].
/// Request-level faults ([`Error::Remote`], [`Error::RequestTimeout`],
/// [`Error::Decode`]) only affect the call that produced them.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when client configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    ///
    /// Returned when the handshake fails, the target refuses the connection,
    /// or TLS/protocol negotiation fails. Never retried internally.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Handshake did not complete in time.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Connection closed while a request was pending or attempted.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Request Errors
    // ========================================================================
    /// The remote side reported a failure for a specific request.
    #[error("Remote error: {message}")]
    Remote {
        /// Error message reported by the server.
        message: String,
        /// Stack trace reported by the server (may be empty).
        stack: String,
    },

    /// No response arrived within the response window.
    #[error("Request {correlation_id} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// Correlation ID of the request that timed out.
        correlation_id: CorrelationId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// A payload could not be decoded into the expected shape.
    ///
    /// Local to one call; the connection stays open.
    #[error("Decode error: {message}")]
    Decode {
        /// Description of the decode failure.
        message: String,
    },

    // ========================================================================
    // Framing Errors
    // ========================================================================
    /// A frame could not be parsed as an envelope.
    ///
    /// Framing integrity cannot be recovered locally, so the connection is
    /// closed when this occurs in the read loop.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a remote error.
    #[inline]
    pub fn remote(message: impl Into<String>, stack: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
            stack: stack.into(),
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(correlation_id: CorrelationId, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            correlation_id,
            timeout_ms,
        }
    }

    /// Creates a decode error.
    #[inline]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::RequestTimeout { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if the server reported this failure.
    #[inline]
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors leave the connection usable; the same call may
    /// succeed on retry.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::RequestTimeout { .. } | Self::Remote { .. } | Self::Decode { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
