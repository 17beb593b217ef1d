//! Builder pattern for client configuration.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use bullmq_proxy_client::Client;
//!
//! # fn example() -> bullmq_proxy_client::Result<()> {
//! let client = Client::builder()
//!     .root_url("https://proxy.example.com")
//!     .auth_token("1234")
//!     .response_timeout(Duration::from_secs(5))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::TransportOptions;

use super::core::Client;
use super::options::{ClientOptions, DEFAULT_ROOT_URL};

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`Client`] instance.
///
/// Unset values fall back to their defaults:
///
/// | Setting | Default |
/// |---------|---------|
/// | root URL | `http://localhost:8080` |
/// | auth token | none |
/// | response timeout | 10 s |
/// | handshake timeout | 10 s |
#[derive(Debug, Default, Clone)]
pub struct ClientBuilder {
    /// Proxy root URL (`http`, `https`, `ws` or `wss`).
    pub(crate) root_url: Option<String>,

    /// Token sent with every handshake.
    pub(crate) auth_token: Option<String>,

    /// Per-request response timeout.
    pub(crate) response_timeout: Option<Duration>,

    /// WebSocket handshake timeout.
    pub(crate) handshake_timeout: Option<Duration>,
}

// ============================================================================
// Constructors
// ============================================================================

impl ClientBuilder {
    /// Creates a new builder with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// Configuration Methods
// ============================================================================

impl ClientBuilder {
    /// Sets the proxy root URL.
    ///
    /// `http`/`https` are mapped to `ws`/`wss` when endpoints are built.
    #[must_use]
    pub fn root_url(mut self, root_url: impl Into<String>) -> Self {
        self.root_url = Some(root_url.into());
        self
    }

    /// Sets the auth token.
    #[must_use]
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Sets how long each request waits for its response.
    #[must_use]
    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = Some(timeout);
        self
    }

    /// Sets how long to wait for the WebSocket handshake.
    #[must_use]
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = Some(timeout);
        self
    }
}

// ============================================================================
// Build
// ============================================================================

impl ClientBuilder {
    /// Builds the client.
    ///
    /// No connection is opened; each `dial_*` call opens its own.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if:
    /// - the root URL is invalid or has an unsupported scheme
    /// - the auth token is not a valid header value
    /// - a timeout is zero
    pub fn build(self) -> Result<Client> {
        let transport = self.validate_timeouts()?;
        let root_url = self.root_url.as_deref().unwrap_or(DEFAULT_ROOT_URL);
        let options = ClientOptions::new(root_url, self.auth_token, transport)?;

        Ok(Client::new(options))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    /// Validates the timeout configuration.
    fn validate_timeouts(&self) -> Result<TransportOptions> {
        let mut transport = TransportOptions::default();

        if let Some(timeout) = self.response_timeout {
            if timeout.is_zero() {
                return Err(Error::config("Response timeout must be greater than zero"));
            }
            transport = transport.with_response_timeout(timeout);
        }

        if let Some(timeout) = self.handshake_timeout {
            if timeout.is_zero() {
                return Err(Error::config("Handshake timeout must be greater than zero"));
            }
            transport = transport.with_handshake_timeout(timeout);
        }

        Ok(transport)
    }
}

// ============================================================================
// Tests
// ============================================================================
