//! Resolved client configuration and endpoint construction.
//!
//! # Endpoints
//!
//! | Connection | Path | Query |
//! |------------|------|-------|
//! | Queue | `/queues/{queue}` | `token` |
//! | Worker | `/queues/{queue}/process/{concurrency}` | `token` |
//! | Events | `/queues/{queue}/events` | `token`, `events` |
//!
//! The token travels both as a `token` query parameter and as an
//! `Authorization: Bearer` handshake header.

// ============================================================================
// Imports
// ============================================================================

use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::{HeaderMap, HeaderValue};
use url::Url;

use crate::error::{Error, Result};
use crate::transport::TransportOptions;

// ============================================================================
// Constants
// ============================================================================

/// Root URL used when none is configured.
pub const DEFAULT_ROOT_URL: &str = "http://localhost:8080";

// ============================================================================
// ClientOptions
// ============================================================================

/// Validated client configuration.
///
/// Built by [`ClientBuilder::build`](super::ClientBuilder::build).
#[derive(Debug, Clone)]
pub struct ClientOptions {
    root_url: Url,
    auth_token: Option<String>,
    headers: HeaderMap,
    transport: TransportOptions,
}

impl ClientOptions {
    /// Validates and assembles the configuration.
    ///
    /// `http`/`https` roots are mapped to `ws`/`wss`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL cannot be parsed, uses an
    /// unsupported scheme, or the token is not a valid header value.
    pub(crate) fn new(
        root_url: &str,
        auth_token: Option<String>,
        transport: TransportOptions,
    ) -> Result<Self> {
        let root_url = websocket_root(root_url)?;
        let headers = handshake_headers(auth_token.as_deref())?;

        Ok(Self {
            root_url,
            auth_token,
            headers,
            transport,
        })
    }

    /// Returns the WebSocket root URL.
    #[inline]
    #[must_use]
    pub fn root_url(&self) -> &Url {
        &self.root_url
    }

    /// Returns the auth token, if any.
    #[inline]
    #[must_use]
    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    /// Returns the headers sent with every handshake.
    #[inline]
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the transport settings.
    #[inline]
    #[must_use]
    pub fn transport(&self) -> TransportOptions {
        self.transport
    }

    // ========================================================================
    // Endpoints
    // ========================================================================

    /// URL of the queue command endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `queue_name` is empty.
    pub fn queue_url(&self, queue_name: &str) -> Result<Url> {
        validate_queue_name(queue_name)?;
        self.endpoint(&["queues", queue_name], &[])
    }

    /// URL of the worker endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `queue_name` is empty or `concurrency`
    /// is zero.
    pub fn worker_url(&self, queue_name: &str, concurrency: u32) -> Result<Url> {
        validate_queue_name(queue_name)?;
        if concurrency == 0 {
            return Err(Error::config("Worker concurrency must be at least 1"));
        }

        let concurrency = concurrency.to_string();
        self.endpoint(&["queues", queue_name, "process", &concurrency], &[])
    }

    /// URL of the queue events endpoint.
    ///
    /// An empty `events` list subscribes to nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `queue_name` is empty.
    pub fn events_url(&self, queue_name: &str, events: &[&str]) -> Result<Url> {
        validate_queue_name(queue_name)?;
        let events = events.join(",");
        self.endpoint(&["queues", queue_name, "events"], &[("events", &events)])
    }

    /// Appends path segments and query pairs to the root URL.
    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.root_url.clone();

        url.path_segments_mut()
            .map_err(|()| Error::config(format!("Root URL cannot be a base: {}", self.root_url)))?
            .pop_if_empty()
            .extend(segments);

        if self.auth_token.is_some() || !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            if let Some(token) = &self.auth_token {
                pairs.append_pair("token", token);
            }
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Parses the root URL and maps it to a WebSocket scheme.
fn websocket_root(raw: &str) -> Result<Url> {
    let mut url =
        Url::parse(raw).map_err(|e| Error::config(format!("Invalid root URL '{raw}': {e}")))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(Error::config(format!(
                "Unsupported root URL scheme '{other}'. Use http, https, ws or wss."
            )));
        }
    };

    url.set_scheme(scheme)
        .map_err(|()| Error::config(format!("Cannot use scheme '{scheme}' for '{raw}'")))?;

    Ok(url)
}

/// Builds the handshake headers for an optional token.
fn handshake_headers(auth_token: Option<&str>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    if let Some(token) = auth_token {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| Error::config(format!("Auth token is not a valid header value: {e}")))?;
        headers.insert(AUTHORIZATION, value);
    }

    Ok(headers)
}

fn validate_queue_name(queue_name: &str) -> Result<()> {
    if queue_name.is_empty() {
        return Err(Error::config("Queue name must not be empty"));
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
