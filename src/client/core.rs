//! Proxy client and connection factory.
//!
//! The [`Client`] holds validated configuration only. Each `dial_*` call
//! opens an independent WebSocket connection to one proxy endpoint.
//!
//! # Example
//!
//! ```no_run
//! use bullmq_proxy_client::Client;
//! use serde_json::json;
//!
//! # async fn example() -> bullmq_proxy_client::Result<()> {
//! let client = Client::builder().auth_token("1234").build()?;
//!
//! let queue = client.dial_queue("emails").await?;
//! let job = queue.add("welcome", &json!({ "to": "a@b.c" }), None).await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tracing::debug;
use url::Url;

use crate::error::Result;
use crate::queue::{Processor, Queue, QueueEvents, Worker};
use crate::transport::{Channel, Transport};

use super::builder::ClientBuilder;
use super::options::ClientOptions;

// ============================================================================
// Client
// ============================================================================

/// BullMQ proxy client.
///
/// Cheap to clone; clones share configuration.
#[derive(Clone)]
pub struct Client {
    /// Shared configuration.
    options: Arc<ClientOptions>,
}

// ============================================================================
// Client - Display
// ============================================================================

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("root_url", &self.options.root_url().as_str())
            .field("authenticated", &self.options.auth_token().is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Client - Public API
// ============================================================================

impl Client {
    /// Creates a configuration builder for the client.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Wraps validated options.
    pub(crate) fn new(options: ClientOptions) -> Self {
        Self {
            options: Arc::new(options),
        }
    }

    /// Returns the resolved configuration.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Opens a connection to the queue command endpoint.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`](crate::Error::Config) if `queue_name` is empty
    /// - any connection error from [`Transport::connect_with_options`]
    pub async fn dial_queue(&self, queue_name: &str) -> Result<Queue> {
        let url = self.options.queue_url(queue_name)?;
        let transport = self.dial(&url).await?;
        Ok(Queue::new(Channel::new(transport)))
    }

    /// Opens a worker connection and starts processing jobs.
    ///
    /// The proxy pushes up to `concurrency` jobs at a time; each is handed to
    /// `processor` on its own task.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`](crate::Error::Config) if `queue_name` is empty or
    ///   `concurrency` is zero
    /// - any connection error from [`Transport::connect_with_options`]
    pub async fn dial_worker<F>(
        &self,
        queue_name: &str,
        concurrency: u32,
        processor: F,
    ) -> Result<Worker>
    where
        F: Processor,
    {
        let url = self.options.worker_url(queue_name, concurrency)?;
        let transport = self.dial(&url).await?;
        Ok(Worker::start(Channel::new(transport), processor))
    }

    /// Opens a connection that receives the listed queue events.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`](crate::Error::Config) if `queue_name` is empty
    /// - any connection error from [`Transport::connect_with_options`]
    pub async fn dial_queue_events(&self, queue_name: &str, events: &[&str]) -> Result<QueueEvents> {
        let url = self.options.events_url(queue_name, events)?;
        let transport = self.dial(&url).await?;
        Ok(QueueEvents::new(Channel::new(transport)))
    }

    /// Opens a raw transport to an endpoint URL.
    async fn dial(&self, url: &Url) -> Result<Transport> {
        debug!(path = url.path(), "Dialing proxy endpoint");
        Transport::connect_with_options(url.as_str(), self.options.headers(), self.options.transport())
            .await
    }
}

// ============================================================================
// Tests
// ============================================================================
