//! Queue event subscription.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;

use crate::error::Result;
use crate::protocol::QueueEvent;
use crate::transport::{Channel, ConnectionState};

// ============================================================================
// QueueEvents
// ============================================================================

/// Connection to `/queues/{queue}/events`.
///
/// Events arrive as pushes in the order the proxy sends them.
///
/// # Example
///
/// ```no_run
/// # use bullmq_proxy_client::{Client, Error};
/// # async fn example(client: &Client) -> bullmq_proxy_client::Result<()> {
/// let events = client.dial_queue_events("emails", &["completed", "failed"]).await?;
///
/// loop {
///     match events.next_event().await {
///         Ok(event) => println!("{} {:?}", event.event, event.job_id()),
///         // One malformed event; the stream goes on.
///         Err(Error::Decode { .. }) => continue,
///         Err(_) => break,
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct QueueEvents {
    channel: Channel<Value, QueueEvent>,
}

impl QueueEvents {
    /// Wraps an events channel.
    #[inline]
    #[must_use]
    pub fn new(channel: Channel<Value, QueueEvent>) -> Self {
        Self { channel }
    }

    /// Returns the connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.channel.state()
    }

    /// Waits for the next event.
    ///
    /// # Errors
    ///
    /// - [`Error::Decode`](crate::Error::Decode) if a push is not an event;
    ///   later events are still delivered
    /// - [`Error::ConnectionClosed`](crate::Error::ConnectionClosed) once the
    ///   connection is closed
    pub async fn next_event(&self) -> Result<QueueEvent> {
        Ok(self.channel.receive().await?.data)
    }

    /// Closes the connection.
    pub async fn close(&self) {
        self.channel.close().await;
    }
}

// ============================================================================
// Tests
// ============================================================================
