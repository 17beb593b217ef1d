//! Typed channel over a [`Transport`].
//!
//! A [`Channel`] fixes the command type sent with requests and the push type
//! received from the server, and decodes raw results into caller-chosen
//! shapes. It holds no state of its own.
//!
//! Decode failures here are local to one call ([`Error::Decode`]); they never
//! close the connection.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::CorrelationId;
use crate::protocol::Envelope;

use super::connection::{ConnectionState, Transport};

// ============================================================================
// Channel
// ============================================================================

/// Typed request/response and push channel.
///
/// - `C` is the command type carried by requests
/// - `P` is the push type returned by [`receive`](Self::receive)
///
/// # Example
///
/// ```ignore
/// let channel: Channel<QueueCommand> = Channel::new(transport);
/// let job: Job = channel.request(&QueueCommand::add("job1", data, Value::Null)).await?;
/// ```
pub struct Channel<C, P = Value> {
    transport: Transport,
    _marker: PhantomData<fn(C) -> P>,
}

impl<C, P> Clone for Channel<C, P> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            _marker: PhantomData,
        }
    }
}

impl<C, P> fmt::Debug for Channel<C, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("transport", &self.transport)
            .finish()
    }
}

impl<C, P> Channel<C, P> {
    /// Wraps a transport.
    #[inline]
    #[must_use]
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            _marker: PhantomData,
        }
    }

    /// Returns the underlying transport.
    #[inline]
    #[must_use]
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Returns the connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.transport.state()
    }

    /// Answers a push.
    ///
    /// # Errors
    ///
    /// See [`Transport::respond`].
    pub async fn respond<R>(&self, id: CorrelationId, reply: &R) -> Result<()>
    where
        R: Serialize + ?Sized,
    {
        self.transport.respond(id, reply).await
    }

    /// Closes the connection.
    pub async fn close(&self) {
        self.transport.close().await;
    }
}

impl<C, P> Channel<C, P>
where
    C: Serialize,
{
    /// Sends a command and decodes its result into `R`.
    ///
    /// # Errors
    ///
    /// - [`Error::Decode`] if the result does not match `R`
    /// - anything [`Transport::send`] returns
    pub async fn request<R>(&self, command: &C) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let raw = self.transport.send(command).await?;
        decode(raw.get())
    }

    /// Like [`request`](Self::request) with an explicit response timeout.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn request_with_timeout<R>(&self, command: &C, response_timeout: Duration) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let raw = self
            .transport
            .send_with_timeout(command, response_timeout)
            .await?;
        decode(raw.get())
    }
}

impl<C, P> Channel<C, P>
where
    P: DeserializeOwned,
{
    /// Waits for the next push and decodes it into `P`.
    ///
    /// # Errors
    ///
    /// - [`Error::Decode`] if the push does not match `P`; the push is
    ///   consumed and the channel stays usable
    /// - [`Error::ConnectionClosed`] once the connection is closed
    pub async fn receive(&self) -> Result<Envelope<P>> {
        let push = self.transport.receive_next().await?;
        let data = decode(push.raw_data())?;
        Ok(Envelope::new(push.id, data))
    }
}

/// Decodes a raw JSON payload.
fn decode<T: DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|e| Error::decode(e.to_string()))
}

// ============================================================================
// Tests
// ============================================================================
