//! Worker connection and job processing.
//!
//! The proxy pushes `{"type": "process", "payload": data}` commands, where
//! `data` is the job's data as the producer added it. The worker runs each
//! through a [`Processor`] on its own task and replies under the push's ID
//! with `{"result": ...}` or `{"err": {...}}`.
//!
//! Unknown command types and undecodable pushes are logged and skipped.
//! The listener stops when the connection closes.

// ============================================================================
// Imports
// ============================================================================

use std::error::Error as StdError;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};

use crate::error::Error;
use crate::identifiers::CorrelationId;
use crate::protocol::{Envelope, WorkerCommand, WorkerReply};
use crate::transport::{Channel, ConnectionState};

// ============================================================================
// Processor
// ============================================================================

/// Error type returned by processors.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Handles one job at a time.
///
/// The input is the job's `data` exactly as it was added, not the full job
/// record: the proxy pushes only the data, so `job["to"]` reads a field the
/// producer set with `queue.add("welcome", &json!({ "to": ... }), None)`.
///
/// Implemented for any `Fn(Value) -> impl Future<Output = Result<Value, BoxError>>`,
/// so plain async closures work:
///
/// ```no_run
/// # use bullmq_proxy_client::{BoxError, Client};
/// # use serde_json::{Value, json};
/// # async fn example(client: &Client) -> bullmq_proxy_client::Result<()> {
/// let worker = client
///     .dial_worker("emails", 4, |job: Value| async move {
///         Ok::<_, BoxError>(json!({ "sent": job["to"] }))
///     })
///     .await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Processor: Send + Sync + 'static {
    /// Processes a job's data and returns its result.
    async fn process(&self, job: Value) -> Result<Value, BoxError>;
}

#[async_trait]
impl<F, Fut> Processor for F
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
{
    async fn process(&self, job: Value) -> Result<Value, BoxError> {
        (self)(job).await
    }
}

// ============================================================================
// Worker
// ============================================================================

/// Connection to `/queues/{queue}/process/{concurrency}`.
///
/// The listener task runs until the connection closes or
/// [`close`](Self::close) is called.
#[derive(Debug)]
pub struct Worker {
    channel: Channel<Value, WorkerCommand>,
    listener: JoinHandle<()>,
}

impl Worker {
    /// Starts listening for process commands on `channel`.
    #[must_use]
    pub fn start<F>(channel: Channel<Value, WorkerCommand>, processor: F) -> Self
    where
        F: Processor,
    {
        let processor: Arc<dyn Processor> = Arc::new(processor);
        let listener = tokio::spawn(Self::listen(channel.clone(), processor));

        Self { channel, listener }
    }

    /// Returns the connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.channel.state()
    }

    /// Returns `true` while the listener is running.
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.listener.is_finished()
    }

    /// Closes the connection and waits for the listener to stop.
    ///
    /// Jobs still being processed finish, but their replies are dropped.
    pub async fn close(self) {
        self.channel.close().await;

        if let Err(e) = self.listener.await {
            warn!(error = %e, "Worker listener ended abnormally");
        }
    }

    /// Dispatches pushes until the connection closes.
    async fn listen(channel: Channel<Value, WorkerCommand>, processor: Arc<dyn Processor>) {
        debug!("Worker listener started");

        loop {
            match channel.receive().await {
                Ok(Envelope { id, data: command }) if command.is_process() => {
                    let channel = channel.clone();
                    let processor = Arc::clone(&processor);
                    tokio::spawn(Self::run_job(channel, processor, id, command.payload));
                }

                Ok(Envelope { id, data: command }) => {
                    warn!(%id, command_type = %command.command_type, "Unknown worker command");
                }

                Err(Error::Decode { message }) => {
                    warn!(error = %message, "Skipping undecodable worker command");
                }

                Err(Error::ConnectionClosed) => {
                    debug!("Worker connection closed");
                    break;
                }

                Err(e) => {
                    error!(error = %e, "Worker listener failed");
                    break;
                }
            }
        }

        debug!("Worker listener terminated");
    }

    /// Runs one job and sends its reply.
    async fn run_job(
        channel: Channel<Value, WorkerCommand>,
        processor: Arc<dyn Processor>,
        id: CorrelationId,
        payload: Value,
    ) {
        trace!(%id, "Processing job");

        // A panicking processor still gets an error reply.
        let outcome = tokio::spawn(async move { processor.process(payload).await }).await;

        let reply = match outcome {
            Ok(Ok(result)) => WorkerReply::success(result),
            Ok(Err(e)) => {
                debug!(%id, error = %e, "Job failed");
                WorkerReply::failure(e.to_string(), String::new())
            }
            Err(e) => {
                error!(%id, error = %e, "Processor panicked");
                WorkerReply::failure(format!("processor panicked: {e}"), String::new())
            }
        };

        if let Err(e) = channel.respond(id, &reply).await {
            warn!(%id, error = %e, "Failed to send job reply");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
