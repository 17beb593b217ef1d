//! Queue command connection.
//!
//! A [`Queue`] issues BullMQ queue methods over one multiplexed connection.
//! Calls may run concurrently from any number of tasks.

// ============================================================================
// Imports
// ============================================================================

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use serde::de::IgnoredAny;
use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::protocol::{Job, JobLogs, JobOptions, JobState, QueueCommand};
use crate::transport::{Channel, ConnectionState};

// ============================================================================
// Queue
// ============================================================================

/// Connection to `/queues/{queue}`.
///
/// # Example
///
/// ```no_run
/// # use bullmq_proxy_client::{Client, JobState};
/// # async fn example(client: &Client) -> bullmq_proxy_client::Result<()> {
/// let queue = client.dial_queue("emails").await?;
///
/// queue.add("welcome", &serde_json::json!({ "to": "a@b.c" }), None).await?;
/// let counts = queue.get_job_counts(&[JobState::Waiting, JobState::Failed]).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Queue {
    channel: Channel<QueueCommand>,
}

impl Queue {
    /// Wraps a queue channel.
    #[inline]
    #[must_use]
    pub fn new(channel: Channel<QueueCommand>) -> Self {
        Self { channel }
    }

    /// Returns the underlying channel.
    #[inline]
    #[must_use]
    pub fn channel(&self) -> &Channel<QueueCommand> {
        &self.channel
    }

    /// Returns the connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.channel.state()
    }

    /// Adds a job.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`](crate::Error::Json) if `data` cannot be serialized
    /// - [`Error::Remote`](crate::Error::Remote) if the proxy rejects the job
    /// - any transport error
    pub async fn add<D>(&self, name: &str, data: &D, opts: Option<&JobOptions>) -> Result<Job>
    where
        D: Serialize + ?Sized,
    {
        let data = serde_json::to_value(data)?;
        let opts = serde_json::to_value(opts)?;

        let job: Job = self.channel.request(&QueueCommand::add(name, data, opts)).await?;
        debug!(name, job_id = ?job.id, "Job added");
        Ok(job)
    }

    /// Pauses the queue.
    ///
    /// # Errors
    ///
    /// Any transport or remote error.
    pub async fn pause(&self) -> Result<()> {
        self.channel.request::<IgnoredAny>(&QueueCommand::pause()).await?;
        Ok(())
    }

    /// Resumes the queue.
    ///
    /// # Errors
    ///
    /// Any transport or remote error.
    pub async fn resume(&self) -> Result<()> {
        self.channel.request::<IgnoredAny>(&QueueCommand::resume()).await?;
        Ok(())
    }

    /// Lists the workers connected to the queue.
    ///
    /// # Errors
    ///
    /// Any transport or remote error.
    pub async fn get_workers(&self) -> Result<Vec<Value>> {
        self.channel.request(&QueueCommand::get_workers()).await
    }

    /// Lists jobs in `state` between `start` and `end` (inclusive).
    ///
    /// # Errors
    ///
    /// Any transport, remote or decode error.
    pub async fn get_jobs(
        &self,
        state: JobState,
        start: u64,
        end: u64,
        asc: bool,
    ) -> Result<Vec<Job>> {
        let state = Value::String(state.as_str().to_owned());
        self.channel
            .request(&QueueCommand::get_jobs(state, start, end, asc))
            .await
    }

    /// Counts jobs per state. An empty list counts every state.
    ///
    /// # Errors
    ///
    /// Any transport, remote or decode error.
    pub async fn get_job_counts(&self, states: &[JobState]) -> Result<HashMap<String, u64>> {
        let states = states
            .iter()
            .map(|state| Value::String(state.as_str().to_owned()))
            .collect();
        self.channel
            .request(&QueueCommand::get_job_counts(states))
            .await
    }

    /// Reads a job's log rows.
    ///
    /// # Errors
    ///
    /// Any transport, remote or decode error.
    pub async fn get_job_logs(
        &self,
        job_id: &str,
        start: Option<u64>,
        end: Option<u64>,
    ) -> Result<JobLogs> {
        self.channel
            .request(&QueueCommand::get_job_logs(job_id, start, end))
            .await
    }

    /// Sets a job's progress to any JSON value.
    ///
    /// # Errors
    ///
    /// Any serialization, transport or remote error.
    pub async fn update_job_progress<P>(&self, job_id: &str, progress: &P) -> Result<()>
    where
        P: Serialize + ?Sized,
    {
        let progress = serde_json::to_value(progress)?;
        self.channel
            .request::<IgnoredAny>(&QueueCommand::update_job_progress(job_id, progress))
            .await?;
        Ok(())
    }

    /// Appends a log row to a job and returns the new row count.
    ///
    /// `keep_logs` caps how many rows are retained.
    ///
    /// # Errors
    ///
    /// Any transport, remote or decode error.
    pub async fn add_job_log(&self, job_id: &str, row: &str, keep_logs: Option<u64>) -> Result<u64> {
        self.channel
            .request(&QueueCommand::add_job_log(job_id, row, keep_logs))
            .await
    }

    /// Sends a raw command with an explicit response timeout.
    ///
    /// # Errors
    ///
    /// Any transport, remote or decode error.
    pub async fn call_with_timeout(
        &self,
        command: &QueueCommand,
        response_timeout: Duration,
    ) -> Result<Value> {
        self.channel
            .request_with_timeout(command, response_timeout)
            .await
    }

    /// Closes the connection, failing in-flight calls.
    pub async fn close(&self) {
        self.channel.close().await;
    }
}

// ============================================================================
// Tests
// ============================================================================
