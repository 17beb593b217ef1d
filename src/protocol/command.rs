//! Command definitions for the queue and worker endpoints.
//!
//! # Directions
//!
//! | Type | Direction | Endpoint |
//! |------|-----------|----------|
//! | [`QueueCommand`] | Local → Proxy | `/queues/{queue}` |
//! | [`WorkerCommand`] | Proxy → Local (push) | `/queues/{queue}/process/{n}` |
//! | [`WorkerReply`] | Local → Proxy | `/queues/{queue}/process/{n}` |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::envelope::ErrorDetail;

// ============================================================================
// QueueFn
// ============================================================================

/// Queue method invoked by a [`QueueCommand`].
///
/// The proxy dispatches `fn` by name to the BullMQ queue object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QueueFn {
    /// `add(name, data, opts)`
    Add,
    /// `pause()`
    Pause,
    /// `resume()`
    Resume,
    /// `getWorkers()`
    GetWorkers,
    /// `getJobs(state, start, end, asc)`
    GetJobs,
    /// `getJobCounts(...states)`
    GetJobCounts,
    /// `getJobLogs(jobId, start, end)`
    GetJobLogs,
    /// `updateJobProgress(jobId, progress)`
    UpdateJobProgress,
    /// `addJobLog(jobId, row, keepLogs)`
    AddJobLog,
}

// ============================================================================
// QueueCommand
// ============================================================================

/// A queue command sent as the `data` of a request envelope.
///
/// # Format
///
/// ```json
/// { "fn": "add", "args": ["job1", { "key": "value" }, null] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueCommand {
    /// Queue method name.
    #[serde(rename = "fn")]
    pub function: QueueFn,

    /// Positional arguments.
    pub args: Vec<Value>,
}

impl QueueCommand {
    /// Creates a command with explicit arguments.
    #[inline]
    #[must_use]
    pub fn new(function: QueueFn, args: Vec<Value>) -> Self {
        Self { function, args }
    }

    /// `add(name, data, opts)`; `opts` is `null` when absent.
    #[must_use]
    pub fn add(name: impl Into<String>, data: Value, opts: Value) -> Self {
        Self::new(QueueFn::Add, vec![Value::String(name.into()), data, opts])
    }

    /// `pause()`
    #[inline]
    #[must_use]
    pub fn pause() -> Self {
        Self::new(QueueFn::Pause, Vec::new())
    }

    /// `resume()`
    #[inline]
    #[must_use]
    pub fn resume() -> Self {
        Self::new(QueueFn::Resume, Vec::new())
    }

    /// `getWorkers()`
    #[inline]
    #[must_use]
    pub fn get_workers() -> Self {
        Self::new(QueueFn::GetWorkers, Vec::new())
    }

    /// `getJobs(state, start, end, asc)`
    #[must_use]
    pub fn get_jobs(state: Value, start: u64, end: u64, asc: bool) -> Self {
        Self::new(
            QueueFn::GetJobs,
            vec![state, json!(start), json!(end), json!(asc)],
        )
    }

    /// `getJobCounts(...states)`
    #[inline]
    #[must_use]
    pub fn get_job_counts(states: Vec<Value>) -> Self {
        Self::new(QueueFn::GetJobCounts, states)
    }

    /// `getJobLogs(jobId, start, end)`
    #[must_use]
    pub fn get_job_logs(job_id: impl Into<String>, start: Option<u64>, end: Option<u64>) -> Self {
        Self::new(
            QueueFn::GetJobLogs,
            vec![Value::String(job_id.into()), json!(start), json!(end)],
        )
    }

    /// `updateJobProgress(jobId, progress)`
    #[must_use]
    pub fn update_job_progress(job_id: impl Into<String>, progress: Value) -> Self {
        Self::new(
            QueueFn::UpdateJobProgress,
            vec![Value::String(job_id.into()), progress],
        )
    }

    /// `addJobLog(jobId, row, keepLogs)`
    #[must_use]
    pub fn add_job_log(
        job_id: impl Into<String>,
        row: impl Into<String>,
        keep_logs: Option<u64>,
    ) -> Self {
        Self::new(
            QueueFn::AddJobLog,
            vec![
                Value::String(job_id.into()),
                Value::String(row.into()),
                json!(keep_logs),
            ],
        )
    }
}

// ============================================================================
// WorkerCommand
// ============================================================================

/// A push from the proxy asking the worker to do something.
///
/// # Format
///
/// ```json
/// { "type": "process", "payload": { ... } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerCommand {
    /// Command type.
    #[serde(rename = "type")]
    pub command_type: String,

    /// Job data.
    #[serde(default)]
    pub payload: Value,
}

impl WorkerCommand {
    /// Command type asking the worker to process a job.
    pub const PROCESS: &'static str = "process";

    /// Returns `true` if this is a `process` command.
    #[inline]
    #[must_use]
    pub fn is_process(&self) -> bool {
        self.command_type == Self::PROCESS
    }
}

// ============================================================================
// WorkerReply
// ============================================================================

/// The worker's answer to a `process` push.
///
/// # Format
///
/// ```json
/// { "result": 42 }
/// { "err": { "message": "boom", "stack": "" } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerReply {
    /// Processor returned a value.
    Result(Value),
    /// Processor failed.
    Err(ErrorDetail),
}

impl WorkerReply {
    /// Creates a success reply.
    #[inline]
    #[must_use]
    pub fn success(result: Value) -> Self {
        Self::Result(result)
    }

    /// Creates a failure reply.
    #[inline]
    #[must_use]
    pub fn failure(message: impl Into<String>, stack: impl Into<String>) -> Self {
        Self::Err(ErrorDetail::new(message, stack))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_command_format() {
        let command = QueueCommand::add("job1", json!({ "key": "value" }), Value::Null);
        let json = serde_json::to_value(&command).expect("serialize");
        assert_eq!(
            json,
            json!({ "fn": "add", "args": ["job1", { "key": "value" }, null] })
        );
    }

    #[test]
    fn test_function_names() {
        let names: Vec<String> = [
            QueueFn::GetWorkers,
            QueueFn::GetJobCounts,
            QueueFn::UpdateJobProgress,
            QueueFn::AddJobLog,
        ]
        .iter()
        .map(|f| serde_json::to_string(f).expect("serialize"))
        .collect();

        assert_eq!(
            names,
            [
                "\"getWorkers\"",
                "\"getJobCounts\"",
                "\"updateJobProgress\"",
                "\"addJobLog\""
            ]
        );
    }

    #[test]
    fn test_optional_arguments_become_null() {
        let command = QueueCommand::get_job_logs("42", None, Some(10));
        assert_eq!(command.args, vec![json!("42"), Value::Null, json!(10)]);

        let command = QueueCommand::add_job_log("42", "started", None);
        assert_eq!(command.args[2], Value::Null);
    }

    #[test]
    fn test_worker_command_parse() {
        let command: WorkerCommand =
            serde_json::from_str(r#"{"type":"process","payload":{"n":1}}"#).expect("parse");
        assert!(command.is_process());
        assert_eq!(command.payload, json!({ "n": 1 }));

        let command: WorkerCommand = serde_json::from_str(r#"{"type":"drain"}"#).expect("parse");
        assert!(!command.is_process());
        assert_eq!(command.payload, Value::Null);
    }

    #[test]
    fn test_worker_reply_format() {
        let ok = serde_json::to_value(WorkerReply::success(json!(42))).expect("serialize");
        assert_eq!(ok, json!({ "result": 42 }));

        let err = serde_json::to_value(WorkerReply::failure("boom", "")).expect("serialize");
        assert_eq!(err, json!({ "err": { "message": "boom", "stack": "" } }));
    }
}
