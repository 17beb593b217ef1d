//! Job records and job options.
//!
//! Plain data shapes exchanged with the proxy. Unknown fields are ignored
//! on input so newer BullMQ versions do not break decoding.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Job
// ============================================================================

/// A job record as returned by `add` and `getJobs`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Job ID.
    #[serde(default)]
    pub id: Option<String>,

    /// Job name.
    #[serde(default)]
    pub name: String,

    /// Job payload.
    #[serde(default)]
    pub data: Value,

    /// Options the job was created with.
    #[serde(default)]
    pub opts: Value,

    /// Progress reported so far.
    #[serde(default)]
    pub progress: Value,

    /// Value returned by the processor.
    #[serde(default, rename = "returnvalue")]
    pub return_value: Value,

    /// Stack traces of failed attempts.
    #[serde(default)]
    pub stacktrace: Option<Vec<String>>,

    /// Creation timestamp (ms).
    #[serde(default)]
    pub timestamp: u64,

    /// Delay before the job can be processed (ms).
    #[serde(default)]
    pub delay: u64,

    /// Attempts made so far.
    #[serde(default)]
    pub attempts_made: u32,

    /// Reason of the last failure.
    #[serde(default)]
    pub failed_reason: Option<String>,

    /// When processing started (ms).
    #[serde(default)]
    pub processed_on: Option<u64>,

    /// When processing finished (ms).
    #[serde(default)]
    pub finished_on: Option<u64>,
}

// ============================================================================
// JobOptions
// ============================================================================

/// Options sent with `add`.
///
/// Only set fields are serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOptions {
    /// Custom job ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,

    /// Total attempts before the job is marked failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,

    /// Delay before the job can be processed (ms).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<u64>,

    /// Priority (lower is higher priority).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,

    /// Push to the head of the queue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifo: Option<bool>,

    /// Remove the job once completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove_on_complete: Option<bool>,

    /// Remove the job once failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove_on_fail: Option<bool>,
}

// ============================================================================
// JobLogs
// ============================================================================

/// Result of `getJobLogs`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobLogs {
    /// Log rows in the requested range.
    #[serde(default)]
    pub logs: Vec<String>,

    /// Total number of rows.
    #[serde(default)]
    pub count: u64,
}

// ============================================================================
// JobState
// ============================================================================

/// Job state filter for `getJobs` / `getJobCounts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobState {
    /// Finished successfully.
    Completed,
    /// Failed after all attempts.
    Failed,
    /// Waiting for its delay to expire.
    Delayed,
    /// Being processed.
    Active,
    /// Waiting, ordered by priority.
    Prioritized,
    /// Waiting to be processed.
    Waiting,
    /// Waiting for child jobs.
    WaitingChildren,
}

impl JobState {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Delayed => "delayed",
            Self::Active => "active",
            Self::Prioritized => "prioritized",
            Self::Waiting => "waiting",
            Self::WaitingChildren => "waiting-children",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
