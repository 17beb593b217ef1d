//! Queue event message types.
//!
//! Events are pushed by the proxy on the `/queues/{queue}/events`
//! endpoint for every BullMQ queue event the client subscribed to.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// QueueEvent
// ============================================================================

/// A queue event notification.
///
/// # Format
///
/// ```json
/// { "event": "completed", "args": [{ "jobId": "42", "returnvalue": "done" }, "1-0"] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEvent {
    /// BullMQ event name (`completed`, `failed`, `progress`, ...).
    pub event: String,

    /// Listener arguments, in BullMQ order.
    #[serde(default)]
    pub args: Vec<Value>,
}

impl QueueEvent {
    /// Returns the `jobId` of the first argument, if present.
    ///
    /// Most job-scoped BullMQ events pass `{ jobId, ... }` first.
    #[inline]
    #[must_use]
    pub fn job_id(&self) -> Option<&str> {
        self.args
            .first()
            .and_then(|v| v.get("jobId"))
            .and_then(Value::as_str)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_completed_event() {
        let event: QueueEvent = serde_json::from_str(
            r#"{"event":"completed","args":[{"jobId":"42","returnvalue":"done"},"1-0"]}"#,
        )
        .expect("parse");

        assert_eq!(event.event, "completed");
        assert_eq!(event.job_id(), Some("42"));
        assert_eq!(event.args.len(), 2);
    }

    #[test]
    fn test_event_without_args() {
        let event: QueueEvent = serde_json::from_str(r#"{"event":"drained"}"#).expect("parse");
        assert!(event.args.is_empty());
        assert_eq!(event.job_id(), None);
    }
}
