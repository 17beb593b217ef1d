//! Envelope and result message types.
//!
//! Every frame on the wire is one JSON document of the form
//! `{"id": <int>, "data": <any>}`. Requests and pushes carry an arbitrary
//! `data` body; responses carry a [`ResultBody`].

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::error::{Error, Result};
use crate::identifiers::CorrelationId;

// ============================================================================
// Envelope
// ============================================================================

/// The `{id, data}` wrapper around every frame.
///
/// # Format
///
/// ```json
/// { "id": 1, "data": { "fn": "add", "args": ["job1", {}, null] } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Correlation ID.
    pub id: CorrelationId,

    /// Payload.
    pub data: T,
}

impl<T> Envelope<T> {
    /// Creates a new envelope.
    #[inline]
    #[must_use]
    pub const fn new(id: CorrelationId, data: T) -> Self {
        Self { id, data }
    }
}

/// An inbound frame whose body has not been decoded yet.
///
/// The `data` bytes are kept exactly as received so callers can decode them
/// lazily into whatever shape they expect.
pub type RawEnvelope = Envelope<Box<RawValue>>;

impl RawEnvelope {
    /// Parses a frame into a raw envelope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the frame is not a JSON object with an
    /// integer `id` and a `data` field.
    pub fn parse(frame: &str) -> Result<Self> {
        serde_json::from_str(frame)
            .map_err(|e| Error::protocol(format!("malformed envelope: {e}")))
    }

    /// Returns the raw `data` text.
    #[inline]
    #[must_use]
    pub fn raw_data(&self) -> &str {
        self.data.get()
    }
}

// ============================================================================
// ResultBody
// ============================================================================

/// Response body for a request envelope.
///
/// # Format
///
/// Success:
/// ```json
/// { "ok": { "id": "42", "name": "job1" } }
/// ```
///
/// Error:
/// ```json
/// { "err": { "message": "boom", "stack": "Error: boom\n    at ..." } }
/// ```
#[derive(Debug, Deserialize)]
pub struct ResultBody {
    /// Raw success payload.
    #[serde(default)]
    pub ok: Option<Box<RawValue>>,

    /// Failure reported by the server.
    #[serde(default)]
    pub err: Option<RemoteFailure>,
}

impl ResultBody {
    /// Parses a response body from raw `data` text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the body is not a result object.
    pub fn parse(data: &str) -> Result<Self> {
        serde_json::from_str(data)
            .map_err(|e| Error::protocol(format!("malformed result body: {e}")))
    }

    /// Converts the body into the call outcome.
    ///
    /// An absent or `null` `ok` yields the raw JSON `null`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Remote`] when the body carries an `err`.
    pub fn into_outcome(self) -> Result<Box<RawValue>> {
        if let Some(failure) = self.err {
            return Err(failure.into_error());
        }

        match self.ok {
            Some(raw) => Ok(raw),
            None => Ok(RawValue::from_string("null".to_owned())?),
        }
    }
}

// ============================================================================
// RemoteFailure
// ============================================================================

/// Failure payload of a response.
///
/// The proxy reports validation failures as a `{message, stack}` object and
/// queue method failures as a bare message string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RemoteFailure {
    /// Structured failure.
    Detail(ErrorDetail),
    /// Message-only failure.
    Message(String),
}

impl RemoteFailure {
    /// Converts the failure into [`Error::Remote`].
    #[must_use]
    pub fn into_error(self) -> Error {
        match self {
            Self::Detail(detail) => Error::remote(detail.message, detail.stack.unwrap_or_default()),
            Self::Message(message) => Error::remote(message, String::new()),
        }
    }
}

// ============================================================================
// ErrorDetail
// ============================================================================

/// `{message, stack}` error object, used in both directions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Error message.
    pub message: String,

    /// Stack trace, if any.
    #[serde(default)]
    pub stack: Option<String>,
}

impl ErrorDetail {
    /// Creates an error detail.
    #[inline]
    #[must_use]
    pub fn new(message: impl Into<String>, stack: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: Some(stack.into()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_outbound_envelope_format() {
        let envelope = Envelope::new(CorrelationId::new(3), json!({ "fn": "pause", "args": [] }));
        let json = serde_json::to_value(&envelope).expect("serialize");
        assert_eq!(json, json!({ "id": 3, "data": { "fn": "pause", "args": [] } }));
    }

    #[test]
    fn test_raw_envelope_keeps_data_verbatim() {
        let frame = r#"{"id":1,"data":{"ok":{"id":"42","name":"job1"}}}"#;
        let envelope = RawEnvelope::parse(frame).expect("parse");
        assert_eq!(envelope.id, CorrelationId::new(1));
        assert_eq!(envelope.raw_data(), r#"{"ok":{"id":"42","name":"job1"}}"#);
    }

    #[test]
    fn test_raw_envelope_rejects_missing_id() {
        let err = RawEnvelope::parse(r#"{"data":{}}"#).unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));

        let err = RawEnvelope::parse("not json").unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[test]
    fn test_ok_outcome_is_raw_payload() {
        let body = ResultBody::parse(r#"{"ok":{"id":"42","name":"job1"}}"#).expect("parse");
        let raw = body.into_outcome().expect("ok outcome");
        assert_eq!(raw.get(), r#"{"id":"42","name":"job1"}"#);
    }

    #[test]
    fn test_missing_ok_is_null() {
        let body = ResultBody::parse("{}").expect("parse");
        assert_eq!(body.into_outcome().expect("ok outcome").get(), "null");

        let body = ResultBody::parse(r#"{"ok":null}"#).expect("parse");
        assert_eq!(body.into_outcome().expect("ok outcome").get(), "null");
    }

    #[test]
    fn test_structured_err_outcome() {
        let body =
            ResultBody::parse(r#"{"err":{"message":"boom","stack":"..."}}"#).expect("parse");
        match body.into_outcome() {
            Err(Error::Remote { message, stack }) => {
                assert_eq!(message, "boom");
                assert_eq!(stack, "...");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_string_err_outcome() {
        let body = ResultBody::parse(r#"{"err":"Missing key for job 1"}"#).expect("parse");
        match body.into_outcome() {
            Err(Error::Remote { message, stack }) => {
                assert_eq!(message, "Missing key for job 1");
                assert!(stack.is_empty());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_err_wins_over_ok() {
        let body = ResultBody::parse(r#"{"ok":1,"err":{"message":"late"}}"#).expect("parse");
        assert!(body.into_outcome().unwrap_err().is_remote());
    }

    #[test]
    fn test_result_body_rejects_non_object() {
        assert!(matches!(
            ResultBody::parse("42").unwrap_err(),
            Error::Protocol { .. }
        ));
    }

    proptest! {
        #[test]
        fn prop_remote_message_surfaces_verbatim(message in ".*", stack in ".*") {
            let data = json!({ "err": { "message": message, "stack": stack } }).to_string();
            let outcome = ResultBody::parse(&data).expect("parse").into_outcome();
            match outcome {
                Err(Error::Remote { message: m, stack: s }) => {
                    prop_assert_eq!(m, message);
                    prop_assert_eq!(s, stack);
                }
                other => prop_assert!(false, "unexpected outcome: {:?}", other),
            }
        }
    }
}
