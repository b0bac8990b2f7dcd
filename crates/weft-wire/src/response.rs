//! Response envelope serialisation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{WireError, trim_trailing_whitespace};
use crate::tags;

/// Failure payload naming an error tag and a caller-visible message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireFailure {
    /// Registered or reserved error tag.
    pub error_tag: String,
    /// Message safe to show to the caller.
    pub message: String,
}

impl WireFailure {
    /// Creates a failure payload.
    #[must_use]
    pub fn new(error_tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_tag: error_tag.into(),
            message: message.into(),
        }
    }
}

/// Outcome of a dispatched call.
///
/// Serialised with an explicit `status` discriminator and the payload under
/// `body`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "status", content = "body", rename_all = "snake_case")]
pub enum WireResponse {
    /// The call completed and produced an encoded result.
    Success(Value),
    /// The call failed with a tagged error.
    Failure(WireFailure),
}

impl WireResponse {
    /// Creates a success response.
    #[must_use]
    pub const fn success(body: Value) -> Self {
        Self::Success(body)
    }

    /// Creates a failure response.
    #[must_use]
    pub fn failure(error_tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failure(WireFailure::new(error_tag, message))
    }

    /// Returns `true` for success responses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns the failure payload, when present.
    #[must_use]
    pub const fn as_failure(&self) -> Option<&WireFailure> {
        match self {
            Self::Failure(failure) => Some(failure),
            Self::Success(_) => None,
        }
    }

    /// Suggested HTTP status for hosts that speak HTTP.
    ///
    /// Routing failures map to 404 and decode failures to 400. Every other
    /// failure, including business errors, maps to 500.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Success(_) => 200,
            Self::Failure(failure) => match failure.error_tag.as_str() {
                tags::NO_SUCH_ROUTE => 404,
                tags::BAD_REQUEST => 400,
                _ => 500,
            },
        }
    }

    /// Parses a JSON line into a response envelope.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Empty`] for blank lines and
    /// [`WireError::Malformed`] when the line is not a response envelope.
    pub fn parse(line: &[u8]) -> Result<Self, WireError> {
        let trimmed = trim_trailing_whitespace(line);
        if trimmed.is_empty() {
            return Err(WireError::Empty);
        }
        serde_json::from_slice(trimmed).map_err(WireError::from_json_error)
    }

    /// Serialises the response as a newline-terminated JSON line.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Serialize`] if serialisation fails.
    pub fn to_line(&self) -> Result<Vec<u8>, WireError> {
        let mut line = serde_json::to_vec(self).map_err(WireError::Serialize)?;
        line.push(b'\n');
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[test]
    fn success_serialises_with_status_and_body() {
        let response = WireResponse::success(json!([]));
        let value = serde_json::to_value(&response).expect("serialise");
        assert_eq!(value, json!({"status": "success", "body": []}));
    }

    #[test]
    fn failure_serialises_error_tag_in_camel_case() {
        let response = WireResponse::failure("PasswordExpired", "change it");
        let value = serde_json::to_value(&response).expect("serialise");
        assert_eq!(
            value,
            json!({
                "status": "failure",
                "body": {"errorTag": "PasswordExpired", "message": "change it"}
            })
        );
    }

    #[test]
    fn parses_failure_line() {
        let line = br#"{"status":"failure","body":{"errorTag":"BadRequest","message":"x"}}"#;
        let response = WireResponse::parse(line).expect("parse");
        let failure = response.as_failure().expect("failure");
        assert_eq!(failure.error_tag, tags::BAD_REQUEST);
        assert!(!response.is_success());
    }

    #[rstest]
    #[case(WireResponse::success(Value::Null), 200)]
    #[case(WireResponse::failure(tags::NO_SUCH_ROUTE, "x"), 404)]
    #[case(WireResponse::failure(tags::BAD_REQUEST, "x"), 400)]
    #[case(WireResponse::failure(tags::SERVICE_FAILURE, "x"), 500)]
    #[case(WireResponse::failure("PasswordExpired", "x"), 500)]
    fn maps_http_status(#[case] response: WireResponse, #[case] expected: u16) {
        assert_eq!(response.http_status(), expected);
    }

    #[test]
    fn line_round_trips() {
        let response = WireResponse::success(json!({"ok": 3}));
        let line = response.to_line().expect("serialise");
        assert!(line.ends_with(b"\n"));
        assert_eq!(WireResponse::parse(&line).expect("parse"), response);
    }
}
