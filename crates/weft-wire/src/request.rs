//! Request envelope parsing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Verb;
use crate::error::{WireError, trim_trailing_whitespace};

/// Inbound call: verb, fully prefixed route and encoded positional arguments.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WireRequest {
    /// Verb the caller used.
    #[serde(default)]
    pub verb: Verb,
    /// Route including the namespace prefix, for example `/rpc/get_list`.
    pub route: String,
    /// Encoded positional arguments.
    #[serde(default)]
    pub body: Vec<Value>,
}

impl WireRequest {
    /// Creates a request envelope.
    #[must_use]
    pub fn new(verb: Verb, route: impl Into<String>, body: Vec<Value>) -> Self {
        Self {
            verb,
            route: route.into(),
            body,
        }
    }

    /// Parses a JSON line into a request envelope.
    ///
    /// Trailing whitespace (including the newline delimiter) is trimmed
    /// before parsing.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Empty`] for blank lines and
    /// [`WireError::Malformed`] when the line is not a request envelope.
    pub fn parse(line: &[u8]) -> Result<Self, WireError> {
        let trimmed = trim_trailing_whitespace(line);
        if trimmed.is_empty() {
            return Err(WireError::Empty);
        }
        serde_json::from_slice(trimmed).map_err(WireError::from_json_error)
    }

    /// Serialises the request as a newline-terminated JSON line.
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
