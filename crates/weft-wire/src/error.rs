//! Errors raised while framing wire envelopes.

use thiserror::Error;

/// Errors surfaced while parsing or serialising wire envelopes.
#[derive(Debug, Error)]
pub enum WireError {
    /// The line was empty once trailing whitespace was removed.
    #[error("empty envelope line")]
    Empty,

    /// The line was not valid JSON or did not match the envelope schema.
    #[error("malformed envelope: {message}")]
    Malformed {
        /// Parser diagnostic.
        message: String,
        /// Underlying parser error.
        #[source]
        source: serde_json::Error,
    },

    /// Serialising an envelope failed.
    #[error("failed to serialise envelope: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl WireError {
    /// Creates a malformed envelope error from a serde error.
    #[must_use]
    pub fn from_json_error(source: serde_json::Error) -> Self {
        Self::Malformed {
            message: source.to_string(),
            source,
        }
    }
}

/// Trims trailing ASCII whitespace (including the newline delimiter).
pub(crate) fn trim_trailing_whitespace(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |pos| pos + 1);
    bytes.get(..end).unwrap_or_default()
}
