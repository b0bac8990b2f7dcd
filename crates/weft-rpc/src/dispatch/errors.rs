//! Error types for per-call dispatch failures.
//!
//! These are failures the dispatcher detects on its own, before or after the
//! service method runs. Failures raised by the method itself go through
//! [`ErrorPropagation`](crate::ErrorPropagation) instead.

use thiserror::Error;
use weft_wire::{Verb, WireError, WireResponse, tags};

use crate::codec::{DecodeError, EncodeError};
use crate::context::ContextError;

/// Message sent to callers for dispatcher faults.
pub(crate) const INTERNAL_FAILURE_MESSAGE: &str = "internal service failure";

/// Failures detected by the dispatcher.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No binding answers to the verb and route.
    #[error("no binding for {verb} {route}")]
    NoSuchRoute {
        /// Verb of the request.
        verb: Verb,
        /// Route of the request.
        route: String,
    },

    /// The request carried more arguments than the binding declares, or
    /// omitted a required one.
    #[error("{route} expects {expected} arguments but received {received}")]
    ArgumentCount {
        /// Route of the request.
        route: String,
        /// Declared parameter count.
        expected: usize,
        /// Received argument count.
        received: usize,
    },

    /// An argument did not match its descriptor.
    #[error("{route} argument {position}: {source}")]
    Decode {
        /// Route of the request.
        route: String,
        /// One-based argument position.
        position: usize,
        /// Decode failure.
        #[source]
        source: DecodeError,
    },

    /// The host did not supply a context object the factory needs.
    #[error("{route}: {source}")]
    Context {
        /// Route of the request.
        route: String,
        /// Context failure.
        #[source]
        source: ContextError,
    },

    /// The method returned a value that does not match its descriptor.
    #[error("{route}: result does not match its descriptor: {source}")]
    Encode {
        /// Route of the request.
        route: String,
        /// Encode failure.
        #[source]
        source: EncodeError,
    },

    /// The request envelope could not be parsed.
    #[error("malformed request: {0}")]
    MalformedRequest(#[source] WireError),

    /// The request exceeded the size limit.
    #[error("request exceeds the {limit} byte limit")]
    RequestTooLarge {
        /// Configured limit.
        limit: usize,
    },
}

impl DispatchError {
    /// Creates a routing failure.
    pub fn no_such_route(verb: Verb, route: impl Into<String>) -> Self {
        Self::NoSuchRoute {
            verb,
            route: route.into(),
        }
    }

    /// Creates an argument count failure.
    pub fn argument_count(route: impl Into<String>, expected: usize, received: usize) -> Self {
        Self::ArgumentCount {
            route: route.into(),
            expected,
            received,
        }
    }

    /// Creates an argument decode failure.
    pub fn decode(route: impl Into<String>, position: usize, source: DecodeError) -> Self {
        Self::Decode {
            route: route.into(),
            position,
            source,
        }
    }

    /// Creates a context injection failure.
    pub fn context(route: impl Into<String>, source: ContextError) -> Self {
        Self::Context {
            route: route.into(),
            source,
        }
    }

    /// Creates a result encode failure.
    pub fn encode(route: impl Into<String>, source: EncodeError) -> Self {
        Self::Encode {
            route: route.into(),
            source,
        }
    }

    /// Creates a size limit failure.
    pub const fn request_too_large(limit: usize) -> Self {
        Self::RequestTooLarge { limit }
    }

    /// Wire tag reported to the caller.
    #[must_use]
    pub const fn error_tag(&self) -> &'static str {
        match self {
            Self::NoSuchRoute { .. } => tags::NO_SUCH_ROUTE,
            Self::ArgumentCount { .. }
            | Self::Decode { .. }
            | Self::MalformedRequest(_)
            | Self::RequestTooLarge { .. } => tags::BAD_REQUEST,
            Self::Context { .. } | Self::Encode { .. } => tags::SERVICE_FAILURE,
        }
    }

    /// Returns `true` for server-side faults.
    ///
    /// Routing and decode failures are the caller's problem and are not
    /// logged as faults.
    #[must_use]
    pub const fn is_fault(&self) -> bool {
        matches!(self, Self::Context { .. } | Self::Encode { .. })
    }

    /// Converts the error into a failure envelope.
    ///
    /// Faults carry a generic message; caller errors describe the problem.
    #[must_use]
    pub fn into_response(self) -> WireResponse {
        let message = if self.is_fault() {
            INTERNAL_FAILURE_MESSAGE.to_owned()
        } else {
            self.to_string()
        };
        WireResponse::failure(self.error_tag(), message)
    }
}
