//! Classification of errors crossing the dispatch boundary.
//!
//! Registered business errors travel verbatim and are logged at debug
//! level. Everything else, including business errors whose tag was never
//! registered and panics inside service code, is logged as a fault with its
//! full cause chain while the caller only sees [`tags::SERVICE_FAILURE`] and
//! the top-level message.

use std::any::Any;
use std::sync::Arc;

use tracing::{debug, error};
use weft_wire::{WireFailure, tags};

use crate::dispatch::DISPATCH_TARGET;
use crate::errors::{BusinessError, ErrorRegistry, ServiceError};

/// How an error was classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Registered business error, sent verbatim.
    Business(WireFailure),
    /// Anything else, redacted to the generic failure tag.
    Unmarked(WireFailure),
}

impl Classification {
    /// Wire payload for the caller.
    #[must_use]
    pub fn into_failure(self) -> WireFailure {
        match self {
            Self::Business(failure) | Self::Unmarked(failure) => failure,
        }
    }

    /// Returns `true` for business errors.
    #[must_use]
    pub const fn is_business(&self) -> bool {
        matches!(self, Self::Business(_))
    }
}

/// Decides what of an error reaches the caller.
#[derive(Debug, Clone)]
pub struct ErrorPropagation {
    errors: Arc<ErrorRegistry>,
}

impl ErrorPropagation {
    /// Creates a propagation layer over the registered error tags.
    #[must_use]
    pub const fn new(errors: Arc<ErrorRegistry>) -> Self {
        Self { errors }
    }

    /// Classifies and logs an error raised while serving `route`.
    pub fn classify(&self, route: &str, failure: ServiceError) -> Classification {
        match failure {
            ServiceError::Business(business) if self.errors.is_registered(business.tag()) => {
                debug!(
                    target: DISPATCH_TARGET,
                    route,
                    tag = business.tag(),
                    message = business.message(),
                    "service raised a business error"
                );
                Classification::Business(business.to_failure())
            }
            ServiceError::Business(business) => Self::unregistered(route, &business),
            ServiceError::Unmarked(cause) => {
                error!(
                    target: DISPATCH_TARGET,
                    route,
                    error = %format!("{cause:#}"),
                    detail = ?cause,
                    "service method failed"
                );
                Classification::Unmarked(WireFailure::new(
                    tags::SERVICE_FAILURE,
                    cause.to_string(),
                ))
            }
        }
    }

    /// Classifies a panic payload caught while serving `route`.
    pub fn classify_panic(&self, route: &str, payload: &(dyn Any + Send)) -> Classification {
        let message = panic_message(payload);
        error!(
            target: DISPATCH_TARGET,
            route,
            panic = %message,
            "service method panicked"
        );
        Classification::Unmarked(WireFailure::new(tags::SERVICE_FAILURE, message))
    }

    fn unregistered(route: &str, business: &BusinessError) -> Classification {
        error!(
            target: DISPATCH_TARGET,
            route,
            tag = business.tag(),
            message = business.message(),
            "service raised a business error with an unregistered tag"
        );
        Classification::Unmarked(WireFailure::new(
            tags::SERVICE_FAILURE,
            business.message(),
        ))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "service method panicked".to_owned())
}
