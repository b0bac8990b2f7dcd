//! Request dispatch.
//!
//! The [`Dispatcher`] takes one inbound call (verb, route, encoded argument
//! list and the host's context objects) and produces one
//! [`WireResponse`](weft_wire::WireResponse). The steps run strictly in
//! order: resolve the binding, decode the arguments, build the service
//! instance, invoke the method, then encode the result or the error.
//! Failures at any step terminate only that call.

mod dispatcher;
mod errors;

pub use dispatcher::Dispatcher;
pub use errors::DispatchError;

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
