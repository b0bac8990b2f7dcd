//! RPC binding and dispatch core for weft services.
//!
//! A service is described once as a set of [`MethodBinding`]s, each naming
//! the parameter and return [`TypeDescriptor`]s of one method. Hosts register
//! [`ServiceDefinition`]s with a [`RegistryBuilder`] at startup; the frozen
//! [`ServiceRegistry`] is then shared by a [`Dispatcher`] that resolves each
//! inbound `(verb, route)` to its binding, decodes the positional arguments
//! with the [`codec`], builds a fresh service instance through the
//! factory, invokes the method and encodes the outcome as a
//! [`WireResponse`](weft_wire::WireResponse).
//!
//! Errors raised by service code are split in two. Business errors whose tag
//! is registered travel to the caller verbatim and are rebuilt on the client
//! side by [`ErrorRegistry::reconstruct`]. Everything else is logged with its
//! full cause chain and redacted to a generic `ServiceFailure`.
//!
//! Host concerns stay outside the core: a host supplies context objects
//! (request, session, connection, principal) through [`ContextObjects`], and
//! factories declare which kinds they consume. [`LineHost`] is a reference
//! TCP host framing one JSON envelope per line; [`RpcClient`] with a
//! [`Transport`] is the caller-side counterpart used by generated stubs.
//!
//! ## Route naming
//!
//! Unless a binding overrides it, a method's route is its name converted
//! from camel case to snake case under the configured prefix, so
//! `getAddressList` answers at `/rpc/get_address_list`.

mod bootstrap;
mod client;
pub mod codec;
mod context;
mod contract;
mod decimal;
mod descriptor;
mod dispatch;
mod errors;
mod host;
mod lifecycle;
mod propagation;
mod registry;
mod service;
pub mod telemetry;
mod value;

pub use bootstrap::{
    BootstrapError, ConfigLoader, RpcRuntime, StaticConfigLoader, SystemConfigLoader, bootstrap,
    bootstrap_with,
};
pub use client::{CallError, LocalTransport, RpcClient, Transport, TransportError};
pub use codec::{DecodeError, EncodeError, decode, encode};
pub use context::{
    ContextAdapter, ContextError, ContextKind, ContextObjects, HostCapabilities, InjectedContext,
};
pub use contract::{MAX_PARAMETERS, MethodBinding, ServiceContract, derive_route_name};
pub use decimal::{Decimal, DecimalError};
pub use descriptor::{
    DescriptorError, EnumDescriptor, FieldDescriptor, RecordDescriptor, TypeDescriptor,
};
pub use dispatch::{DispatchError, Dispatcher};
pub use errors::{BusinessError, ErrorRegistry, RemoteException, ServiceError};
pub use host::{ConnectionInfo, HostError, LineHost, serve_connection};
pub use lifecycle::{LifecycleReporter, StructuredLifecycleReporter};
pub use propagation::{Classification, ErrorPropagation};
pub use registry::{RegistrationError, RegistryBuilder, RouteEntry, ServiceRegistry};
pub use service::{CallArgs, FnFactory, MethodFuture, ServiceDefinition, ServiceFactory, factory_fn};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use value::{FromValue, IntoValue, RecordFields, Value, ValueError};

#[cfg(test)]
mod tests;
