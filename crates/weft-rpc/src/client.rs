//! Caller-side support for generated client stubs.
//!
//! An [`RpcClient`] encodes arguments with the binding's descriptors, sends
//! the request through a [`Transport`], and turns the response back into a
//! [`Value`] or a reconstructed [`CallError`]. The base path defaults to the
//! configured route prefix and can be overridden once per client.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use weft_config::{Config, DEFAULT_ROUTE_PREFIX, normalise_prefix};
use weft_wire::{WireError, WireRequest, WireResponse};

use crate::codec::{self, DecodeError, EncodeError};
use crate::context::ContextObjects;
use crate::contract::MethodBinding;
use crate::dispatch::Dispatcher;
use crate::errors::{BusinessError, ErrorRegistry};
use crate::value::{FromValue, Value, ValueError};

/// Moves one request to a dispatcher and brings back its response.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and waits for the response.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the exchange itself fails.
    async fn round_trip(&self, request: WireRequest) -> Result<WireResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn round_trip(&self, request: WireRequest) -> Result<WireResponse, TransportError> {
        (**self).round_trip(request).await
    }
}

/// Failures of the exchange itself.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Reading or writing the connection failed.
    #[error("transport I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// An envelope could not be serialised or parsed.
    #[error(transparent)]
    Wire(#[from] WireError),
    /// The peer closed the connection before responding.
    #[error("connection closed before a response arrived")]
    Closed,
}

/// Failures seen by a caller.
#[derive(Debug, Error)]
pub enum CallError {
    /// No binding answers to the route and verb.
    #[error("no such route: {message}")]
    NoSuchRoute {
        /// Dispatcher message.
        message: String,
    },
    /// The dispatcher rejected the arguments.
    #[error("bad request: {message}")]
    BadRequest {
        /// Dispatcher message.
        message: String,
    },
    /// The service raised a registered business error.
    #[error(transparent)]
    Business(BusinessError),
    /// The service failed; only the tag and top-level message are known.
    #[error("service failure ({tag}): {message}")]
    Failure {
        /// Error tag, usually `ServiceFailure`.
        tag: String,
        /// Top-level message.
        message: String,
    },
    /// The exchange failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// An argument did not match its descriptor.
    #[error("argument {position}: {source}")]
    Encode {
        /// One-based argument position.
        position: usize,
        /// Encode failure.
        #[source]
        source: EncodeError,
    },
    /// The response body did not match the return descriptor.
    #[error("response does not match the return type: {0}")]
    Decode(#[from] DecodeError),
    /// The decoded value could not be converted to the requested type.
    #[error("response has an unexpected shape: {0}")]
    Convert(#[from] ValueError),
    /// The caller supplied the wrong number of arguments.
    #[error("{method} expects {expected} arguments but {received} were supplied")]
    ArgumentCount {
        /// Method name.
        method: String,
        /// Declared parameter count.
        expected: usize,
        /// Supplied argument count.
        received: usize,
    },
}

impl CallError {
    /// Business error carried by this failure, if any.
    #[must_use]
    pub const fn as_business(&self) -> Option<&BusinessError> {
        match self {
            Self::Business(business) => Some(business),
            _ => None,
        }
    }
}

/// Calls bound methods through a transport.
pub struct RpcClient<T> {
    transport: T,
    base_path: String,
    errors: Arc<ErrorRegistry>,
}

impl<T: Transport> RpcClient<T> {
    /// Creates a client using the default route prefix.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            base_path: DEFAULT_ROUTE_PREFIX.to_owned(),
            errors: Arc::new(ErrorRegistry::new()),
        }
    }

    /// Creates a client using the configured route prefix.
    pub fn from_config(transport: T, config: &Config) -> Self {
        Self::new(transport).with_base_path(config.route_prefix())
    }

    /// Overrides the base path prepended to every route.
    #[must_use]
    pub fn with_base_path(mut self, base_path: &str) -> Self {
        self.base_path = normalise_prefix(base_path);
        self
    }

    /// Uses `errors` to reconstruct business errors.
    #[must_use]
    pub fn with_errors(mut self, errors: Arc<ErrorRegistry>) -> Self {
        self.errors = errors;
        self
    }

    /// Base path prepended to every route.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Calls `binding` and returns the decoded result.
    ///
    /// # Errors
    ///
    /// Returns [`CallError`] for local encoding problems, transport failures
    /// and every failure envelope the dispatcher sends back.
    pub async fn call(&self, binding: &MethodBinding, args: Vec<Value>) -> Result<Value, CallError> {
        let parameters = binding.parameters();
        if args.len() != parameters.len() {
            return Err(CallError::ArgumentCount {
                method: binding.method_name().to_owned(),
                expected: parameters.len(),
                received: args.len(),
            });
        }
        let body = args
            .iter()
            .zip(parameters)
            .enumerate()
            .map(|(index, (value, descriptor))| {
                codec::encode(value, descriptor).map_err(|source| CallError::Encode {
                    position: index + 1,
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let request = WireRequest::new(binding.verb(), binding.route(&self.base_path), body);
        match self.transport.round_trip(request).await? {
            WireResponse::Success(body) => Ok(codec::decode(&body, binding.returns())?),
            WireResponse::Failure(failure) => Err(self.errors.reconstruct(failure)),
        }
    }

    /// Calls `binding` and converts the result to `R`.
    ///
    /// # Errors
    ///
    /// As [`RpcClient::call`], plus [`CallError::Convert`].
    pub async fn call_typed<R: FromValue>(
        &self,
        binding: &MethodBinding,
        args: Vec<Value>,
    ) -> Result<R, CallError> {
        let value = self.call(binding, args).await?;
        Ok(R::from_value(value)?)
    }

    /// Calls a result-of binding.
    ///
    /// The outer error reports transport and dispatch failures; the inner
    /// result carries the method's own outcome with the error reconstructed.
    ///
    /// # Errors
    ///
    /// As [`RpcClient::call_typed`].
    pub async fn call_result<R: FromValue>(
        &self,
        binding: &MethodBinding,
        args: Vec<Value>,
    ) -> Result<Result<R, CallError>, CallError> {
        match self.call(binding, args).await? {
            Value::Result(Ok(inner)) => Ok(Ok(R::from_value(*inner)?)),
            Value::Result(Err(failure)) => Ok(Err(self.errors.reconstruct(failure))),
            other => Err(CallError::Convert(ValueError::unexpected("result", &other))),
        }
    }
}

impl<T> fmt::Debug for RpcClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcClient")
            .field("base_path", &self.base_path)
            .finish_non_exhaustive()
    }
}

type ContextSource = dyn Fn() -> ContextObjects + Send + Sync;

/// In-process transport that hands requests straight to a [`Dispatcher`].
///
/// Envelopes still go through their JSON line form, so callers see exactly
/// what a remote host would send.
#[derive(Clone)]
pub struct LocalTransport {
    dispatcher: Dispatcher,
    context: Arc<ContextSource>,
}

impl LocalTransport {
    /// Creates a transport that supplies no context objects.
    #[must_use]
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            context: Arc::new(ContextObjects::new),
        }
    }

    /// Builds fresh context objects for every call with `source`.
    #[must_use]
    pub fn with_context<F>(mut self, source: F) -> Self
    where
        F: Fn() -> ContextObjects + Send + Sync + 'static,
    {
        self.context = Arc::new(source);
        self
    }
}

impl fmt::Debug for LocalTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTransport")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn round_trip(&self, request: WireRequest) -> Result<WireResponse, TransportError> {
        let inbound = WireRequest::parse(&request.to_line()?)?;
        let objects = (self.context)();
        let response = self.dispatcher.dispatch_request(inbound, &objects).await;
        Ok(WireResponse::parse(&response.to_line()?)?)
    }
}
