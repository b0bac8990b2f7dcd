//! Dispatcher implementation.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error};
use weft_wire::{Verb, WireFailure, WireRequest, WireResponse, WireValue};

use super::DISPATCH_TARGET;
use super::errors::DispatchError;
use crate::codec;
use crate::context::ContextObjects;
use crate::descriptor::TypeDescriptor;
use crate::propagation::ErrorPropagation;
use crate::registry::ServiceRegistry;
use crate::value::Value;

/// Routes inbound calls to registered service methods.
///
/// Cheap to clone; every clone shares the same frozen registry.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ServiceRegistry>,
    propagation: ErrorPropagation,
}

impl Dispatcher {
    /// Creates a dispatcher over a frozen registry.
    #[must_use]
    pub fn new(registry: ServiceRegistry) -> Self {
        Self::from_shared(Arc::new(registry))
    }

    /// Creates a dispatcher over a shared registry.
    #[must_use]
    pub fn from_shared(registry: Arc<ServiceRegistry>) -> Self {
        let propagation = ErrorPropagation::new(Arc::clone(registry.error_registry()));
        Self {
            registry,
            propagation,
        }
    }

    /// Registry the dispatcher resolves against.
    #[must_use]
    pub const fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// Dispatches a parsed request envelope.
    pub async fn dispatch_request(
        &self,
        request: WireRequest,
        context: &ContextObjects,
    ) -> WireResponse {
        self.dispatch(request.verb, &request.route, request.body, context)
            .await
    }

    /// Dispatches one call and returns the response to write back.
    ///
    /// Never fails: every problem becomes a failure envelope. Dropping the
    /// returned future cancels the call.
    pub async fn dispatch(
        &self,
        verb: Verb,
        route: &str,
        body: Vec<WireValue>,
        context: &ContextObjects,
    ) -> WireResponse {
        match self.try_dispatch(verb, route, body, context).await {
            Ok(response) => response,
            Err(rejection) => {
                if rejection.is_fault() {
                    error!(
                        target: DISPATCH_TARGET,
                        %verb,
                        route,
                        error = %rejection,
                        "dispatch fault"
                    );
                } else {
                    debug!(
                        target: DISPATCH_TARGET,
                        %verb,
                        route,
                        error = %rejection,
                        "call rejected"
                    );
                }
                rejection.into_response()
            }
        }
    }

    async fn try_dispatch(
        &self,
        verb: Verb,
        route: &str,
        body: Vec<WireValue>,
        context: &ContextObjects,
    ) -> Result<WireResponse, DispatchError> {
        let entry = self
            .registry
            .resolve(verb, route)
            .ok_or_else(|| DispatchError::no_such_route(verb, route))?;
        let binding = entry.binding();
        let arguments = decode_arguments(route, binding.parameters(), body)?;

        let invoker = entry.invoker();
        let injected = self
            .registry
            .context_adapter()
            .inject(invoker.context_kinds(), context)
            .map_err(|source| DispatchError::context(route, source))?;

        let returns = binding.returns();
        let outcome = AssertUnwindSafe(invoker.invoke(injected, arguments))
            .catch_unwind()
            .await;
        let value = match outcome {
            Ok(Ok(value)) => wrap_success(value, returns),
            Ok(Err(raised)) => {
                let failure = self.propagation.classify(route, raised).into_failure();
                return respond_with_failure(route, returns, failure);
            }
            Err(payload) => {
                let failure = self
                    .propagation
                    .classify_panic(route, payload.as_ref())
                    .into_failure();
                return respond_with_failure(route, returns, failure);
            }
        };

        let encoded =
            codec::encode(&value, returns).map_err(|source| DispatchError::encode(route, source))?;
        debug!(
            target: DISPATCH_TARGET,
            %verb,
            route,
            service = entry.service(),
            method = binding.method_name(),
            "call completed"
        );
        Ok(WireResponse::success(encoded))
    }
}

/// Decodes positional arguments. Trailing optional parameters may be
/// omitted and decode as absent.
fn decode_arguments(
    route: &str,
    parameters: &[TypeDescriptor],
    body: Vec<WireValue>,
) -> Result<Vec<Value>, DispatchError> {
    let received = body.len();
    let omitted_are_optional = parameters
        .iter()
        .skip(received)
        .all(|parameter| matches!(parameter, TypeDescriptor::Optional(_)));
    if received > parameters.len() || !omitted_are_optional {
        return Err(DispatchError::argument_count(
            route,
            parameters.len(),
            received,
        ));
    }

    let mut arguments = Vec::with_capacity(parameters.len());
    let mut wire = body.into_iter();
    for (index, descriptor) in parameters.iter().enumerate() {
        let value = match wire.next() {
            Some(item) => codec::decode(&item, descriptor)
                .map_err(|source| DispatchError::decode(route, index + 1, source))?,
            None => Value::Null,
        };
        arguments.push(value);
    }
    Ok(arguments)
}

fn wrap_success(value: Value, returns: &TypeDescriptor) -> Value {
    match (returns, value) {
        (TypeDescriptor::Result(_), already @ Value::Result(_)) => already,
        (TypeDescriptor::Result(_), plain) => Value::Result(Ok(Box::new(plain))),
        (_, plain) => plain,
    }
}

fn respond_with_failure(
    route: &str,
    returns: &TypeDescriptor,
    failure: WireFailure,
) -> Result<WireResponse, DispatchError> {
    if matches!(returns, TypeDescriptor::Result(_)) {
        let encoded = codec::encode(&Value::Result(Err(failure)), returns)
            .map_err(|source| DispatchError::encode(route, source))?;
        return Ok(WireResponse::success(encoded));
    }
    Ok(WireResponse::Failure(failure))
}
