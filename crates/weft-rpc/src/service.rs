//! Service definitions: a factory plus bound method handlers.
//!
//! A [`ServiceDefinition`] is what a build-time contract generator (or a
//! hand-written module) hands to the registry. It pairs a
//! [`ServiceFactory`], which builds one service instance per call, with the
//! [`MethodBinding`]s and the async handlers that implement them.

use std::collections::VecDeque;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::context::{ContextKind, InjectedContext};
use crate::contract::MethodBinding;
use crate::errors::ServiceError;
use crate::value::{FromValue, IntoValue, Value};

/// Future returned by a bound method.
pub type MethodFuture = BoxFuture<'static, Result<Value, ServiceError>>;

/// Builds one service instance per call.
pub trait ServiceFactory: Send + Sync + 'static {
    /// Service implementation type.
    type Service: Send + Sync + 'static;

    /// Context kinds the factory consumes, in declaration order.
    fn context_kinds(&self) -> &[ContextKind] {
        &[]
    }

    /// Builds a service instance from the injected context objects.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when the instance cannot be built; the error
    /// is propagated like any method failure.
    fn create(&self, context: &InjectedContext) -> Result<Self::Service, ServiceError>;
}

/// Factory backed by a closure.
pub struct FnFactory<F, S> {
    create: F,
    kinds: Vec<ContextKind>,
    _service: PhantomData<fn() -> S>,
}

/// Creates a factory from a closure.
///
/// ```
/// use weft_rpc::{ContextKind, factory_fn};
///
/// struct Greeter;
///
/// let factory = factory_fn(|_context| Ok(Greeter)).with_context(ContextKind::Session);
/// # let _ = factory;
/// ```
pub fn factory_fn<F, S>(create: F) -> FnFactory<F, S>
where
    F: Fn(&InjectedContext) -> Result<S, ServiceError> + Send + Sync + 'static,
    S: Send + Sync + 'static,
{
    FnFactory {
        create,
        kinds: Vec::new(),
        _service: PhantomData,
    }
}

impl<F, S> FnFactory<F, S> {
    /// Declares a consumed context kind.
    #[must_use]
    pub fn with_context(mut self, kind: ContextKind) -> Self {
        self.kinds.push(kind);
        self
    }
}

impl<F, S> ServiceFactory for FnFactory<F, S>
where
    F: Fn(&InjectedContext) -> Result<S, ServiceError> + Send + Sync + 'static,
    S: Send + Sync + 'static,
{
    type Service = S;

    fn context_kinds(&self) -> &[ContextKind] {
        &self.kinds
    }

    fn create(&self, context: &InjectedContext) -> Result<S, ServiceError> {
        (self.create)(context)
    }
}

/// Decoded positional arguments handed to a method handler.
#[derive(Debug, Default)]
pub struct CallArgs {
    values: VecDeque<Value>,
}

impl CallArgs {
    /// Wraps decoded arguments.
    #[must_use]
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values: values.into(),
        }
    }

    /// Takes the next argument and converts it.
    ///
    /// # Errors
    ///
    /// Returns an unmarked [`ServiceError`] when no argument is left or the
    /// conversion fails; both mean the handler disagrees with its binding.
    pub fn take<T: FromValue>(&mut self) -> Result<T, ServiceError> {
        let value = self
            .values
            .pop_front()
            .ok_or_else(|| ServiceError::msg("handler read more arguments than were bound"))?;
        T::from_value(value).map_err(ServiceError::unmarked)
    }

    /// Number of arguments not yet taken.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

type Handler<S> = dyn Fn(Arc<S>, CallArgs) -> MethodFuture + Send + Sync;

/// Object-safe view of one bound method, used by the registry.
pub(crate) trait Invoker: Send + Sync {
    fn context_kinds(&self) -> &[ContextKind];

    fn invoke(&self, context: InjectedContext, args: Vec<Value>) -> MethodFuture;
}

struct BoundMethod<F: ServiceFactory> {
    factory: Arc<F>,
    handler: Arc<Handler<F::Service>>,
}

impl<F: ServiceFactory> Invoker for BoundMethod<F> {
    fn context_kinds(&self) -> &[ContextKind] {
        self.factory.context_kinds()
    }

    fn invoke(&self, context: InjectedContext, args: Vec<Value>) -> MethodFuture {
        let factory = Arc::clone(&self.factory);
        let handler = Arc::clone(&self.handler);
        async move {
            let service = Arc::new(factory.create(&context)?);
            handler(service, CallArgs::new(args)).await
        }
        .boxed()
    }
}

/// A named service: factory plus bound methods.
pub struct ServiceDefinition<F: ServiceFactory> {
    name: String,
    factory: Arc<F>,
    methods: Vec<(MethodBinding, Arc<Handler<F::Service>>)>,
}

impl<F: ServiceFactory> ServiceDefinition<F> {
    /// Starts a definition for the service `name`.
    pub fn new(name: impl Into<String>, factory: F) -> Self {
        Self {
            name: name.into(),
            factory: Arc::new(factory),
            methods: Vec::new(),
        }
    }

    /// Binds a method handler.
    ///
    /// The handler receives its own service instance and the decoded
    /// arguments, and may await freely; blocking work belongs on
    /// `tokio::task::spawn_blocking`.
    #[must_use]
    pub fn method<H, Fut, R>(mut self, binding: MethodBinding, handler: H) -> Self
    where
        H: Fn(Arc<F::Service>, CallArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ServiceError>> + Send + 'static,
        R: IntoValue + 'static,
    {
        let erased: Arc<Handler<F::Service>> =
            Arc::new(move |service: Arc<F::Service>, args: CallArgs| {
                handler(service, args)
                    .map(|outcome| outcome.map(IntoValue::into_value))
                    .boxed()
            });
        self.methods.push((binding, erased));
        self
    }

    /// Service identity.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Context kinds the factory consumes.
    #[must_use]
    pub fn context_kinds(&self) -> &[ContextKind] {
        self.factory.context_kinds()
    }

    /// Declared bindings in order.
    pub fn bindings(&self) -> impl Iterator<Item = &MethodBinding> {
        self.methods.iter().map(|(binding, _)| binding)
    }

    pub(crate) fn into_parts(self) -> (String, Vec<(MethodBinding, Arc<dyn Invoker>)>) {
        let factory = self.factory;
        let methods = self
            .methods
            .into_iter()
            .map(|(binding, handler)| {
                let invoker: Arc<dyn Invoker> = Arc::new(BoundMethod {
                    factory: Arc::clone(&factory),
                    handler,
                });
                (binding, invoker)
            })
            .collect();
        (self.name, methods)
    }
}
