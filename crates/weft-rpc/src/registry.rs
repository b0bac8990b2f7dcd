//! Service contract registry.
//!
//! Services are registered once during startup through a
//! [`RegistryBuilder`]. Every binding is checked as it is registered: the
//! parameter count, the descriptor shapes, the context kinds the factory
//! consumes and the uniqueness of its `(verb, route)` pair across every
//! service. A failed check rejects the whole service. [`RegistryBuilder::build`]
//! freezes the result into a [`ServiceRegistry`], which is read-only and
//! shared between concurrent dispatches without locking.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};
use weft_config::{Config, normalise_prefix};
use weft_wire::Verb;

use crate::context::{ContextAdapter, ContextKind, HostCapabilities};
use crate::contract::{MAX_PARAMETERS, MethodBinding, ServiceContract};
use crate::descriptor::DescriptorError;
use crate::errors::{ErrorRegistry, RemoteException};
use crate::service::{Invoker, ServiceDefinition, ServiceFactory};

/// Tracing target for registration.
pub(crate) const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

/// Startup failures. Each one aborts startup.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// Two bindings resolve to the same verb and route.
    #[error("{verb} {route} is bound by both {existing} and {duplicate}")]
    RouteCollision {
        /// Shared verb.
        verb: Verb,
        /// Shared route.
        route: String,
        /// Binding registered first, as `Service.method`.
        existing: String,
        /// Binding that collided, as `Service.method`.
        duplicate: String,
    },
    /// A factory consumes a context kind the host cannot supply.
    #[error("service {service} needs the {kind} context object, which this host cannot supply")]
    UnsupportedContext {
        /// Service name.
        service: String,
        /// Unsupported kind.
        kind: ContextKind,
    },
    /// A parameter or return descriptor is illegal.
    #[error("{service}.{method} {position}: {source}")]
    IllegalDescriptor {
        /// Service name.
        service: String,
        /// Method name.
        method: String,
        /// Which descriptor, for example `parameter 2` or `return type`.
        position: String,
        /// Shape problem.
        #[source]
        source: DescriptorError,
    },
    /// A method declares more parameters than allowed.
    #[error("{service}.{method} declares {count} parameters; at most {MAX_PARAMETERS} are allowed")]
    TooManyParameters {
        /// Service name.
        service: String,
        /// Method name.
        method: String,
        /// Declared count.
        count: usize,
    },
    /// A service name is registered twice.
    #[error("service {service} is already registered")]
    DuplicateService {
        /// Service name.
        service: String,
    },
    /// An error tag is registered twice.
    #[error("error tag '{tag}' is registered by both {existing} and {duplicate}")]
    DuplicateErrorTag {
        /// Shared tag.
        tag: String,
        /// Type registered first.
        existing: &'static str,
        /// Type that collided.
        duplicate: &'static str,
    },
    /// An error tag is owned by the framework.
    #[error("error tag '{tag}' is reserved")]
    ReservedErrorTag {
        /// Reserved tag.
        tag: String,
    },
    /// A route name cannot appear in a route.
    #[error("{service}.{method} has invalid route '{route}'")]
    InvalidRoute {
        /// Service name.
        service: String,
        /// Method name.
        method: String,
        /// Offending route name.
        route: String,
    },
}

/// A resolved binding.
pub struct RouteEntry {
    service: String,
    route: String,
    binding: MethodBinding,
    invoker: Arc<dyn Invoker>,
}

impl RouteEntry {
    /// Service identity.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Full route including the prefix.
    #[must_use]
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Verb the route answers to.
    #[must_use]
    pub const fn verb(&self) -> Verb {
        self.binding.verb()
    }

    /// Bound method.
    #[must_use]
    pub const fn binding(&self) -> &MethodBinding {
        &self.binding
    }

    pub(crate) fn invoker(&self) -> &dyn Invoker {
        self.invoker.as_ref()
    }

    fn qualified_name(&self) -> String {
        format!("{}.{}", self.service, self.binding.method_name())
    }
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("service", &self.service)
            .field("route", &self.route)
            .field("binding", &self.binding)
            .finish_non_exhaustive()
    }
}

type RouteIndex = HashMap<String, BTreeMap<Verb, usize>>;

/// Collects services during startup.
pub struct RegistryBuilder {
    prefix: String,
    adapter: ContextAdapter,
    entries: Vec<RouteEntry>,
    index: RouteIndex,
    contracts: Vec<ServiceContract>,
    errors: ErrorRegistry,
}

impl RegistryBuilder {
    /// Creates a builder for routes under `prefix`.
    ///
    /// The prefix is normalised to start and end with `/`.
    #[must_use]
    pub fn new(prefix: &str, capabilities: HostCapabilities) -> Self {
        Self {
            prefix: normalise_prefix(prefix),
            adapter: ContextAdapter::new(capabilities),
            entries: Vec::new(),
            index: HashMap::new(),
            contracts: Vec::new(),
            errors: ErrorRegistry::new(),
        }
    }

    /// Creates a builder using the configured route prefix.
    #[must_use]
    pub fn from_config(config: &Config, capabilities: HostCapabilities) -> Self {
        Self::new(config.route_prefix(), capabilities)
    }

    /// Normalised route prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Registers a user-defined business error type.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::DuplicateErrorTag`] or
    /// [`RegistrationError::ReservedErrorTag`].
    pub fn register_error<E: RemoteException>(&mut self) -> Result<(), RegistrationError> {
        self.errors.register::<E>()?;
        debug!(target: REGISTRY_TARGET, tag = E::TAG, "registered error tag");
        Ok(())
    }

    /// Registers a service and all of its bindings.
    ///
    /// Nothing is registered when any check fails.
    ///
    /// # Errors
    ///
    /// Returns the first [`RegistrationError`] found.
    pub fn register<F: ServiceFactory>(
        &mut self,
        definition: ServiceDefinition<F>,
    ) -> Result<(), RegistrationError> {
        let service = definition.name().to_owned();
        if self.contracts.iter().any(|contract| contract.name() == service) {
            return Err(RegistrationError::DuplicateService { service });
        }
        if let Some(kind) = self.adapter.unsupported(definition.context_kinds()) {
            return Err(RegistrationError::UnsupportedContext { service, kind });
        }

        let (_, methods) = definition.into_parts();
        let mut staged: Vec<RouteEntry> = Vec::with_capacity(methods.len());
        for (binding, invoker) in methods {
            check_binding(&service, &binding)?;
            let route = binding.route(&self.prefix);
            let entry = RouteEntry {
                service: service.clone(),
                route,
                binding,
                invoker,
            };
            if let Some(existing) = self
                .lookup(entry.verb(), entry.route())
                .or_else(|| {
                    staged
                        .iter()
                        .find(|other| other.verb() == entry.verb() && other.route == entry.route)
                })
            {
                return Err(RegistrationError::RouteCollision {
                    verb: entry.verb(),
                    route: entry.route.clone(),
                    existing: existing.qualified_name(),
                    duplicate: entry.qualified_name(),
                });
            }
            staged.push(entry);
        }

        let bindings = staged.iter().map(|entry| entry.binding.clone()).collect();
        for entry in staged {
            debug!(
                target: REGISTRY_TARGET,
                service = %entry.service,
                verb = %entry.verb(),
                route = %entry.route,
                method = entry.binding.method_name(),
                "bound route"
            );
            let position = self.entries.len();
            self.index
                .entry(entry.route.clone())
                .or_default()
                .insert(entry.verb(), position);
            self.entries.push(entry);
        }
        let contract = ServiceContract::new(service, bindings);
        info!(
            target: REGISTRY_TARGET,
            service = contract.name(),
            bindings = contract.bindings().len(),
            "registered service"
        );
        self.contracts.push(contract);
        Ok(())
    }

    /// Freezes the registry.
    #[must_use]
    pub fn build(self) -> ServiceRegistry {
        info!(
            target: REGISTRY_TARGET,
            prefix = %self.prefix,
            services = self.contracts.len(),
            routes = self.entries.len(),
            "registry sealed"
        );
        ServiceRegistry {
            prefix: self.prefix,
            adapter: self.adapter,
            entries: self.entries,
            index: self.index,
            contracts: self.contracts,
            errors: Arc::new(self.errors),
        }
    }

    fn lookup(&self, verb: Verb, route: &str) -> Option<&RouteEntry> {
        lookup(&self.index, &self.entries, verb, route)
    }
}

fn lookup<'a>(
    index: &RouteIndex,
    entries: &'a [RouteEntry],
    verb: Verb,
    route: &str,
) -> Option<&'a RouteEntry> {
    index
        .get(route)
        .and_then(|verbs| verbs.get(&verb))
        .and_then(|position| entries.get(*position))
}

fn check_binding(service: &str, binding: &MethodBinding) -> Result<(), RegistrationError> {
    let method = binding.method_name();
    let count = binding.parameters().len();
    if count > MAX_PARAMETERS {
        return Err(RegistrationError::TooManyParameters {
            service: service.to_owned(),
            method: method.to_owned(),
            count,
        });
    }
    let illegal = |position: String, source| RegistrationError::IllegalDescriptor {
        service: service.to_owned(),
        method: method.to_owned(),
        position,
        source,
    };
    for (index, parameter) in binding.parameters().iter().enumerate() {
        parameter
            .validate_parameter()
            .map_err(|source| illegal(format!("parameter {}", index + 1), source))?;
    }
    binding
        .returns()
        .validate_return()
        .map_err(|source| illegal("return type".to_owned(), source))?;

    let route = binding.route_name();
    let invalid = route.is_empty()
        || route
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '?' | '#' | '%'));
    if invalid {
        return Err(RegistrationError::InvalidRoute {
            service: service.to_owned(),
            method: method.to_owned(),
            route,
        });
    }
    Ok(())
}

/// Frozen registry shared by every dispatch.
pub struct ServiceRegistry {
    prefix: String,
    adapter: ContextAdapter,
    entries: Vec<RouteEntry>,
    index: RouteIndex,
    contracts: Vec<ServiceContract>,
    errors: Arc<ErrorRegistry>,
}

impl ServiceRegistry {
    /// Resolves a verb and full route.
    #[must_use]
    pub fn resolve(&self, verb: Verb, route: &str) -> Option<&RouteEntry> {
        lookup(&self.index, &self.entries, verb, route)
    }

    /// Returns `true` when `route` is bound under any verb.
    #[must_use]
    pub fn has_route(&self, route: &str) -> bool {
        self.index.contains_key(route)
    }

    /// Every binding with its service, in registration order.
    pub fn all_bindings(&self) -> impl Iterator<Item = (&str, &MethodBinding)> {
        self.contracts.iter().flat_map(|contract| {
            contract
                .bindings()
                .iter()
                .map(move |binding| (contract.name(), binding))
        })
    }

    /// Every resolved route, in registration order.
    pub fn routes(&self) -> impl Iterator<Item = &RouteEntry> {
        self.entries.iter()
    }

    /// Contract registered under `name`.
    #[must_use]
    pub fn contract(&self, name: &str) -> Option<&ServiceContract> {
        self.contracts.iter().find(|contract| contract.name() == name)
    }

    /// Contracts in registration order.
    #[must_use]
    pub fn contracts(&self) -> &[ServiceContract] {
        &self.contracts
    }

    /// Normalised route prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Registered business error tags.
    #[must_use]
    pub fn error_registry(&self) -> &Arc<ErrorRegistry> {
        &self.errors
    }

    /// Context adapter for the host.
    #[must_use]
    pub const fn context_adapter(&self) -> &ContextAdapter {
        &self.adapter
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("prefix", &self.prefix)
            .field("contracts", &self.contracts)
            .finish_non_exhaustive()
    }
}
