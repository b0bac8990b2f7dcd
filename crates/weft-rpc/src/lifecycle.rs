//! Lifecycle reporting for hosts that bootstrap a dispatcher.

use std::sync::Arc;

use weft_config::Config;

use crate::bootstrap::BootstrapError;
use crate::registry::ServiceRegistry;

const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

/// Observer for bootstrap events.
pub trait LifecycleReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked once the registry is frozen and the dispatcher is ready.
    fn bootstrap_succeeded(&self, config: &Config, registry: &ServiceRegistry);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);
}

impl<T> LifecycleReporter for Arc<T>
where
    T: LifecycleReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config, registry: &ServiceRegistry) {
        (**self).bootstrap_succeeded(config, registry);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }
}

/// Reporter that records lifecycle events with `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredLifecycleReporter;

impl StructuredLifecycleReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl LifecycleReporter for StructuredLifecycleReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "bootstrap_starting",
            "starting dispatcher bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config, registry: &ServiceRegistry) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "bootstrap_succeeded",
            route_prefix = %registry.prefix(),
            services = registry.contracts().len(),
            routes = registry.routes().count(),
            error_tags = registry.error_registry().tags().count(),
            log_filter = %config.log_filter(),
            log_format = ?config.log_format(),
            "dispatcher bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: LIFECYCLE_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "dispatcher bootstrap failed"
        );
    }
}
