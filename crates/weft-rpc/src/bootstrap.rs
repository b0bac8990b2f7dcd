//! Host bootstrap: configuration, telemetry and registry construction.
//!
//! Hosts call [`bootstrap_with`] once at startup. Registration happens
//! inside the supplied closure; the registry is frozen before the
//! [`Dispatcher`] is handed back, so no call is served against a partially
//! built registry.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;
use weft_config::{Config, ConfigError};

use crate::context::HostCapabilities;
use crate::dispatch::Dispatcher;
use crate::lifecycle::{LifecycleReporter, StructuredLifecycleReporter};
use crate::registry::{RegistrationError, RegistryBuilder};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Abstracts configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the host configuration.
    ///
    /// # Errors
    ///
    /// Returns the loader's error when configuration cannot be resolved.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that returns a fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader(pub Config);

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.0.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Configuration loaded but holds unusable values.
    #[error("invalid configuration: {source}")]
    InvalidConfiguration {
        /// Validation failure.
        #[source]
        source: ConfigError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// A service or error type was rejected by the registry.
    #[error("service registration failed: {source}")]
    Registration {
        /// Registry failure.
        #[source]
        source: RegistrationError,
    },
}

/// Result of a successful bootstrap.
#[derive(Debug)]
pub struct RpcRuntime {
    config: Config,
    dispatcher: Dispatcher,
    telemetry: TelemetryHandle,
}

impl RpcRuntime {
    /// Resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Dispatcher over the frozen registry.
    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Splits the runtime into its configuration and dispatcher.
    #[must_use]
    pub fn into_parts(self) -> (Config, Dispatcher) {
        (self.config, self.dispatcher)
    }
}

/// Bootstraps with the system loader and the structured reporter.
///
/// # Errors
///
/// As [`bootstrap_with`].
pub fn bootstrap<R>(capabilities: HostCapabilities, register: R) -> Result<RpcRuntime, BootstrapError>
where
    R: FnOnce(&mut RegistryBuilder) -> Result<(), RegistrationError>,
{
    bootstrap_with(
        &SystemConfigLoader,
        &StructuredLifecycleReporter::new(),
        capabilities,
        register,
    )
}

/// Bootstraps a dispatcher using the supplied collaborators.
///
/// `register` receives a builder seeded with the configured route prefix and
/// `capabilities`; any registration error aborts bootstrap.
///
/// # Errors
///
/// Returns [`BootstrapError`] when configuration, telemetry or registration
/// fails. The reporter sees every failure before it is returned.
pub fn bootstrap_with<R>(
    loader: &dyn ConfigLoader,
    reporter: &dyn LifecycleReporter,
    capabilities: HostCapabilities,
    register: R,
) -> Result<RpcRuntime, BootstrapError>
where
    R: FnOnce(&mut RegistryBuilder) -> Result<(), RegistrationError>,
{
    reporter.bootstrap_starting();
    let fail = |error: BootstrapError| {
        reporter.bootstrap_failed(&error);
        error
    };

    let config = loader
        .load()
        .map_err(|source| fail(BootstrapError::Configuration { source }))?;
    config
        .validate()
        .map_err(|source| fail(BootstrapError::InvalidConfiguration { source }))?;
    let telemetry = telemetry::initialise(&config)
        .map_err(|source| fail(BootstrapError::Telemetry { source }))?;

    let mut builder = RegistryBuilder::from_config(&config, capabilities);
    register(&mut builder).map_err(|source| fail(BootstrapError::Registration { source }))?;
    let registry = builder.build();
    reporter.bootstrap_succeeded(&config, &registry);

    Ok(RpcRuntime {
        config,
        dispatcher: Dispatcher::new(registry),
        telemetry,
    })
}
