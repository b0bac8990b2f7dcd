//! Structured log output for weft hosts.
//!
//! Dispatch, registry, host and lifecycle events are emitted under
//! `weft_rpc::<area>` targets. [`initialise`] routes them to stderr in the
//! configured [`LogFormat`].

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use weft_config::{Config, LogFormat};

static INSTALLED: OnceCell<LogFormat> = OnceCell::new();

/// Proof that the global subscriber is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryHandle {
    format: LogFormat,
}

impl TelemetryHandle {
    /// Format chosen by the call that installed the subscriber.
    #[must_use]
    pub const fn format(self) -> LogFormat {
        self.format
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured filter expression does not parse.
    #[error("invalid log filter {filter:?}: {message}")]
    Filter {
        /// Filter expression from the configuration.
        filter: String,
        /// Parser message.
        message: String,
    },
    /// Another global subscriber is already installed.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs the global tracing subscriber on first use.
///
/// Later calls leave the global state alone and report the format that was
/// installed first.
///
/// ```rust
/// use weft_config::Config;
/// use weft_rpc::telemetry;
///
/// # fn main() -> Result<(), weft_rpc::telemetry::TelemetryError> {
/// let config = Config::default();
/// let first = telemetry::initialise(&config)?;
/// let second = telemetry::initialise(&config)?;
/// assert_eq!(first, second);
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter is invalid or another
/// subscriber owns the global slot.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    INSTALLED
        .get_or_try_init(|| install_subscriber(config))
        .map(|format| TelemetryHandle { format: *format })
}

fn parse_filter(expression: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(expression).map_err(|error| TelemetryError::Filter {
        filter: expression.to_owned(),
        message: error.to_string(),
    })
}

fn install_subscriber(config: &Config) -> Result<LogFormat, TelemetryError> {
    let filter = parse_filter(config.log_filter())?;
    let format = config.log_format();
    let colour = format.allows_colour() && io::stderr().is_terminal();

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .with_ansi(colour)
        .with_timer(fmt::time::UtcTime::rfc_3339());

    let subscriber: Box<dyn Subscriber + Send + Sync> = match format {
        LogFormat::Json => Box::new(
            builder
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .finish(),
        ),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)?;
    Ok(format)
}
