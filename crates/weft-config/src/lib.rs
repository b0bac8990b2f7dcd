//! Shared configuration for weft dispatch hosts and callers.
//!
//! Values are layered by `ortho_config`: built-in defaults, then an optional
//! configuration file, then `WEFT_*` environment variables, then command-line
//! flags. Hosts load a [`Config`] once at startup; the dispatcher only reads
//! it while the registry is being built.

mod defaults;
mod logging;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_LISTEN_ADDRESS, DEFAULT_LOG_FILTER, DEFAULT_MAX_REQUEST_BYTES, DEFAULT_ROUTE_PREFIX,
    default_listen_address, default_log_filter, default_log_format, default_max_request_bytes,
    default_route_prefix,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "WEFT")]
pub struct Config {
    /// Namespace prefix applied to every route, `/rpc/` by default.
    #[serde(default = "defaults::default_route_prefix_string")]
    pub route_prefix: String,
    /// `tracing` filter expression.
    #[serde(default = "defaults::default_log_filter_string")]
    pub log_filter: String,
    /// Log output format.
    #[serde(default = "defaults::default_log_format")]
    pub log_format: LogFormat,
    /// Largest request line a host accepts, in bytes.
    #[serde(default = "defaults::default_max_request_bytes")]
    pub max_request_bytes: usize,
    /// Address the reference line host binds to.
    #[serde(default = "defaults::default_listen_address_string")]
    pub listen_address: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            route_prefix: defaults::default_route_prefix_string(),
            log_filter: defaults::default_log_filter_string(),
            log_format: defaults::default_log_format(),
            max_request_bytes: defaults::default_max_request_bytes(),
            listen_address: defaults::default_listen_address_string(),
        }
    }
}

impl Config {
    /// Route prefix as configured.
    #[must_use]
    pub fn route_prefix(&self) -> &str {
        &self.route_prefix
    }

    /// Route prefix with exactly one leading and one trailing `/`.
    #[must_use]
    pub fn normalised_prefix(&self) -> String {
        normalise_prefix(&self.route_prefix)
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Request size limit in bytes.
    #[must_use]
    pub const fn max_request_bytes(&self) -> usize {
        self.max_request_bytes
    }

    /// Listen address for the reference line host.
    #[must_use]
    pub fn listen_address(&self) -> &str {
        &self.listen_address
    }

    /// Checks values that the type system cannot.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the route prefix is blank or contains
    /// characters that cannot appear in a route, or when the request limit is
    /// zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let trimmed = self.route_prefix.trim_matches('/');
        if trimmed.is_empty() {
            return Err(ConfigError::EmptyRoutePrefix);
        }
        if let Some(bad) = trimmed
            .chars()
            .find(|c| c.is_whitespace() || matches!(c, '?' | '#' | '%'))
        {
            return Err(ConfigError::InvalidRoutePrefix {
                prefix: self.route_prefix.clone(),
                character: bad,
            });
        }
        if self.max_request_bytes == 0 {
            return Err(ConfigError::ZeroRequestLimit);
        }
        Ok(())
    }
}

/// Normalises a route prefix to `/segment/.../`.
#[must_use]
pub fn normalise_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        return "/".to_owned();
    }
    format!("/{trimmed}/")
}

/// Semantic configuration errors detected after loading.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The route prefix has no path segment.
    #[error("route prefix must contain at least one path segment")]
    EmptyRoutePrefix,
    /// The route prefix contains a character that cannot appear in a route.
    #[error("route prefix '{prefix}' contains invalid character {character:?}")]
    InvalidRoutePrefix {
        /// Offending prefix.
        prefix: String,
        /// First invalid character.
        character: char,
    },
    /// The request size limit is zero.
    #[error("max_request_bytes must be greater than zero")]
    ZeroRequestLimit,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("/rpc/", "/rpc/")]
    #[case("rpc", "/rpc/")]
    #[case("//api/v1//", "/api/v1/")]
    #[case(" kv ", "/kv/")]
    #[case("/", "/")]
    fn normalises_prefixes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalise_prefix(input), expected);
    }

    #[test]
    fn default_configuration_is_valid() {
        let config = Config::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.normalised_prefix(), "/rpc/");
        assert_eq!(config.max_request_bytes(), 1024 * 1024);
    }

    #[test]
    fn rejects_blank_prefix() {
        let config = Config {
            route_prefix: "//".to_owned(),
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyRoutePrefix));
    }

    #[test]
    fn rejects_prefix_with_query_marker() {
        let config = Config {
            route_prefix: "/rpc?x/".to_owned(),
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRoutePrefix { character: '?', .. })
        ));
    }

    #[test]
    fn rejects_zero_request_limit() {
        let config = Config {
            max_request_bytes: 0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroRequestLimit));
    }
}
