/// Namespace prefix applied to every route.
pub const DEFAULT_ROUTE_PREFIX: &str = "/rpc/";

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default request size limit: 1 MiB.
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// Default listen address for the reference line host.
pub const DEFAULT_LISTEN_ADDRESS: &str = "127.0.0.1:9780";

/// Default namespace prefix.
#[must_use]
pub fn default_route_prefix() -> &'static str {
    DEFAULT_ROUTE_PREFIX
}

/// Owned route prefix used where allocation is required (e.g. serde).
pub(crate) fn default_route_prefix_string() -> String {
    DEFAULT_ROUTE_PREFIX.to_owned()
}

/// Default log filter expression.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub(crate) fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
#[must_use]
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

/// Default request size limit.
#[must_use]
pub const fn default_max_request_bytes() -> usize {
    DEFAULT_MAX_REQUEST_BYTES
}

/// Default listen address.
#[must_use]
pub fn default_listen_address() -> &'static str {
    DEFAULT_LISTEN_ADDRESS
}

pub(crate) fn default_listen_address_string() -> String {
    DEFAULT_LISTEN_ADDRESS.to_owned()
}
