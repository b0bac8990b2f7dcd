//! Reserved error tags carried in [`WireFailure`](crate::WireFailure).
//!
//! User-defined business errors register their own tags; the names below are
//! owned by the framework and cannot be claimed by an application.

/// No binding matched the verb and route of the request.
pub const NO_SUCH_ROUTE: &str = "NoSuchRoute";

/// The request envelope or one of its arguments failed to decode.
pub const BAD_REQUEST: &str = "BadRequest";

/// Opaque failure reported for errors that are not business errors.
pub const SERVICE_FAILURE: &str = "ServiceFailure";

/// Built-in generic business error kind.
pub const SERVICE_EXCEPTION: &str = "ServiceException";

/// Returns `true` if the tag is owned by the framework.
#[must_use]
pub fn is_reserved(tag: &str) -> bool {
    matches!(
        tag,
        NO_SUCH_ROUTE | BAD_REQUEST | SERVICE_FAILURE | SERVICE_EXCEPTION
    )
}
