//! Business errors, unmarked errors and the error tag registry.
//!
//! A service method fails with a [`ServiceError`]. Business errors carry a
//! tag and a message and cross the wire verbatim when their tag is
//! registered. Everything else is unmarked: it is logged in full on the
//! server and reaches the caller as an opaque failure.

use std::any::type_name;
use std::collections::BTreeMap;

use thiserror::Error;
use weft_wire::{WireFailure, tags};

use crate::client::CallError;
use crate::registry::RegistrationError;

/// Domain error raised deliberately by a service method.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BusinessError {
    tag: String,
    message: String,
}

impl BusinessError {
    /// Creates a business error with an explicit tag.
    pub fn new(tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            message: message.into(),
        }
    }

    /// Creates the built-in generic business error.
    pub fn service_exception(message: impl Into<String>) -> Self {
        Self::new(tags::SERVICE_EXCEPTION, message)
    }

    /// Wraps a typed remote exception.
    pub fn from_exception<E: RemoteException>(exception: &E) -> Self {
        Self::new(E::TAG, exception.message())
    }

    /// Error tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Caller-visible message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns `true` when the tag belongs to `E`.
    #[must_use]
    pub fn is<E: RemoteException>(&self) -> bool {
        self.tag == E::TAG
    }

    /// Rebuilds the typed exception when the tag belongs to `E`.
    #[must_use]
    pub fn downcast<E: RemoteException>(&self) -> Option<E> {
        self.is::<E>()
            .then(|| E::from_message(self.message.clone()))
    }

    /// Wire form of the error.
    #[must_use]
    pub fn to_failure(&self) -> WireFailure {
        WireFailure::new(self.tag.clone(), self.message.clone())
    }
}

/// User-defined error type that crosses the wire transparently.
///
/// The type must be registered with the registry (and with the caller's
/// [`ErrorRegistry`]) before it is raised; an unregistered tag is treated
/// as an unmarked error.
///
/// ```
/// use thiserror::Error;
/// use weft_rpc::RemoteException;
///
/// #[derive(Debug, Error)]
/// #[error("{0}")]
/// struct PasswordExpired(String);
///
/// impl RemoteException for PasswordExpired {
///     const TAG: &'static str = "PasswordExpired";
///
///     fn from_message(message: String) -> Self {
///         Self(message)
///     }
/// }
/// ```
pub trait RemoteException: std::error::Error + Send + Sync + 'static {
    /// Wire tag for this type.
    const TAG: &'static str;

    /// Caller-visible message.
    fn message(&self) -> String {
        self.to_string()
    }

    /// Rebuilds the exception on the calling side.
    fn from_message(message: String) -> Self;
}

/// Failure returned by a service method or factory.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Deliberate domain error.
    #[error(transparent)]
    Business(#[from] BusinessError),
    /// Anything else; never shown to the caller in detail.
    #[error(transparent)]
    Unmarked(#[from] anyhow::Error),
}

impl ServiceError {
    /// Raises a typed remote exception.
    pub fn raise<E: RemoteException>(exception: E) -> Self {
        Self::Business(BusinessError::from_exception(&exception))
    }

    /// Raises the built-in generic business error.
    pub fn business(message: impl Into<String>) -> Self {
        Self::Business(BusinessError::service_exception(message))
    }

    /// Wraps any error as unmarked.
    pub fn unmarked<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Unmarked(anyhow::Error::new(error))
    }

    /// Creates an unmarked error from a message.
    pub fn msg(message: impl std::fmt::Display + std::fmt::Debug + Send + Sync + 'static) -> Self {
        Self::Unmarked(anyhow::Error::msg(message))
    }
}

impl<E: RemoteException> From<E> for BusinessError {
    fn from(exception: E) -> Self {
        Self::from_exception(&exception)
    }
}

/// Registered business error tags.
///
/// Built once at startup and read-only afterwards. The built-in
/// [`tags::SERVICE_EXCEPTION`] tag is always registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRegistry {
    entries: BTreeMap<String, &'static str>,
}

impl Default for ErrorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorRegistry {
    /// Creates a registry holding only the built-in business error.
    #[must_use]
    pub fn new() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(
            tags::SERVICE_EXCEPTION.to_owned(),
            type_name::<BusinessError>(),
        );
        Self { entries }
    }

    /// Registers the tag of `E`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::ReservedErrorTag`] for framework tags and
    /// [`RegistrationError::DuplicateErrorTag`] when the tag is taken.
    pub fn register<E: RemoteException>(&mut self) -> Result<(), RegistrationError> {
        self.register_tag(E::TAG, type_name::<E>())
    }

    pub(crate) fn register_tag(
        &mut self,
        tag: &str,
        type_name: &'static str,
    ) -> Result<(), RegistrationError> {
        if tags::is_reserved(tag) {
            return Err(RegistrationError::ReservedErrorTag {
                tag: tag.to_owned(),
            });
        }
        if let Some(existing) = self.entries.get(tag) {
            return Err(RegistrationError::DuplicateErrorTag {
                tag: tag.to_owned(),
                existing,
                duplicate: type_name,
            });
        }
        self.entries.insert(tag.to_owned(), type_name);
        Ok(())
    }

    /// Returns `true` when `tag` is registered.
    #[must_use]
    pub fn is_registered(&self, tag: &str) -> bool {
        self.entries.contains_key(tag)
    }

    /// Registered tags in order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Rebuilds the caller-side error for a wire failure.
    ///
    /// Routing and decode tags map to their own variants, registered tags
    /// become [`CallError::Business`], and anything else is an opaque
    /// [`CallError::Failure`].
    #[must_use]
    pub fn reconstruct(&self, failure: WireFailure) -> CallError {
        let WireFailure { error_tag, message } = failure;
        match error_tag.as_str() {
            tags::NO_SUCH_ROUTE => CallError::NoSuchRoute { message },
            tags::BAD_REQUEST => CallError::BadRequest { message },
            tag if self.is_registered(tag) => {
                CallError::Business(BusinessError::new(error_tag, message))
            }
            _ => CallError::Failure {
                tag: error_tag,
                message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[derive(Debug, Error)]
    #[error("{0}")]
    struct PasswordExpired(String);

    impl RemoteException for PasswordExpired {
        const TAG: &'static str = "PasswordExpired";

        fn from_message(message: String) -> Self {
            Self(message)
        }
    }

    #[derive(Debug, Error)]
    #[error("reserved")]
    struct Squatter;

    impl RemoteException for Squatter {
        const TAG: &'static str = tags::BAD_REQUEST;

        fn from_message(_message: String) -> Self {
            Self
        }
    }

    #[test]
    fn downcast_rebuilds_registered_type() {
        let error = BusinessError::from(PasswordExpired("change it".to_owned()));
        assert!(error.is::<PasswordExpired>());
        let typed = error.downcast::<PasswordExpired>().expect("typed");
        assert_eq!(typed.0, "change it");
    }

    #[test]
    fn builtin_tag_is_always_registered() {
        let registry = ErrorRegistry::new();
        assert!(registry.is_registered(tags::SERVICE_EXCEPTION));
        assert!(!registry.is_registered(PasswordExpired::TAG));
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = ErrorRegistry::new();
        registry.register::<PasswordExpired>().expect("first");
        let error = registry
            .register::<PasswordExpired>()
            .expect_err("duplicate");
        assert!(matches!(error, RegistrationError::DuplicateErrorTag { .. }));
    }

    #[test]
    fn reserved_tags_cannot_be_claimed() {
        let mut registry = ErrorRegistry::new();
        assert!(matches!(
            registry.register::<Squatter>(),
            Err(RegistrationError::ReservedErrorTag { .. })
        ));
    }

    #[rstest]
    #[case(tags::NO_SUCH_ROUTE, "NoSuchRoute")]
    #[case(tags::BAD_REQUEST, "BadRequest")]
    #[case(tags::SERVICE_EXCEPTION, "Business")]
    #[case("PasswordExpired", "Business")]
    #[case("Unregistered", "Failure")]
    #[case(tags::SERVICE_FAILURE, "Failure")]
    fn reconstructs_by_tag(#[case] tag: &str, #[case] expected: &str) {
        let mut registry = ErrorRegistry::new();
        registry.register::<PasswordExpired>().expect("register");
        let error = registry.reconstruct(WireFailure::new(tag, "message"));
        let kind = match error {
            CallError::NoSuchRoute { .. } => "NoSuchRoute",
            CallError::BadRequest { .. } => "BadRequest",
            CallError::Business(_) => "Business",
            CallError::Failure { .. } => "Failure",
            other => panic!("unexpected error {other}"),
        };
        assert_eq!(kind, expected);
    }

    #[test]
    fn unmarked_errors_keep_their_chain() {
        let io = std::io::Error::other("disk on fire");
        let error = ServiceError::unmarked(io);
        assert_eq!(error.to_string(), "disk on fire");
        assert!(matches!(error, ServiceError::Unmarked(_)));
    }
}
