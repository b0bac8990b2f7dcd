//! Per-call context objects supplied by the host.
//!
//! A host integration declares which [`ContextKind`]s it can supply through
//! [`HostCapabilities`]. Factories declare which kinds they consume; the
//! registry checks the two against each other at registration, and the
//! [`ContextAdapter`] picks the declared kinds out of the live
//! [`ContextObjects`] on every dispatch.

use std::any::{Any, type_name};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use thiserror::Error;

/// Kind of ambient host object a factory may receive.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum ContextKind {
    /// The inbound request as the host sees it.
    Request,
    /// The caller's session.
    Session,
    /// The transport connection.
    Connection,
    /// The authenticated caller.
    Principal,
}

type ContextObject = Arc<dyn Any + Send + Sync>;

/// Objects available for one call, keyed by kind.
///
/// Built fresh by the host for every dispatch.
#[derive(Clone, Default)]
pub struct ContextObjects {
    objects: BTreeMap<ContextKind, ContextObject>,
}

impl ContextObjects {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an object, replacing any previous object of the same kind.
    #[must_use]
    pub fn with<T: Any + Send + Sync>(mut self, kind: ContextKind, object: T) -> Self {
        self.insert(kind, object);
        self
    }

    /// Adds an object, replacing any previous object of the same kind.
    pub fn insert<T: Any + Send + Sync>(&mut self, kind: ContextKind, object: T) {
        self.objects.insert(kind, Arc::new(object));
    }

    /// Returns `true` when an object of `kind` is present.
    #[must_use]
    pub fn contains(&self, kind: ContextKind) -> bool {
        self.objects.contains_key(&kind)
    }

    /// Kinds present in this set.
    pub fn kinds(&self) -> impl Iterator<Item = ContextKind> + '_ {
        self.objects.keys().copied()
    }
}

impl fmt::Debug for ContextObjects {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.objects.keys()).finish()
    }
}

/// Context objects selected for one service instance.
#[derive(Clone, Default)]
pub struct InjectedContext {
    objects: BTreeMap<ContextKind, ContextObject>,
}

impl InjectedContext {
    /// Borrows the object of `kind` as `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::NotInjected`] when the factory did not declare
    /// `kind` and [`ContextError::TypeMismatch`] when the host supplied a
    /// different type.
    pub fn get<T: Any + Send + Sync>(&self, kind: ContextKind) -> Result<&T, ContextError> {
        let object = self
            .objects
            .get(&kind)
            .ok_or(ContextError::NotInjected { kind })?;
        object
            .downcast_ref::<T>()
            .ok_or_else(|| ContextError::TypeMismatch {
                kind,
                expected: type_name::<T>(),
            })
    }

    /// Returns a shared handle to the object of `kind` as `T`.
    ///
    /// # Errors
    ///
    /// Same as [`InjectedContext::get`].
    pub fn shared<T: Any + Send + Sync>(&self, kind: ContextKind) -> Result<Arc<T>, ContextError> {
        let object = self
            .objects
            .get(&kind)
            .ok_or(ContextError::NotInjected { kind })?;
        Arc::clone(object)
            .downcast::<T>()
            .map_err(|_| ContextError::TypeMismatch {
                kind,
                expected: type_name::<T>(),
            })
    }

    /// Number of injected objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns `true` when nothing was injected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl fmt::Debug for InjectedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.objects.keys()).finish()
    }
}

/// Context failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The host did not supply a kind the factory declared.
    #[error("host did not supply the {kind} context object")]
    Missing {
        /// Missing kind.
        kind: ContextKind,
    },
    /// The factory asked for a kind it did not declare.
    #[error("the {kind} context object was not declared by the factory")]
    NotInjected {
        /// Requested kind.
        kind: ContextKind,
    },
    /// The supplied object has a different type.
    #[error("the {kind} context object is not a {expected}")]
    TypeMismatch {
        /// Requested kind.
        kind: ContextKind,
        /// Requested type.
        expected: &'static str,
    },
}

/// Context kinds a host integration can supply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCapabilities {
    kinds: BTreeSet<ContextKind>,
}

impl HostCapabilities {
    /// Host that supplies no context objects.
    #[must_use]
    pub fn none() -> Self {
        Self {
            kinds: BTreeSet::new(),
        }
    }

    /// Host that supplies every kind.
    #[must_use]
    pub fn all() -> Self {
        Self {
            kinds: ContextKind::iter().collect(),
        }
    }

    /// Host that supplies exactly `kinds`.
    pub fn with_kinds(kinds: impl IntoIterator<Item = ContextKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
        }
    }

    /// Returns `true` when the host can supply `kind`.
    #[must_use]
    pub fn supports(&self, kind: ContextKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// Kinds the host supplies.
    pub fn kinds(&self) -> impl Iterator<Item = ContextKind> + '_ {
        self.kinds.iter().copied()
    }
}

/// Selects declared context objects for a service factory.
#[derive(Debug, Clone)]
pub struct ContextAdapter {
    capabilities: HostCapabilities,
}

impl ContextAdapter {
    /// Creates an adapter for a host with the given capabilities.
    #[must_use]
    pub const fn new(capabilities: HostCapabilities) -> Self {
        Self { capabilities }
    }

    /// Host capabilities.
    #[must_use]
    pub const fn capabilities(&self) -> &HostCapabilities {
        &self.capabilities
    }

    /// Returns the first declared kind the host cannot supply.
    #[must_use]
    pub fn unsupported(&self, declared: &[ContextKind]) -> Option<ContextKind> {
        declared
            .iter()
            .copied()
            .find(|kind| !self.capabilities.supports(*kind))
    }

    /// Picks the declared kinds out of the live objects.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::Missing`] when a declared kind is absent.
    pub fn inject(
        &self,
        declared: &[ContextKind],
        available: &ContextObjects,
    ) -> Result<InjectedContext, ContextError> {
        let mut objects = BTreeMap::new();
        for &kind in declared {
            let object = available
                .objects
                .get(&kind)
                .ok_or(ContextError::Missing { kind })?;
            objects.insert(kind, Arc::clone(object));
        }
        Ok(InjectedContext { objects })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Session {
        user: String,
    }

    fn available() -> ContextObjects {
        ContextObjects::new()
            .with(
                ContextKind::Session,
                Session {
                    user: "ada".to_owned(),
                },
            )
            .with(ContextKind::Request, "GET /".to_owned())
    }

    #[test]
    fn injects_only_declared_kinds() {
        let adapter = ContextAdapter::new(HostCapabilities::all());
        let injected = adapter
            .inject(&[ContextKind::Session], &available())
            .expect("inject");
        assert_eq!(injected.len(), 1);
        let session = injected
            .get::<Session>(ContextKind::Session)
            .expect("session");
        assert_eq!(session.user, "ada");
        assert_eq!(
            injected.get::<String>(ContextKind::Request),
            Err(ContextError::NotInjected {
                kind: ContextKind::Request
            })
        );
    }

    #[test]
    fn missing_kind_fails_injection() {
        let adapter = ContextAdapter::new(HostCapabilities::all());
        let error = adapter
            .inject(&[ContextKind::Principal], &available())
            .expect_err("missing principal");
        assert_eq!(
            error,
            ContextError::Missing {
                kind: ContextKind::Principal
            }
        );
    }

    #[test]
    fn wrong_type_is_reported() {
        let adapter = ContextAdapter::new(HostCapabilities::all());
        let injected = adapter
            .inject(&[ContextKind::Request], &available())
            .expect("inject");
        assert!(matches!(
            injected.get::<Session>(ContextKind::Request),
            Err(ContextError::TypeMismatch { .. })
        ));
        let shared = injected
            .shared::<String>(ContextKind::Request)
            .expect("shared");
        assert_eq!(shared.as_str(), "GET /");
    }

    #[test]
    fn reports_unsupported_kinds() {
        let adapter = ContextAdapter::new(HostCapabilities::with_kinds([ContextKind::Request]));
        assert_eq!(
            adapter.unsupported(&[ContextKind::Request, ContextKind::Session]),
            Some(ContextKind::Session)
        );
        assert_eq!(adapter.unsupported(&[ContextKind::Request]), None);
        assert_eq!(adapter.unsupported(&[]), None);
    }
}
