use alloc::boxed::Box;
use core::fmt::{self, Display, Formatter};

use super::instantiate::InstantiateErrorKind;
use crate::{any::TypeInfo, key::ServiceKey};

#[derive(thiserror::Error, Debug)]
pub enum ResolveErrorKind {
    #[error("No registration found for {key} in the container chain")]
    NotRegistered { key: ServiceKey },
    #[error("Cyclic dependency detected: {path}")]
    CircularDependency { path: CyclePath },
    #[error(
        "Incorrect type registered for {key}. Expected: {}, found: {}",
        expected.name, found.name,
    )]
    TypeMismatch {
        key: ServiceKey,
        expected: TypeInfo,
        found: TypeInfo,
    },
    #[error(transparent)]
    Factory(InstantiateErrorKind),
}

impl From<InstantiateErrorKind> for ResolveErrorKind {
    #[inline]
    fn from(err: InstantiateErrorKind) -> Self {
        match err {
            InstantiateErrorKind::Custom(err) => err.into(),
        }
    }
}

/// A nested resolution error carried by the `anyhow` error is returned unchanged.
impl From<anyhow::Error> for ResolveErrorKind {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<Self>() {
            Ok(err) => err,
            Err(err) => Self::Factory(InstantiateErrorKind::Custom(err)),
        }
    }
}

/// Keys in flight when a cycle was detected, ending with the key that was requested again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclePath(Box<[ServiceKey]>);

impl CyclePath {
    #[inline]
    #[must_use]
    pub(crate) fn new(keys: Box<[ServiceKey]>) -> Self {
        Self(keys)
    }

    #[inline]
    #[must_use]
    pub fn keys(&self) -> &[ServiceKey] {
        &self.0
    }
}

impl Display for CyclePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut keys = self.0.iter();
        if let Some(key) = keys.next() {
            write!(f, "{key}")?;
        }
        for key in keys {
            write!(f, " -> {key}")?;
        }
        Ok(())
    }
}
