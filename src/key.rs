use alloc::borrow::Cow;
use core::fmt::{self, Display, Formatter};

use crate::any::TypeInfo;

/// Identity of a registration: the provided type plus an optional name.
///
/// Two keys are equal only if both the type and the name match exactly.
/// Names are compared case-sensitively and aren't normalized.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServiceKey {
    type_info: TypeInfo,
    name: Option<Cow<'static, str>>,
}

impl ServiceKey {
    #[inline]
    #[must_use]
    pub const fn new(type_info: TypeInfo, name: Option<Cow<'static, str>>) -> Self {
        Self { type_info, name }
    }

    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(TypeInfo::of::<T>(), None)
    }

    #[inline]
    #[must_use]
    pub fn named<T: ?Sized + 'static>(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(TypeInfo::of::<T>(), Some(name.into()))
    }

    #[inline]
    #[must_use]
    pub const fn type_info(&self) -> &TypeInfo {
        &self.type_info
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl Display for ServiceKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}({name:?})", self.type_info.short_name()),
            None => write!(f, "{}", self.type_info.short_name()),
        }
    }
}
