use alloc::borrow::Cow;
use core::fmt::{self, Display, Formatter};

/// Lifetime policy of a registration.
///
/// ## Variants
/// - `Transient`:
///   The factory is called on every resolution, nothing is retained.
/// - `Singleton`:
///   The first created instance is cached and returned until the cache is cleared.
/// - `Weak`:
///   The container keeps only a weak reference to the created instance.
///   While some caller still owns it, resolutions return the same instance,
///   after the last owner drops it, the next resolution creates a new one.
/// - `Scoped`:
///   Cached like `Singleton`, but all registrations bound to the same [`ScopeId`]
///   can be cleared at once with [`crate::Container::reset_scope`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Transient,
    Singleton,
    Weak,
    Scoped(ScopeId),
}

impl Scope {
    #[inline]
    #[must_use]
    pub fn scoped(id: impl Into<ScopeId>) -> Self {
        Self::Scoped(id.into())
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Scope::Transient => "transient",
            Scope::Singleton => "singleton",
            Scope::Weak => "weak",
            Scope::Scoped(id) => id.as_str(),
        }
    }

    /// Whether the created instance is retained, strongly or weakly.
    #[inline]
    #[must_use]
    pub const fn is_cached(&self) -> bool {
        !matches!(self, Scope::Transient)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeId(Cow<'static, str>);

impl ScopeId {
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for ScopeId {
    fn from(name: &'static str) -> Self {
        Self::new(name)
    }
}

impl From<alloc::string::String> for ScopeId {
    fn from(name: alloc::string::String) -> Self {
        Self::new(name)
    }
}

impl Display for ScopeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
