use alloc::borrow::Cow;

use crate::{
    container::Container,
    errors::ResolveErrorKind,
    flavor::{Flavor, Injectable},
    key::ServiceKey,
    sync::Synchronized,
    tracker::Session,
};

/// Capability handed to factories for requesting their own dependencies.
///
/// It's bound to the container that owns the registration being created and to the resolution
/// session of the call that triggered it, so cycles are detected across nested resolutions.
///
/// # Notes
/// The resolver borrows the session and can't outlive the factory call.
/// To resolve lazily later, keep [`Self::container`] instead.
pub struct Resolver<'s, F: Flavor = Synchronized> {
    container: Container<F>,
    session: &'s Session,
}

impl<'s, F: Flavor> Resolver<'s, F> {
    #[inline]
    #[must_use]
    pub(crate) const fn new(container: Container<F>, session: &'s Session) -> Self {
        Self { container, session }
    }

    /// Resolves a dependency registered without a name.
    ///
    /// # Errors
    /// See [`Container::resolve`].
    #[inline]
    pub fn resolve<T: Injectable<F>>(&self) -> Result<F::Ref<T>, ResolveErrorKind> {
        self.container.require(&ServiceKey::of::<T>(), self.session)
    }

    /// Resolves a dependency registered under the name.
    ///
    /// # Errors
    /// See [`Container::resolve`].
    #[inline]
    pub fn resolve_named<T: Injectable<F>>(&self, name: impl Into<Cow<'static, str>>) -> Result<F::Ref<T>, ResolveErrorKind> {
        self.container.require(&ServiceKey::named::<T>(name), self.session)
    }

    /// Resolves a dependency registered without a name, `None` if it isn't registered.
    ///
    /// # Errors
    /// See [`Container::resolve_optional`].
    #[inline]
    pub fn resolve_optional<T: Injectable<F>>(&self) -> Result<Option<F::Ref<T>>, ResolveErrorKind> {
        self.container.lookup(&ServiceKey::of::<T>(), self.session)
    }

    /// Resolves a dependency registered under the name, `None` if it isn't registered.
    ///
    /// # Errors
    /// See [`Container::resolve_optional`].
    #[inline]
    pub fn resolve_optional_named<T: Injectable<F>>(
        &self,
        name: impl Into<Cow<'static, str>>,
    ) -> Result<Option<F::Ref<T>>, ResolveErrorKind> {
        self.container.lookup(&ServiceKey::named::<T>(name), self.session)
    }

    /// Resolver bound to the parent container within the same session.
    ///
    /// Lets a child registration decorate the parent's registration of the same key
    /// without it being reported as a cycle.
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Resolver<'s, F>> {
        self.container.parent().map(|parent| Resolver::new(parent, self.session))
    }

    /// Container the registration being created belongs to.
    ///
    /// Resolutions through it while the factory runs stay within the current session.
    #[inline]
    #[must_use]
    pub const fn container(&self) -> &Container<F> {
        &self.container
    }
}
