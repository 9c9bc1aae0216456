use crate::{
    container::Container,
    dependency_resolver::DependencyResolver,
    errors::ResolveErrorKind,
    flavor::{Flavor, Injectable},
    resolver::Resolver,
    sync::Synchronized,
};

/// Extracts the dependency `T` registered without a name.
pub struct Inject<T: Injectable<F>, F: Flavor = Synchronized>(pub F::Ref<T>);

impl<T: Injectable<F>, F: Flavor> DependencyResolver<F> for Inject<T, F> {
    #[inline]
    fn resolve(resolver: &Resolver<'_, F>) -> Result<Self, ResolveErrorKind> {
        resolver.resolve().map(Self)
    }
}

/// Extracts the dependency `T` registered without a name, `None` if it isn't registered.
pub struct InjectOptional<T: Injectable<F>, F: Flavor = Synchronized>(pub Option<F::Ref<T>>);

impl<T: Injectable<F>, F: Flavor> DependencyResolver<F> for InjectOptional<T, F> {
    #[inline]
    fn resolve(resolver: &Resolver<'_, F>) -> Result<Self, ResolveErrorKind> {
        resolver.resolve_optional().map(Self)
    }
}

/// Container owning the registration being created.
///
/// Resolutions through it while the instantiator runs stay within the current session,
/// later ones start their own.
impl<F: Flavor> DependencyResolver<F> for Container<F> {
    #[inline]
    fn resolve(resolver: &Resolver<'_, F>) -> Result<Self, ResolveErrorKind> {
        Ok(resolver.container().clone())
    }
}
