use crate::{errors::ResolveErrorKind, flavor::Flavor, resolver::Resolver};

/// Value that can be extracted from a resolver, used as an argument of an [`crate::Instantiator`].
pub trait DependencyResolver<F: Flavor>: Sized {
    /// # Errors
    /// Returns the first resolution error of the extracted dependencies.
    fn resolve(resolver: &Resolver<'_, F>) -> Result<Self, ResolveErrorKind>;
}

macro_rules! impl_dependency_resolver {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case, unused_mut)]
        impl<F, $($ty,)*> DependencyResolver<F> for ($($ty,)*)
        where
            F: Flavor,
            $( $ty: DependencyResolver<F>, )*
        {
            #[inline]
            #[allow(unused_variables)]
            fn resolve(resolver: &Resolver<'_, F>) -> Result<Self, ResolveErrorKind> {
                Ok(($($ty::resolve(resolver)?,)*))
            }
        }
    };
}

all_the_tuples!(impl_dependency_resolver);
