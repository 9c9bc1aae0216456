use crate::{dependency_resolver::DependencyResolver, errors::InstantiateErrorKind, flavor::Flavor};

/// Factory that declares its dependencies in its arguments.
///
/// Implemented for functions and closures returning `Result<T, E>`
/// whose arguments are all [`DependencyResolver`], up to 12 of them.
/// Register one with `provide` of a container flavor.
pub trait Instantiator<F: Flavor, Deps>: 'static
where
    Deps: DependencyResolver<F>,
{
    type Provides: 'static;
    type Error: Into<InstantiateErrorKind>;

    /// # Errors
    /// Returns the error of the factory itself.
    fn instantiate(&self, dependencies: Deps) -> Result<Self::Provides, Self::Error>;
}

macro_rules! impl_instantiator {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case)]
        impl<F, Func, Response, Err, $($ty,)*> Instantiator<F, ($($ty,)*)> for Func
        where
            F: Flavor,
            Func: Fn($($ty,)*) -> Result<Response, Err> + 'static,
            Response: 'static,
            Err: Into<InstantiateErrorKind>,
            $( $ty: DependencyResolver<F>, )*
        {
            type Provides = Response;
            type Error = Err;

            #[inline]
            fn instantiate(&self, ($($ty,)*): ($($ty,)*)) -> Result<Self::Provides, Self::Error> {
                self($($ty,)*)
            }
        }
    };
}

all_the_tuples!(impl_instantiator);

/// Creates a `Box<dyn Trait>` from a value, optionally including supertraits.
///
/// Useful to register an implementation under a trait object type.
///
/// # Syntax
/// ```text
/// boxed!(value; Trait [+ SuperTrait1 [+ SuperTrait2 ...]])
/// ```
///
/// # Examples
/// ```rust
/// use hierdi::{boxed, sync::Container};
///
/// trait UserRepo: Send + Sync {
///     fn table(&self) -> &'static str;
/// }
///
/// struct PostgresUserRepo;
///
/// impl UserRepo for PostgresUserRepo {
///     fn table(&self) -> &'static str {
///         "users"
///     }
/// }
///
/// let container = Container::new();
/// container.register_instance(boxed!(PostgresUserRepo; UserRepo));
///
/// let repo = container.resolve::<Box<dyn UserRepo>>().unwrap();
/// assert_eq!(repo.table(), "users");
/// ```
#[macro_export]
macro_rules! boxed {
    ($val:expr ; $bound:tt $($super_traits:tt)*) => {{
        extern crate alloc;
        alloc::boxed::Box::new($val) as alloc::boxed::Box<dyn $bound $($super_traits)*>
    }};
}
