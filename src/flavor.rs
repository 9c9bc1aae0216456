use core::{any::TypeId, ops::Deref};

use crate::{
    container::{ContainerInner, State},
    errors::ResolveErrorKind,
    resolver::Resolver,
};

/// Threading model of a container.
///
/// The resolution engine is written once against this trait.
/// [`crate::sync::Synchronized`] and [`crate::unsync::Unsynchronized`] are the only implementors,
/// they pick the pointer types and the lock guarding the container state.
pub trait Flavor: Sized + 'static {
    /// Shared handle to a resolved instance, `Rc<T>` or `Arc<T>`.
    type Ref<T: ?Sized + 'static>: Clone + Deref<Target = T>;

    #[doc(hidden)]
    type Instance: Clone;
    #[doc(hidden)]
    type WeakInstance: Clone;
    #[doc(hidden)]
    type Factory: Clone;
    #[doc(hidden)]
    type Handle: Clone + Deref<Target = ContainerInner<Self>>;
    #[doc(hidden)]
    type WeakHandle: Clone;
    #[doc(hidden)]
    type Lock;
    #[doc(hidden)]
    type Guard<'a>: Deref<Target = State<Self>>
    where
        Self: 'a;

    #[doc(hidden)]
    fn new_handle(inner: ContainerInner<Self>) -> Self::Handle;
    #[doc(hidden)]
    fn downgrade_handle(handle: &Self::Handle) -> Self::WeakHandle;
    #[doc(hidden)]
    fn upgrade_handle(handle: &Self::WeakHandle) -> Option<Self::Handle>;

    #[doc(hidden)]
    fn new_lock(state: State<Self>) -> Self::Lock;
    /// Acquires the lock for the duration of the returned guard.
    /// Must be re-acquirable by the thread already holding it.
    #[doc(hidden)]
    fn lock(lock: &Self::Lock) -> Self::Guard<'_>;

    #[doc(hidden)]
    fn downgrade(instance: &Self::Instance) -> Self::WeakInstance;
    #[doc(hidden)]
    fn upgrade(instance: &Self::WeakInstance) -> Option<Self::Instance>;
    #[doc(hidden)]
    fn instance_type_id(instance: &Self::Instance) -> TypeId;

    #[doc(hidden)]
    fn instantiate(factory: &Self::Factory, resolver: &Resolver<'_, Self>) -> Result<Self::Instance, ResolveErrorKind>;
}

/// Types that can be stored in and resolved from a container of flavor `F`.
///
/// Implemented for every `'static` type in the unsynchronized flavor
/// and for every `Send + Sync + 'static` type in the synchronized one.
pub trait Injectable<F: Flavor>: Sized + 'static {
    #[doc(hidden)]
    fn downcast(instance: F::Instance) -> Result<F::Ref<Self>, F::Instance>;
}
