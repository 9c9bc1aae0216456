//! Single-threaded flavor: instances are shared through [`Rc`] and registrations are guarded by a [`RefCell`](core::cell::RefCell).
//!
//! Resolving from a factory, or registering through the container it gets, is allowed.

use alloc::{
    borrow::Cow,
    rc::{self, Rc},
};
use core::any::{Any, TypeId};

use crate::{
    any::TypeInfo,
    container::{ContainerInner, State},
    dependency_resolver::DependencyResolver,
    errors::{InstantiateErrorKind, ResolveErrorKind},
    flavor::{Flavor, Injectable},
    instantiator::Instantiator,
    key::ServiceKey,
    resolver,
    scope::Scope,
};

/// Marker of the single-threaded flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unsynchronized {}

pub type Container = crate::container::Container<Unsynchronized>;
pub type Resolver<'s> = resolver::Resolver<'s, Unsynchronized>;
pub type Inject<T> = crate::inject::Inject<T, Unsynchronized>;
pub type InjectOptional<T> = crate::inject::InjectOptional<T, Unsynchronized>;

type Factory = Rc<dyn Fn(&Resolver<'_>) -> Result<Rc<dyn Any>, ResolveErrorKind>>;

impl Flavor for Unsynchronized {
    type Ref<T: ?Sized + 'static> = Rc<T>;

    type Instance = Rc<dyn Any>;
    type WeakInstance = rc::Weak<dyn Any>;
    type Factory = Factory;
    type Handle = Rc<ContainerInner<Self>>;
    type WeakHandle = rc::Weak<ContainerInner<Self>>;
    type Lock = State<Self>;
    type Guard<'a> = &'a State<Self>;

    #[inline]
    fn new_handle(inner: ContainerInner<Self>) -> Self::Handle {
        Rc::new(inner)
    }

    #[inline]
    fn downgrade_handle(handle: &Self::Handle) -> Self::WeakHandle {
        Rc::downgrade(handle)
    }

    #[inline]
    fn upgrade_handle(handle: &Self::WeakHandle) -> Option<Self::Handle> {
        handle.upgrade()
    }

    #[inline]
    fn new_lock(state: State<Self>) -> Self::Lock {
        state
    }

    #[inline]
    fn lock(lock: &Self::Lock) -> Self::Guard<'_> {
        lock
    }

    #[inline]
    fn downgrade(instance: &Self::Instance) -> Self::WeakInstance {
        Rc::downgrade(instance)
    }

    #[inline]
    fn upgrade(instance: &Self::WeakInstance) -> Option<Self::Instance> {
        instance.upgrade()
    }

    #[inline]
    fn instance_type_id(instance: &Self::Instance) -> TypeId {
        (**instance).type_id()
    }

    #[inline]
    fn instantiate(factory: &Self::Factory, resolver: &Resolver<'_>) -> Result<Self::Instance, ResolveErrorKind> {
        factory(resolver)
    }
}

impl<T: 'static> Injectable<Unsynchronized> for T {
    #[inline]
    fn downcast(instance: Rc<dyn Any>) -> Result<Rc<Self>, Rc<dyn Any>> {
        instance.downcast()
    }
}

impl Container {
    /// Registers the factory of `T` without a name, replacing the previous registration of the key.
    ///
    /// The factory gets a [`Resolver`] to request its own dependencies.
    pub fn register<T, Fac>(&self, scope: Scope, factory: Fac) -> &Self
    where
        T: 'static,
        Fac: Fn(&Resolver<'_>) -> Result<T, ResolveErrorKind> + 'static,
    {
        self.register_key(ServiceKey::of::<T>(), scope, factory)
    }

    /// Registers the factory of `T` under the name, replacing the previous registration of the key.
    pub fn register_named<T, Fac>(&self, name: impl Into<Cow<'static, str>>, scope: Scope, factory: Fac) -> &Self
    where
        T: 'static,
        Fac: Fn(&Resolver<'_>) -> Result<T, ResolveErrorKind> + 'static,
    {
        self.register_key(ServiceKey::named::<T>(name), scope, factory)
    }

    /// Registers an already created value of `T` without a name as a singleton.
    /// The same instance is returned until the registration is replaced, even after [`Self::clear_cache`].
    pub fn register_instance<T: 'static>(&self, value: T) -> &Self {
        self.register_instance_key(ServiceKey::of::<T>(), value)
    }

    pub fn register_named_instance<T: 'static>(&self, name: impl Into<Cow<'static, str>>, value: T) -> &Self {
        self.register_instance_key(ServiceKey::named::<T>(name), value)
    }

    /// Registers an [`Instantiator`] of its `Provides` type without a name.
    /// Its arguments are resolved before every call.
    pub fn provide<Deps, Inst>(&self, scope: Scope, instantiator: Inst) -> &Self
    where
        Deps: DependencyResolver<Unsynchronized> + 'static,
        Inst: Instantiator<Unsynchronized, Deps>,
    {
        self.provide_key(ServiceKey::of::<Inst::Provides>(), scope, instantiator)
    }

    pub fn provide_named<Deps, Inst>(&self, name: impl Into<Cow<'static, str>>, scope: Scope, instantiator: Inst) -> &Self
    where
        Deps: DependencyResolver<Unsynchronized> + 'static,
        Inst: Instantiator<Unsynchronized, Deps>,
    {
        self.provide_key(ServiceKey::named::<Inst::Provides>(name), scope, instantiator)
    }

    fn register_key<T, Fac>(&self, key: ServiceKey, scope: Scope, factory: Fac) -> &Self
    where
        T: 'static,
        Fac: Fn(&Resolver<'_>) -> Result<T, ResolveErrorKind> + 'static,
    {
        let factory: Factory =
            Rc::new(move |resolver: &Resolver<'_>| factory(resolver).map(|instance| Rc::new(instance) as Rc<dyn Any>));
        self.register_factory(key, scope, TypeInfo::of::<T>(), factory)
    }

    fn register_instance_key<T: 'static>(&self, key: ServiceKey, value: T) -> &Self {
        let instance: Rc<dyn Any> = Rc::new(value);
        let factory: Factory = Rc::new(move |_: &Resolver<'_>| Ok::<_, ResolveErrorKind>(instance.clone()));
        self.register_factory(key, Scope::Singleton, TypeInfo::of::<T>(), factory)
    }

    fn provide_key<Deps, Inst>(&self, key: ServiceKey, scope: Scope, instantiator: Inst) -> &Self
    where
        Deps: DependencyResolver<Unsynchronized> + 'static,
        Inst: Instantiator<Unsynchronized, Deps>,
    {
        self.register_key(key, scope, move |resolver| {
            let dependencies = Deps::resolve(resolver)?;
            instantiator.instantiate(dependencies).map_err(|err| {
                let err: InstantiateErrorKind = err.into();
                ResolveErrorKind::from(err)
            })
        })
    }
}
