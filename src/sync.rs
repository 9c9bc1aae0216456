//! Thread-safe flavor: instances are shared through [`Arc`] and registrations are guarded by a reentrant lock.
//!
//! The lock of a container is held while one of its registrations is resolved,
//! so concurrent first resolutions of a singleton call its factory once.
//! The thread holding the lock may re-enter it: resolving from a factory,
//! or registering through the container it gets, is allowed.
//!
//! # Warning
//! A factory that blocks forever also blocks every other thread using its container.
//! Locks are taken from a child container towards its ancestors,
//! so a parent's factory must not resolve from one of its children.

use alloc::{
    borrow::Cow,
    sync::{self, Arc},
};
use core::any::{Any, TypeId};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

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

/// Marker of the thread-safe flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Synchronized {}

pub type Container = crate::container::Container<Synchronized>;
pub type Resolver<'s> = resolver::Resolver<'s, Synchronized>;
pub type Inject<T> = crate::inject::Inject<T, Synchronized>;
pub type InjectOptional<T> = crate::inject::InjectOptional<T, Synchronized>;

type Factory = Arc<dyn Fn(&Resolver<'_>) -> Result<Arc<dyn Any + Send + Sync>, ResolveErrorKind> + Send + Sync>;

impl Flavor for Synchronized {
    type Ref<T: ?Sized + 'static> = Arc<T>;

    type Instance = Arc<dyn Any + Send + Sync>;
    type WeakInstance = sync::Weak<dyn Any + Send + Sync>;
    type Factory = Factory;
    type Handle = Arc<ContainerInner<Self>>;
    type WeakHandle = sync::Weak<ContainerInner<Self>>;
    type Lock = ReentrantMutex<State<Self>>;
    type Guard<'a> = ReentrantMutexGuard<'a, State<Self>>;

    #[inline]
    fn new_handle(inner: ContainerInner<Self>) -> Self::Handle {
        Arc::new(inner)
    }

    #[inline]
    fn downgrade_handle(handle: &Self::Handle) -> Self::WeakHandle {
        Arc::downgrade(handle)
    }

    #[inline]
    fn upgrade_handle(handle: &Self::WeakHandle) -> Option<Self::Handle> {
        handle.upgrade()
    }

    #[inline]
    fn new_lock(state: State<Self>) -> Self::Lock {
        ReentrantMutex::new(state)
    }

    #[inline]
    fn lock(lock: &Self::Lock) -> Self::Guard<'_> {
        lock.lock()
    }

    #[inline]
    fn downgrade(instance: &Self::Instance) -> Self::WeakInstance {
        Arc::downgrade(instance)
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

impl<T: Send + Sync + 'static> Injectable<Synchronized> for T {
    #[inline]
    fn downcast(instance: Arc<dyn Any + Send + Sync>) -> Result<Arc<Self>, Arc<dyn Any + Send + Sync>> {
        instance.downcast()
    }
}

impl Container {
    /// Registers the factory of `T` without a name, replacing the previous registration of the key.
    ///
    /// The factory gets a [`Resolver`] to request its own dependencies.
    pub fn register<T, Fac>(&self, scope: Scope, factory: Fac) -> &Self
    where
        T: Send + Sync + 'static,
        Fac: Fn(&Resolver<'_>) -> Result<T, ResolveErrorKind> + Send + Sync + 'static,
    {
        self.register_key(ServiceKey::of::<T>(), scope, factory)
    }

    /// Registers the factory of `T` under the name, replacing the previous registration of the key.
    pub fn register_named<T, Fac>(&self, name: impl Into<Cow<'static, str>>, scope: Scope, factory: Fac) -> &Self
    where
        T: Send + Sync + 'static,
        Fac: Fn(&Resolver<'_>) -> Result<T, ResolveErrorKind> + Send + Sync + 'static,
    {
        self.register_key(ServiceKey::named::<T>(name), scope, factory)
    }

    /// Registers an already created value of `T` without a name as a singleton.
    /// The same instance is returned until the registration is replaced, even after [`Self::clear_cache`].
    pub fn register_instance<T: Send + Sync + 'static>(&self, value: T) -> &Self {
        self.register_instance_key(ServiceKey::of::<T>(), value)
    }

    pub fn register_named_instance<T: Send + Sync + 'static>(&self, name: impl Into<Cow<'static, str>>, value: T) -> &Self {
        self.register_instance_key(ServiceKey::named::<T>(name), value)
    }

    /// Registers an [`Instantiator`] of its `Provides` type without a name.
    /// Its arguments are resolved before every call.
    pub fn provide<Deps, Inst>(&self, scope: Scope, instantiator: Inst) -> &Self
    where
        Deps: DependencyResolver<Synchronized> + 'static,
        Inst: Instantiator<Synchronized, Deps> + Send + Sync,
        Inst::Provides: Send + Sync,
    {
        self.provide_key(ServiceKey::of::<Inst::Provides>(), scope, instantiator)
    }

    pub fn provide_named<Deps, Inst>(&self, name: impl Into<Cow<'static, str>>, scope: Scope, instantiator: Inst) -> &Self
    where
        Deps: DependencyResolver<Synchronized> + 'static,
        Inst: Instantiator<Synchronized, Deps> + Send + Sync,
        Inst::Provides: Send + Sync,
    {
        self.provide_key(ServiceKey::named::<Inst::Provides>(name), scope, instantiator)
    }

    fn register_key<T, Fac>(&self, key: ServiceKey, scope: Scope, factory: Fac) -> &Self
    where
        T: Send + Sync + 'static,
        Fac: Fn(&Resolver<'_>) -> Result<T, ResolveErrorKind> + Send + Sync + 'static,
    {
        let factory: Factory = Arc::new(move |resolver: &Resolver<'_>| {
            factory(resolver).map(|instance| Arc::new(instance) as Arc<dyn Any + Send + Sync>)
        });
        self.register_factory(key, scope, TypeInfo::of::<T>(), factory)
    }

    fn register_instance_key<T: Send + Sync + 'static>(&self, key: ServiceKey, value: T) -> &Self {
        let instance: Arc<dyn Any + Send + Sync> = Arc::new(value);
        let factory: Factory = Arc::new(move |_: &Resolver<'_>| Ok::<_, ResolveErrorKind>(instance.clone()));
        self.register_factory(key, Scope::Singleton, TypeInfo::of::<T>(), factory)
    }

    fn provide_key<Deps, Inst>(&self, key: ServiceKey, scope: Scope, instantiator: Inst) -> &Self
    where
        Deps: DependencyResolver<Synchronized> + 'static,
        Inst: Instantiator<Synchronized, Deps> + Send + Sync,
        Inst::Provides: Send + Sync,
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
