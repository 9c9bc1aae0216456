use alloc::{borrow::Cow, vec::Vec};
use core::{
    cell::RefCell,
    fmt::{self, Debug, Formatter},
};
use tracing::{debug, error, info_span, warn};

use crate::{
    any::TypeInfo,
    config::{Config, MissingPolicy},
    errors::ResolveErrorKind,
    flavor::{Flavor, Injectable},
    key::ServiceKey,
    registration::{Registration, Resolved},
    registry::Registry,
    resolver::Resolver,
    scope::{Scope, ScopeId},
    sync::Synchronized,
    tracker::{ActiveSessions, ContainerId, Frame, Session},
};

/// Registry of factories keyed by [`ServiceKey`] that resolves instances according to their [`Scope`].
///
/// The container is a cheap handle, clones share the same registrations.
/// A child container created by [`Self::create_child`] sees all registrations of its ancestors,
/// and its own registrations shadow theirs without changing them.
///
/// The flavor decides the threading model, see [`crate::sync`] and [`crate::unsync`].
pub struct Container<F: Flavor = Synchronized> {
    pub(crate) inner: F::Handle,
}

#[doc(hidden)]
pub struct ContainerInner<F: Flavor> {
    pub(crate) id: ContainerId,
    pub(crate) config: Config,
    pub(crate) state: F::Lock,
    /// Doesn't keep the parent alive
    pub(crate) parent: Option<F::WeakHandle>,
}

/// Everything guarded by the lock of a container.
#[doc(hidden)]
pub struct State<F: Flavor> {
    pub(crate) registry: RefCell<Registry<F>>,
    /// Resolutions running a factory of this container
    pub(crate) active: ActiveSessions,
}

impl<F: Flavor> State<F> {
    fn new() -> Self {
        Self {
            registry: RefCell::new(Registry::new()),
            active: ActiveSessions::default(),
        }
    }
}

impl<F: Flavor> Clone for Container<F> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<F: Flavor> Debug for Container<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.inner.id)
            .field("config", &self.inner.config)
            .field("has_parent", &self.inner.parent.is_some())
            .finish_non_exhaustive()
    }
}

impl<F: Flavor> Default for Container<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Flavor> Container<F> {
    /// Creates a root container with default config.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    #[inline]
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Self::init(config, None)
    }

    fn init(config: Config, parent: Option<F::WeakHandle>) -> Self {
        let id = ContainerId::next();
        debug!(container = %id, has_parent = parent.is_some(), "Container created");

        Self {
            inner: F::new_handle(ContainerInner {
                id,
                config,
                state: F::new_lock(State::new()),
                parent,
            }),
        }
    }

    /// Creates a child container that inherits the config of this one.
    ///
    /// # Notes
    /// The child holds its parent weakly: keep the parent alive as long as the child resolves through it.
    /// Once the parent is dropped, keys missing in the child are reported as not registered.
    #[inline]
    #[must_use]
    pub fn create_child(&self) -> Self {
        self.create_child_with_config(self.inner.config)
    }

    #[inline]
    #[must_use]
    pub fn create_child_with_config(&self, config: Config) -> Self {
        Self::init(config, Some(F::downgrade_handle(&self.inner)))
    }

    /// Returns the parent container if this one is a child and the parent is still alive.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let inner = F::upgrade_handle(self.inner.parent.as_ref()?)?;
        Some(Self { inner })
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> ContainerId {
        self.inner.id
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> Config {
        self.inner.config
    }

    /// Inserts a type-erased factory under the key, replacing the previous registration and its cache.
    ///
    /// `provides` must describe the type of the instances created by the factory.
    /// If it differs from the key's type, resolutions of the key fail with [`ResolveErrorKind::TypeMismatch`].
    pub(crate) fn register_factory(&self, key: ServiceKey, scope: Scope, provides: TypeInfo, factory: F::Factory) -> &Self {
        let span = info_span!("register", dependency = %key, container = %self.inner.id, scope = scope.name());
        let _guard = span.enter();

        let replaced = F::lock(&self.inner.state).registry.borrow_mut().insert(key, scope, provides, factory);
        if replaced.is_some() {
            debug!("Replaced previous registration");
        } else {
            debug!("Registered");
        }
        // The replaced cache is dropped with the lock released
        drop(replaced);

        self
    }

    /// Resolves the dependency registered without a name.
    ///
    /// The key is looked up in this container first, then in its ancestors from the nearest one.
    /// Dependencies requested by the factory are resolved within the same call,
    /// so a dependency cycle is reported instead of overflowing the stack.
    /// That includes resolutions made while the factory runs through a handle of the container owning it.
    ///
    /// # Errors
    /// - [`ResolveErrorKind::NotRegistered`] if neither this container nor its ancestors register the key
    /// - [`ResolveErrorKind::CircularDependency`] if the key is requested again while being created
    /// - [`ResolveErrorKind::TypeMismatch`] if the registration provides another type
    /// - [`ResolveErrorKind::Factory`] if the factory fails
    ///
    /// Errors of nested resolutions are returned unchanged.
    ///
    /// # Panics
    /// With [`MissingPolicy::Panic`] in the config, panics instead of returning [`ResolveErrorKind::NotRegistered`].
    #[inline]
    pub fn resolve<T: Injectable<F>>(&self) -> Result<F::Ref<T>, ResolveErrorKind> {
        self.require(&ServiceKey::of::<T>(), &self.session())
    }

    /// Resolves the dependency registered under the name.
    ///
    /// # Errors
    /// See [`Self::resolve`].
    ///
    /// # Panics
    /// See [`Self::resolve`].
    #[inline]
    pub fn resolve_named<T: Injectable<F>>(&self, name: impl Into<Cow<'static, str>>) -> Result<F::Ref<T>, ResolveErrorKind> {
        self.require(&ServiceKey::named::<T>(name), &self.session())
    }

    /// Same as [`Self::resolve`], but returns `None` if the key isn't registered.
    ///
    /// # Errors
    /// All errors of [`Self::resolve`] except [`ResolveErrorKind::NotRegistered`] for the key itself.
    /// A dependency missing for its factory is still an error.
    #[inline]
    pub fn resolve_optional<T: Injectable<F>>(&self) -> Result<Option<F::Ref<T>>, ResolveErrorKind> {
        self.lookup(&ServiceKey::of::<T>(), &self.session())
    }

    /// # Errors
    /// See [`Self::resolve_optional`].
    #[inline]
    pub fn resolve_optional_named<T: Injectable<F>>(
        &self,
        name: impl Into<Cow<'static, str>>,
    ) -> Result<Option<F::Ref<T>>, ResolveErrorKind> {
        self.lookup(&ServiceKey::named::<T>(name), &self.session())
    }

    /// Removes the registration of `T` without a name from this container.
    /// Returns `true` if there was one.
    #[inline]
    pub fn unregister<T: ?Sized + 'static>(&self) -> bool {
        self.unregister_key(&ServiceKey::of::<T>())
    }

    #[inline]
    pub fn unregister_named<T: ?Sized + 'static>(&self, name: impl Into<Cow<'static, str>>) -> bool {
        self.unregister_key(&ServiceKey::named::<T>(name))
    }

    fn unregister_key(&self, key: &ServiceKey) -> bool {
        let removed = F::lock(&self.inner.state).registry.borrow_mut().remove(key);
        match removed {
            Some(registration) => {
                debug!(dependency = %key, container = %self.inner.id, "Unregistered");
                drop(registration);
                true
            }
            None => false,
        }
    }

    /// Removes all registrations of this container, ancestors are untouched.
    pub fn reset(&self) {
        let removed = F::lock(&self.inner.state).registry.borrow_mut().take_all();
        debug!(container = %self.inner.id, count = removed.len(), "Reset");
        drop(removed);
    }

    /// Drops instances retained by the registrations of this container.
    /// Registrations stay, the next resolutions create new instances.
    ///
    /// Returns how many registrations had a retained instance.
    pub fn clear_cache(&self) -> usize {
        let evicted = F::lock(&self.inner.state).registry.borrow_mut().clear_caches();
        debug!(container = %self.inner.id, cleared = evicted.count, "Cache cleared");
        evicted.count
    }

    /// Drops instances retained by the registrations of this container bound to the scope.
    ///
    /// Returns how many registrations had a retained instance.
    pub fn reset_scope(&self, scope_id: impl Into<ScopeId>) -> usize {
        let scope_id = scope_id.into();
        let evicted = F::lock(&self.inner.state).registry.borrow_mut().clear_scope(&scope_id);
        debug!(container = %self.inner.id, scope = %scope_id, cleared = evicted.count, "Scope reset");
        evicted.count
    }

    /// Whether this container registers `T` without a name. Ancestors aren't checked.
    #[inline]
    #[must_use]
    pub fn is_registered<T: ?Sized + 'static>(&self) -> bool {
        self.contains(&ServiceKey::of::<T>())
    }

    #[inline]
    #[must_use]
    pub fn is_registered_named<T: ?Sized + 'static>(&self, name: impl Into<Cow<'static, str>>) -> bool {
        self.contains(&ServiceKey::named::<T>(name))
    }

    fn contains(&self, key: &ServiceKey) -> bool {
        F::lock(&self.inner.state).registry.borrow().contains(key)
    }

    /// Number of registrations of this container. Ancestors aren't counted.
    #[must_use]
    pub fn registration_count(&self) -> usize {
        F::lock(&self.inner.state).registry.borrow().len()
    }

    /// Keys registered in this container, in key order.
    #[must_use]
    pub fn registered_keys(&self) -> Vec<ServiceKey> {
        F::lock(&self.inner.state).registry.borrow().keys().cloned().collect()
    }
}

impl<F: Flavor> Container<F> {
    /// Session of the innermost resolution running a factory of this container on the current thread,
    /// or a new one if there is none.
    fn session(&self) -> Session {
        let active = F::lock(&self.inner.state).active.current();
        active.unwrap_or_else(Session::new)
    }

    /// Resolves the key in this container or the nearest ancestor registering it.
    /// Returns `None` if no container in the chain registers the key.
    ///
    /// The lock of a container is held while its registration is resolved, but released before
    /// delegating to the parent, so locks are only ever taken from a child towards its ancestors.
    pub(crate) fn resolve_in(&self, key: &ServiceKey, session: &Session) -> Result<Option<Resolved<F>>, ResolveErrorKind> {
        let span = info_span!("resolve", dependency = %key, container = %self.inner.id);
        let _span_guard = span.enter();

        let guard = F::lock(&self.inner.state);
        if !guard.registry.borrow().contains(key) {
            drop(guard);

            return match self.parent() {
                Some(parent) => {
                    debug!("Not registered, delegating to parent");
                    parent.resolve_in(key, session)
                }
                None => {
                    if self.inner.parent.is_some() {
                        debug!("Not registered, parent container dropped");
                    }
                    Ok(None)
                }
            };
        }

        let _in_flight = session.enter(Frame {
            container: self.inner.id,
            key: key.clone(),
        })?;
        let _active = guard.active.activate(session);
        let resolver = Resolver::new(self.clone(), session);

        match Registration::resolve_instance(&guard.registry, key, &resolver) {
            Ok(resolved) => Ok(Some(resolved)),
            Err(err) => {
                error!("{}", err);
                Err(err)
            }
        }
    }

    pub(crate) fn lookup<T: Injectable<F>>(&self, key: &ServiceKey, session: &Session) -> Result<Option<F::Ref<T>>, ResolveErrorKind> {
        let Some(resolved) = self.resolve_in(key, session)? else {
            debug!(dependency = %key, "Not registered");
            return Ok(None);
        };

        match resolved.downcast::<T>(key) {
            Ok(instance) => Ok(Some(instance)),
            Err(err) => {
                error!("{}", err);
                Err(err)
            }
        }
    }

    pub(crate) fn require<T: Injectable<F>>(&self, key: &ServiceKey, session: &Session) -> Result<F::Ref<T>, ResolveErrorKind> {
        match self.lookup::<T>(key, session)? {
            Some(instance) => Ok(instance),
            None => Err(self.missing(key)),
        }
    }

    fn missing(&self, key: &ServiceKey) -> ResolveErrorKind {
        let err = ResolveErrorKind::NotRegistered { key: key.clone() };
        match self.inner.config.on_missing {
            MissingPolicy::Error => {
                warn!("{}", err);
                err
            }
            MissingPolicy::Panic => {
                error!("{}", err);
                panic!("{}", err);
            }
        }
    }
}
