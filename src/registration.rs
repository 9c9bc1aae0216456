use core::cell::RefCell;
use tracing::debug;

use crate::{
    any::TypeInfo,
    errors::ResolveErrorKind,
    flavor::{Flavor, Injectable},
    key::ServiceKey,
    registry::{Evicted, Registry},
    resolver::Resolver,
    scope::{Scope, ScopeId},
};

/// Factory of a key together with its scope and the instance cached for that scope.
pub struct Registration<F: Flavor> {
    id: u64,
    scope: Scope,
    provides: TypeInfo,
    factory: F::Factory,
    instance: Option<F::Instance>,
    weak_instance: Option<F::WeakInstance>,
}

impl<F: Flavor> Registration<F> {
    #[inline]
    #[must_use]
    pub(crate) const fn new(id: u64, scope: Scope, provides: TypeInfo, factory: F::Factory) -> Self {
        Self {
            id,
            scope,
            provides,
            factory,
            instance: None,
            weak_instance: None,
        }
    }

    #[inline]
    #[must_use]
    pub(crate) fn is_bound_to(&self, scope_id: &ScopeId) -> bool {
        matches!(&self.scope, Scope::Scoped(id) if id == scope_id)
    }

    /// Instance that the scope allows to reuse, if there is a live one.
    #[must_use]
    pub(crate) fn cached_instance(&self) -> Option<F::Instance> {
        match self.scope {
            Scope::Transient => None,
            Scope::Singleton | Scope::Scoped(_) => self.instance.clone(),
            Scope::Weak => self.weak_instance.as_ref().and_then(F::upgrade),
        }
    }

    pub(crate) fn store(&mut self, instance: &F::Instance) {
        match self.scope {
            Scope::Transient => {}
            Scope::Singleton | Scope::Scoped(_) => self.instance = Some(instance.clone()),
            Scope::Weak => self.weak_instance = Some(F::downgrade(instance)),
        }
    }

    /// Moves the retained instance out of the registration.
    /// A weak instance is only forgotten, its owners keep it alive.
    pub(crate) fn evict(&mut self, evicted: &mut Evicted<F>) {
        let instance = self.instance.take();
        let had_weak_instance = self.weak_instance.take().is_some();
        if instance.is_some() || had_weak_instance {
            evicted.count += 1;
        }
        evicted.instances.extend(instance);
    }

    /// Returns an instance for `key` according to the scope of its registration,
    /// calling the factory if nothing reusable is cached.
    ///
    /// The registry isn't borrowed while the factory runs, so the factory may resolve its own
    /// dependencies or even register new ones through the same container.
    /// The created instance is cached only if the registration under `key` wasn't replaced meanwhile.
    pub(crate) fn resolve_instance(
        registry: &RefCell<Registry<F>>,
        key: &ServiceKey,
        resolver: &Resolver<'_, F>,
    ) -> Result<Resolved<F>, ResolveErrorKind> {
        let (id, provides, factory, caches) = {
            let registry = registry.borrow();
            let Some(registration) = registry.get(key) else {
                return Err(ResolveErrorKind::NotRegistered { key: key.clone() });
            };

            if registration.provides != *key.type_info() {
                return Err(ResolveErrorKind::TypeMismatch {
                    key: key.clone(),
                    expected: *key.type_info(),
                    found: registration.provides,
                });
            }

            if let Some(instance) = registration.cached_instance() {
                debug!("Found in cache");
                return Ok(Resolved {
                    instance,
                    provides: registration.provides,
                });
            }

            (
                registration.id,
                registration.provides,
                registration.factory.clone(),
                registration.scope.is_cached(),
            )
        };

        let instance = F::instantiate(&factory, resolver)?;
        debug!("Created");

        if caches {
            match registry.borrow_mut().get_mut(key) {
                Some(registration) if registration.id == id => {
                    registration.store(&instance);
                    debug!("Cached");
                }
                _ => debug!("Registration replaced while creating, not cached"),
            }
        }

        Ok(Resolved { instance, provides })
    }
}

/// Type-erased outcome of a resolution.
pub(crate) struct Resolved<F: Flavor> {
    pub(crate) instance: F::Instance,
    pub(crate) provides: TypeInfo,
}

impl<F: Flavor> Resolved<F> {
    pub(crate) fn downcast<T: Injectable<F>>(self, key: &ServiceKey) -> Result<F::Ref<T>, ResolveErrorKind> {
        T::downcast(self.instance).map_err(|instance| {
            let found = if F::instance_type_id(&instance) == self.provides.id {
                self.provides
            } else {
                TypeInfo {
                    name: "<unknown>",
                    id: F::instance_type_id(&instance),
                }
            };
            ResolveErrorKind::TypeMismatch {
                key: key.clone(),
                expected: TypeInfo::of::<T>(),
                found,
            }
        })
    }
}
