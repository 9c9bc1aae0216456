use alloc::{collections::BTreeMap, vec::Vec};

use crate::{
    any::TypeInfo,
    flavor::Flavor,
    key::ServiceKey,
    registration::Registration,
    scope::{Scope, ScopeId},
};

/// Registrations owned by a single container.
pub struct Registry<F: Flavor> {
    registrations: BTreeMap<ServiceKey, Registration<F>>,
    next_id: u64,
}

impl<F: Flavor> Default for Registry<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Flavor> Registry<F> {
    #[inline]
    #[must_use]
    pub(crate) const fn new() -> Self {
        Self {
            registrations: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Inserts a registration under the key, returning the one it replaced.
    pub(crate) fn insert(&mut self, key: ServiceKey, scope: Scope, provides: TypeInfo, factory: F::Factory) -> Option<Registration<F>> {
        let id = self.next_id;
        self.next_id += 1;
        self.registrations.insert(key, Registration::new(id, scope, provides, factory))
    }

    #[inline]
    pub(crate) fn remove(&mut self, key: &ServiceKey) -> Option<Registration<F>> {
        self.registrations.remove(key)
    }

    #[inline]
    #[must_use]
    pub(crate) fn get(&self, key: &ServiceKey) -> Option<&Registration<F>> {
        self.registrations.get(key)
    }

    #[inline]
    #[must_use]
    pub(crate) fn get_mut(&mut self, key: &ServiceKey) -> Option<&mut Registration<F>> {
        self.registrations.get_mut(key)
    }

    #[inline]
    #[must_use]
    pub(crate) fn contains(&self, key: &ServiceKey) -> bool {
        self.registrations.contains_key(key)
    }

    #[inline]
    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Removes all registrations and returns them, so they're dropped after the lock is released.
    #[inline]
    pub(crate) fn take_all(&mut self) -> BTreeMap<ServiceKey, Registration<F>> {
        core::mem::take(&mut self.registrations)
    }

    /// Clears cached instances of all registrations.
    pub(crate) fn clear_caches(&mut self) -> Evicted<F> {
        let mut evicted = Evicted::new();
        for registration in self.registrations.values_mut() {
            registration.evict(&mut evicted);
        }
        evicted
    }

    /// Clears cached instances of the registrations bound to the scope.
    pub(crate) fn clear_scope(&mut self, scope_id: &ScopeId) -> Evicted<F> {
        let mut evicted = Evicted::new();
        for registration in self.registrations.values_mut() {
            if registration.is_bound_to(scope_id) {
                registration.evict(&mut evicted);
            }
        }
        evicted
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = &ServiceKey> {
        self.registrations.keys()
    }
}

/// Instances taken out of registration caches, so they're dropped after the lock is released.
pub(crate) struct Evicted<F: Flavor> {
    /// How many registrations had a retained instance
    pub(crate) count: usize,
    pub(crate) instances: Vec<F::Instance>,
}

impl<F: Flavor> Evicted<F> {
    #[inline]
    #[must_use]
    pub(crate) const fn new() -> Self {
        Self {
            count: 0,
            instances: Vec::new(),
        }
    }
}
