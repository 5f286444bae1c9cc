// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt;
use std::rc::Rc;

use tessera_core::config::RegistryConfig;
use tessera_core::ecs::{EntityId, TypeMask};
use tessera_core::ConfigError;

use super::component::{Component, ComponentSet};
use super::component_types::ComponentTypes;
use super::entity_store::{EntityStore, IdentityFlags};
use super::handle::{EntityHandle, RefLedger};
use super::pool::ChunkedPool;

/// A snapshot of registry occupancy, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Entities that are currently valid.
    pub alive: usize,
    /// Slots ever allocated, live or free.
    pub slots: usize,
    /// Slots waiting in the free list.
    pub free_slots: usize,
    /// Entities whose destruction waits on outstanding references.
    pub pending_destroy: usize,
    /// Distinct component types registered.
    pub component_types: usize,
    /// Component pools created so far.
    pub pools: usize,
    /// Chunks allocated across all pools.
    pub pool_chunks: usize,
    /// Bytes held by those chunks.
    pub pool_bytes: usize,
}

/// The central entity/component container.
///
/// Entities are generational [`EntityId`]s; each one owns a [`TypeMask`]
/// recording which components are attached. Component values live in one
/// [`ChunkedPool`] per type, addressed by the entity's slot index, and a pool
/// slot is only ever read when the matching mask bit is set.
///
/// Operations on stale or invalid ids are no-ops that return `None` or
/// `false`. Destroying an entity that still has references (explicit
/// [`reference`](Self::reference) calls or live [`EntityHandle`]s) only marks
/// it; the entity remains fully usable until the last reference goes away.
pub struct EntityRegistry {
    config: RegistryConfig,
    store: EntityStore,
    types: ComponentTypes,
    pools: Vec<Option<ChunkedPool>>,
    ledger: Rc<RefLedger>,
    iteration_depth: u32,
    /// Entities created during the current iteration pass, in creation order.
    buffered: Vec<EntityId>,
}

impl EntityRegistry {
    /// Creates a registry.
    ///
    /// # Panics
    ///
    /// Panics if `config` is invalid; use [`try_new`](Self::try_new) to
    /// handle that case.
    pub fn new(config: RegistryConfig) -> Self {
        match Self::try_new(config) {
            Ok(registry) => registry,
            Err(e) => panic!("EntityRegistry configuration rejected: {e}"),
        }
    }

    /// Creates a registry after validating `config`.
    pub fn try_new(config: RegistryConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        log::info!(
            "EntityRegistry initialized (chunk size {} bytes, {} component types).",
            config.chunk_size,
            config.max_component_types
        );
        Ok(Self {
            types: ComponentTypes::new(config.max_component_types),
            config,
            store: EntityStore::new(),
            pools: Vec::new(),
            ledger: Rc::new(RefLedger::default()),
            iteration_depth: 0,
            buffered: Vec::new(),
        })
    }

    /// Returns the configuration the registry was built with.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Returns the component type index map.
    pub fn component_types(&self) -> &ComponentTypes {
        &self.types
    }

    /// Registers `T` ahead of first use and returns its mask index.
    ///
    /// # Panics
    ///
    /// Panics if the configured component type limit is exceeded.
    pub fn register_component<T: Component>(&mut self) -> u32 {
        self.types.register::<T>()
    }

    /// Creates a new entity with no components.
    ///
    /// Freed slots are reused most-recent first. An entity created while an
    /// [`iterate`](Self::iterate) pass is running is not visited by the main
    /// sweep of that pass; it is visited after the sweep instead.
    pub fn create(&mut self) -> EntityId {
        self.collect_released();
        let id = self.store.allocate();
        if self.iteration_depth > 0 {
            if let Some(slot) = self.store.get_mut(id) {
                slot.flags.insert(IdentityFlags::BUFFERED);
            }
            self.buffered.push(id);
        }
        log::trace!("Created entity {id}.");
        id
    }

    /// Returns `true` if `id` refers to a live entity.
    ///
    /// An entity pending destruction stays valid while references remain.
    pub fn valid(&self, id: EntityId) -> bool {
        match self.store.get(id) {
            Some(slot) => !slot.is_pending_destroy() || self.ledger.count(id.index) > 0,
            None => false,
        }
    }

    /// Destroys an entity and all of its components.
    ///
    /// If the entity is referenced, destruction is deferred until the last
    /// reference is released. Returns `false` if `id` is not valid.
    pub fn destroy(&mut self, id: EntityId) -> bool {
        self.collect_released();
        if !self.valid(id) {
            log::debug!("Ignoring destroy of invalid entity {id}.");
            return false;
        }
        if self.ledger.count(id.index) > 0 {
            if let Some(slot) = self.store.get_mut(id) {
                slot.flags.insert(IdentityFlags::PENDING_DESTROY);
            }
            log::trace!("Deferred destroy of referenced entity {id}.");
            return true;
        }
        self.teardown(id.index);
        true
    }

    /// Attaches `value` to an entity and returns a reference to the stored
    /// component.
    ///
    /// If the entity already has a `T`, the existing component is returned
    /// unchanged and `value` is dropped. Returns `None` for invalid ids.
    pub fn add_component<T: Component>(&mut self, id: EntityId, value: T) -> Option<&mut T> {
        self.add_component_with(id, move || value)
    }

    /// Like [`add_component`](Self::add_component), but only calls `make`
    /// when the component is actually missing.
    pub fn add_component_with<T, F>(&mut self, id: EntityId, make: F) -> Option<&mut T>
    where
        T: Component,
        F: FnOnce() -> T,
    {
        self.collect_released();
        if !self.valid(id) {
            log::debug!(
                "Ignoring add of `{}` to invalid entity {id}.",
                std::any::type_name::<T>()
            );
            return None;
        }

        let type_index = self.types.register::<T>();
        let pool = Self::pool_or_create::<T>(&mut self.pools, type_index, self.config.chunk_size);
        let slot = self.store.get_mut(id)?;
        let index = id.index as usize;

        if slot.mask.contains(type_index) {
            // SAFETY: the mask bit guarantees an initialized `T` at `index`.
            return Some(unsafe { pool.get_mut::<T>(index) });
        }

        let value = make();
        slot.mask.insert(type_index);
        // SAFETY: the bit was clear, so the slot is empty; the pool holds `T`.
        Some(unsafe { pool.insert(index, value) })
    }

    fn pool_or_create<T: Component>(
        pools: &mut Vec<Option<ChunkedPool>>,
        type_index: u32,
        chunk_size: usize,
    ) -> &mut ChunkedPool {
        let position = type_index as usize;
        if pools.len() <= position {
            pools.resize_with(position + 1, || None);
        }
        pools[position].get_or_insert_with(|| {
            log::debug!("Created pool for `{}`.", std::any::type_name::<T>());
            ChunkedPool::new::<T>(chunk_size)
        })
    }

    /// Returns the entity's `T`, if the entity is valid and has one.
    pub fn get_component<T: Component>(&self, id: EntityId) -> Option<&T> {
        if !self.valid(id) {
            return None;
        }
        let slot = self.store.get(id)?;
        let type_index = self.types.index_of::<T>()?;
        if !slot.mask.contains(type_index) {
            return None;
        }
        let pool = self.pools.get(type_index as usize)?.as_ref()?;
        // SAFETY: the mask bit guarantees an initialized `T` at this index.
        Some(unsafe { pool.get::<T>(id.index as usize) })
    }

    /// Returns the entity's `T` mutably, if the entity is valid and has one.
    pub fn get_component_mut<T: Component>(&mut self, id: EntityId) -> Option<&mut T> {
        self.collect_released();
        if !self.valid(id) {
            return None;
        }
        let slot = self.store.get(id)?;
        let type_index = self.types.index_of::<T>()?;
        if !slot.mask.contains(type_index) {
            return None;
        }
        let pool = self.pools.get_mut(type_index as usize)?.as_mut()?;
        // SAFETY: the mask bit guarantees an initialized `T` at this index.
        Some(unsafe { pool.get_mut::<T>(id.index as usize) })
    }

    /// Drops the entity's `T`. Returns `false` if there was none.
    pub fn remove_component<T: Component>(&mut self, id: EntityId) -> bool {
        self.collect_released();
        if !self.valid(id) {
            log::debug!(
                "Ignoring removal of `{}` from invalid entity {id}.",
                std::any::type_name::<T>()
            );
            return false;
        }
        let Some(type_index) = self.types.index_of::<T>() else {
            return false;
        };
        let Some(slot) = self.store.get_mut(id) else {
            return false;
        };
        if !slot.mask.contains(type_index) {
            return false;
        }
        slot.mask.remove(type_index);
        if let Some(Some(pool)) = self.pools.get_mut(type_index as usize) {
            // SAFETY: the bit was set, so the slot held a `T`.
            unsafe { pool.erase(id.index as usize) };
        }
        true
    }

    /// Returns `true` if the entity is valid and has every type in `S`.
    ///
    /// `S` is a component type or a tuple of them, e.g.
    /// `has_components::<(Position, Velocity)>(id)`.
    pub fn has_components<S: ComponentSet>(&self, id: EntityId) -> bool {
        if !self.valid(id) {
            return false;
        }
        let Some(required) = S::lookup_mask(&self.types) else {
            return false;
        };
        self.store
            .get(id)
            .is_some_and(|slot| slot.mask.contains_all(&required))
    }

    /// Returns the component mask of a valid entity.
    pub fn mask_of(&self, id: EntityId) -> Option<TypeMask> {
        if !self.valid(id) {
            return None;
        }
        self.store.get(id).map(|slot| slot.mask)
    }

    /// Adds a manual reference to an entity, keeping it alive through
    /// [`destroy`](Self::destroy) until [`dereference`](Self::dereference).
    pub fn reference(&mut self, id: EntityId) -> bool {
        self.collect_released();
        if !self.valid(id) {
            log::debug!("Ignoring reference to invalid entity {id}.");
            return false;
        }
        self.ledger.increment(id.index);
        true
    }

    /// Releases a reference taken with [`reference`](Self::reference).
    ///
    /// Releasing the last reference of an entity pending destruction
    /// destroys it immediately. Releasing an unreferenced entity is a
    /// programming error.
    pub fn dereference(&mut self, id: EntityId) -> bool {
        self.collect_released();
        if !self.valid(id) {
            log::debug!("Ignoring dereference of invalid entity {id}.");
            return false;
        }
        if self.ledger.count(id.index) == 0 {
            debug_assert!(false, "dereference of unreferenced entity {id}");
            return false;
        }
        self.release_ref(id.index);
        true
    }

    /// Returns the number of outstanding references to an entity.
    pub fn references(&self, id: EntityId) -> u32 {
        if self.store.get(id).is_none() {
            return 0;
        }
        self.ledger.count(id.index)
    }

    /// Creates a scoped handle that references the entity until dropped.
    pub fn handle(&mut self, id: EntityId) -> Option<EntityHandle> {
        self.collect_released();
        if !self.valid(id) {
            return None;
        }
        Some(EntityHandle::new(id, Rc::clone(&self.ledger)))
    }

    /// Calls `callback` once for every live entity.
    ///
    /// Existing entities are visited in ascending slot order. Entities created
    /// by a callback are visited after that sweep, in creation order, before
    /// this call returns. Entities destroyed before their turn are skipped.
    /// Each visited entity holds a reference for the duration of its
    /// callback, so destroying it from inside the callback takes effect when
    /// the callback returns.
    pub fn iterate<F>(&mut self, mut callback: F)
    where
        F: FnMut(&mut Self, EntityId),
    {
        self.collect_released();
        self.iteration_depth += 1;

        let len = self.store.len() as u32;
        for index in 0..len {
            let visible = self.store.slot(index).is_some_and(|slot| {
                slot.is_active() && !slot.is_buffered() && !slot.is_pending_destroy()
            });
            if !visible {
                continue;
            }
            if let Some(id) = self.store.id_at(index) {
                self.visit(id, &mut callback);
            }
        }

        if self.iteration_depth == 1 {
            let mut cursor = 0;
            while cursor < self.buffered.len() {
                let id = self.buffered[cursor];
                cursor += 1;
                let Some(slot) = self.store.get_mut(id) else {
                    continue;
                };
                slot.flags.remove(IdentityFlags::BUFFERED);
                if slot.is_pending_destroy() {
                    continue;
                }
                self.visit(id, &mut callback);
            }
            self.buffered.clear();
        }

        self.iteration_depth -= 1;
    }

    fn visit<F>(&mut self, id: EntityId, callback: &mut F)
    where
        F: FnMut(&mut Self, EntityId),
    {
        self.ledger.increment(id.index);
        callback(self, id);
        if self.store.get(id).is_some() {
            self.release_ref(id.index);
        }
    }

    /// Calls `callback` for every live entity that has all types in `S`.
    ///
    /// Follows the same ordering and buffering rules as
    /// [`iterate`](Self::iterate).
    pub fn each_with<S, F>(&mut self, mut callback: F)
    where
        S: ComponentSet,
        F: FnMut(&mut Self, EntityId),
    {
        let Some(required) = S::lookup_mask(&self.types) else {
            return;
        };
        self.iterate(|registry, id| {
            if registry
                .mask_of(id)
                .is_some_and(|mask| mask.contains_all(&required))
            {
                callback(registry, id);
            }
        });
    }

    /// Returns the number of valid entities.
    ///
    /// Agrees with [`valid`](Self::valid): an entity whose last
    /// [`EntityHandle`] was dropped after [`destroy`](Self::destroy) is no
    /// longer counted, even though its slot and components are only torn down
    /// by the next mutating call or [`reclaim`](Self::reclaim).
    pub fn alive_count(&self) -> usize {
        self.store.alive() - self.released_pending()
    }

    /// Tears down entities whose last handle was dropped while they were
    /// pending destruction. Returns how many were torn down.
    ///
    /// Every mutating call does this implicitly; hosts that go quiet after
    /// dropping handles can call it to run component drops right away.
    pub fn reclaim(&mut self) -> usize {
        self.collect_released()
    }

    /// Returns the number of slots ever allocated.
    pub fn slot_count(&self) -> usize {
        self.store.len()
    }

    /// Destroys every entity. Referenced entities are marked for destruction
    /// instead. Returns how many entities were destroyed immediately.
    pub fn clear(&mut self) -> usize {
        self.collect_released();
        let ids: Vec<EntityId> = (0..self.store.len() as u32)
            .filter_map(|index| self.store.id_at(index))
            .collect();
        let mut destroyed = 0;
        for id in ids {
            if self.ledger.count(id.index) == 0 {
                self.teardown(id.index);
                destroyed += 1;
            } else if let Some(slot) = self.store.get_mut(id) {
                slot.flags.insert(IdentityFlags::PENDING_DESTROY);
            }
        }
        log::debug!("Cleared {destroyed} entities.");
        destroyed
    }

    /// Returns occupancy counters for the registry and its pools.
    pub fn stats(&self) -> RegistryStats {
        let pending_destroy = self
            .store
            .iter()
            .filter(|(index, slot)| {
                slot.is_active() && slot.is_pending_destroy() && self.ledger.count(*index) > 0
            })
            .count();
        let pools = self.pools.iter().flatten();
        RegistryStats {
            alive: self.alive_count(),
            slots: self.store.len(),
            free_slots: self.store.free_count(),
            pending_destroy,
            component_types: self.types.len(),
            pools: pools.clone().count(),
            pool_chunks: pools.clone().map(ChunkedPool::chunk_count).sum(),
            pool_bytes: pools.map(ChunkedPool::allocated_bytes).sum(),
        }
    }

    /// Drops a reference and finishes a pending destroy when it was the last.
    fn release_ref(&mut self, index: u32) {
        if self.ledger.decrement(index) != Some(0) {
            return;
        }
        let pending = self
            .store
            .slot(index)
            .is_some_and(|slot| slot.is_active() && slot.is_pending_destroy());
        if pending {
            self.teardown(index);
        }
    }

    /// Counts pending entities already released by their last handle but not
    /// yet torn down.
    fn released_pending(&self) -> usize {
        if !self.ledger.has_released() {
            return 0;
        }
        self.store
            .iter()
            .filter(|(index, slot)| {
                slot.is_active() && slot.is_pending_destroy() && self.ledger.count(*index) == 0
            })
            .count()
    }

    /// Finishes pending destroys whose last reference was a dropped handle.
    fn collect_released(&mut self) -> usize {
        if !self.ledger.has_released() {
            return 0;
        }
        let mut torn_down = 0;
        for index in self.ledger.take_released() {
            let pending = self
                .store
                .slot(index)
                .is_some_and(|slot| slot.is_active() && slot.is_pending_destroy());
            if pending && self.ledger.count(index) == 0 {
                self.teardown(index);
                torn_down += 1;
            }
        }
        torn_down
    }

    /// Erases every component of the slot and returns it to the free list.
    fn teardown(&mut self, index: u32) {
        let Some(slot) = self.store.slot(index) else {
            return;
        };
        let mask = slot.mask;
        for type_index in mask.iter() {
            if let Some(Some(pool)) = self.pools.get_mut(type_index as usize) {
                // SAFETY: every set bit has a live value in the matching pool.
                unsafe { pool.erase(index as usize) };
            }
        }
        self.store.release(index);
        log::trace!("Destroyed entity slot #{index}.");
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl Drop for EntityRegistry {
    fn drop(&mut self) {
        for (index, slot) in self.store.iter() {
            if !slot.is_active() {
                continue;
            }
            for type_index in slot.mask.iter() {
                if let Some(Some(pool)) = self.pools.get_mut(type_index as usize) {
                    // SAFETY: every set bit has a live value in the matching pool.
                    unsafe { pool.erase(index as usize) };
                }
            }
        }
    }
}

impl fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}
