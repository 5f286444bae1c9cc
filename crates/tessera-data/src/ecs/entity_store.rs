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

//! Internal entity slot storage and id recycling.

use tessera_core::ecs::{EntityId, TypeMask};

tessera_core::tessera_bitflags! {
    /// Lifecycle state of an entity slot.
    pub(crate) struct IdentityFlags: u8 {
        /// The slot holds a live entity.
        const ACTIVE = 1 << 0;
        /// Destruction was requested while references were outstanding.
        const PENDING_DESTROY = 1 << 1;
        /// Created during an iteration pass and not yet visited by it.
        const BUFFERED = 1 << 2;
    }
}

/// Bookkeeping for one entity slot.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Identity {
    pub(crate) generation: u32,
    pub(crate) mask: TypeMask,
    pub(crate) flags: IdentityFlags,
}

impl Identity {
    pub(crate) fn is_active(&self) -> bool {
        self.flags.contains(IdentityFlags::ACTIVE)
    }

    pub(crate) fn is_pending_destroy(&self) -> bool {
        self.flags.contains(IdentityFlags::PENDING_DESTROY)
    }

    pub(crate) fn is_buffered(&self) -> bool {
        self.flags.contains(IdentityFlags::BUFFERED)
    }
}

/// Dense table of entity slots with a LIFO free list.
///
/// Generations start at 1 and are bumped every time a slot is released, so an
/// id handed out before the release never matches the slot again. Generation
/// 0 is skipped on wrap-around to keep [`EntityId::INVALID`] unreachable.
#[derive(Debug, Default)]
pub(crate) struct EntityStore {
    slots: Vec<Identity>,
    free: Vec<u32>,
    alive: usize,
}

impl EntityStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Allocates a slot, reusing the most recently freed one first.
    pub(crate) fn allocate(&mut self) -> EntityId {
        self.alive += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.flags = IdentityFlags::ACTIVE;
            return EntityId::new(index, slot.generation);
        }

        let index = u32::try_from(self.slots.len())
            .ok()
            .filter(|index| *index < u32::MAX)
            .unwrap_or_else(|| panic!("entity slot space exhausted"));
        self.slots.push(Identity {
            generation: 1,
            mask: TypeMask::EMPTY,
            flags: IdentityFlags::ACTIVE,
        });
        EntityId::new(index, 1)
    }

    /// Frees a slot and invalidates every id that points at it.
    pub(crate) fn release(&mut self, index: u32) {
        let slot = &mut self.slots[index as usize];
        debug_assert!(slot.is_active(), "releasing a free slot #{index}");
        slot.mask.clear();
        slot.flags = IdentityFlags::EMPTY;
        slot.generation = match slot.generation.wrapping_add(1) {
            0 => 1,
            next => next,
        };
        self.free.push(index);
        self.alive -= 1;
    }

    /// Returns the slot for `id` if it is active and of the same generation.
    pub(crate) fn get(&self, id: EntityId) -> Option<&Identity> {
        if id.is_invalid() {
            return None;
        }
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation && slot.is_active())
    }

    pub(crate) fn get_mut(&mut self, id: EntityId) -> Option<&mut Identity> {
        if id.is_invalid() {
            return None;
        }
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation && slot.is_active())
    }

    /// Returns a slot by raw index, regardless of its state.
    pub(crate) fn slot(&self, index: u32) -> Option<&Identity> {
        self.slots.get(index as usize)
    }

    /// Returns the current id of an active slot.
    pub(crate) fn id_at(&self, index: u32) -> Option<EntityId> {
        self.slot(index)
            .filter(|slot| slot.is_active())
            .map(|slot| EntityId::new(index, slot.generation))
    }

    /// Total number of slots, live or free.
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn alive(&self) -> usize {
        self.alive
    }

    pub(crate) fn free_count(&self) -> usize {
        self.free.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (u32, &Identity)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| (index as u32, slot))
    }
}
