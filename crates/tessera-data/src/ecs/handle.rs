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

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tessera_core::ecs::EntityId;

/// Per-slot reference counts shared between a registry and its handles.
///
/// Handles only touch the ledger, never the registry, so they can be dropped
/// anywhere. Slots whose count reaches zero through a handle are queued in
/// `released` and examined by the registry on its next mutating call.
#[derive(Debug, Default)]
pub(crate) struct RefLedger {
    counts: RefCell<Vec<u32>>,
    released: RefCell<Vec<u32>>,
}

impl RefLedger {
    pub(crate) fn count(&self, index: u32) -> u32 {
        self.counts
            .borrow()
            .get(index as usize)
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn increment(&self, index: u32) {
        let mut counts = self.counts.borrow_mut();
        let index = index as usize;
        if counts.len() <= index {
            counts.resize(index + 1, 0);
        }
        counts[index] += 1;
    }

    /// Decrements the count for `index` and returns the new value, or `None`
    /// if it was already zero.
    pub(crate) fn decrement(&self, index: u32) -> Option<u32> {
        let mut counts = self.counts.borrow_mut();
        let count = counts.get_mut(index as usize)?;
        *count = count.checked_sub(1)?;
        Some(*count)
    }

    pub(crate) fn take_released(&self) -> Vec<u32> {
        std::mem::take(&mut *self.released.borrow_mut())
    }

    pub(crate) fn has_released(&self) -> bool {
        !self.released.borrow().is_empty()
    }

    fn release(&self, index: u32) {
        match self.decrement(index) {
            Some(0) => self.released.borrow_mut().push(index),
            Some(_) => {}
            None => debug_assert!(false, "entity handle released an unreferenced slot #{index}"),
        }
    }
}

/// A scoped reference to an entity.
///
/// While any handle to an entity exists, [`EntityRegistry::destroy`] only
/// marks it for destruction; the entity stays valid and queryable. Cloning a
/// handle adds a reference and dropping one removes it. When the last
/// reference to a pending entity goes away the entity becomes invalid at
/// once and its components are torn down on the registry's next mutation.
///
/// Handles may outlive their registry; they then keep nothing alive.
///
/// [`EntityRegistry::destroy`]: super::EntityRegistry::destroy
pub struct EntityHandle {
    id: EntityId,
    ledger: Rc<RefLedger>,
}

impl EntityHandle {
    pub(crate) fn new(id: EntityId, ledger: Rc<RefLedger>) -> Self {
        ledger.increment(id.index);
        Self { id, ledger }
    }

    /// Returns the id this handle refers to.
    pub fn id(&self) -> EntityId {
        self.id
    }
}

impl Clone for EntityHandle {
    fn clone(&self) -> Self {
        Self::new(self.id, Rc::clone(&self.ledger))
    }
}

impl Drop for EntityHandle {
    fn drop(&mut self) {
        self.ledger.release(self.id.index);
    }
}

impl PartialEq for EntityHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Rc::ptr_eq(&self.ledger, &other.ledger)
    }
}

impl Eq for EntityHandle {}

impl fmt::Debug for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntityHandle").field(&self.id).finish()
    }
}

impl From<&EntityHandle> for EntityId {
    fn from(handle: &EntityHandle) -> Self {
        handle.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_and_drop_adjust_count() {
        let ledger = Rc::new(RefLedger::default());
        let id = EntityId::new(2, 1);

        let first = EntityHandle::new(id, Rc::clone(&ledger));
        let second = first.clone();
        assert_eq!(ledger.count(2), 2);

        drop(first);
        assert_eq!(ledger.count(2), 1);
        assert!(!ledger.has_released());

        drop(second);
        assert_eq!(ledger.count(2), 0);
        assert_eq!(ledger.take_released(), vec![2]);
    }

    #[test]
    fn decrement_refuses_to_underflow() {
        let ledger = RefLedger::default();
        assert_eq!(ledger.decrement(0), None);
        ledger.increment(0);
        assert_eq!(ledger.decrement(0), Some(0));
        assert_eq!(ledger.decrement(0), None);
    }
}
