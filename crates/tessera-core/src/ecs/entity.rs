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

/// A versioned handle to an entity slot.
///
/// Slots are recycled once an entity is destroyed, and every recycle bumps the
/// slot's generation. An id remembers the generation it was issued with, so a
/// copy that outlives its entity stops resolving instead of silently naming
/// whatever entity reuses the slot.
///
/// Generations start at 1, so the all-zero value is reserved as
/// [`EntityId::INVALID`] and never names a live entity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct EntityId {
    /// The index of the entity's slot in the registry's identity table.
    pub index: u32,
    /// The slot generation this id was issued for.
    pub generation: u32,
}

impl EntityId {
    /// The reserved "no entity" value.
    pub const INVALID: Self = Self {
        index: 0,
        generation: 0,
    };

    /// Creates an id from its two halves.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Packs the id into one word, generation in the upper 32 bits.
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        ((self.generation as u64) << 32) | self.index as u64
    }

    /// Inverse of [`EntityId::to_bits`].
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }

    /// Returns `true` for the reserved [`EntityId::INVALID`] value.
    #[inline]
    #[must_use]
    pub const fn is_invalid(self) -> bool {
        self.to_bits() == 0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

impl From<EntityId> for u64 {
    fn from(id: EntityId) -> Self {
        id.to_bits()
    }
}
