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

//! Implements the fixed-width bitset that records an entity's composition.

use std::fmt;

/// Number of 64-bit words backing a [`TypeMask`].
pub const MASK_WORDS: usize = 4;

/// A fixed-capacity set of component-type indices.
///
/// Each registered component type is given a small integer index; an entity's
/// mask has that bit set while the component is attached. Queries are plain
/// bitwise intersections, so "does this entity have A, B and C" is a handful
/// of word comparisons.
///
/// The capacity is a compile-time bound ([`TypeMask::CAPACITY`]); registries
/// may configure a smaller effective width but never a larger one.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TypeMask {
    words: [u64; MASK_WORDS],
}

impl TypeMask {
    /// Maximum number of distinct indices a mask can hold.
    pub const CAPACITY: usize = MASK_WORDS * 64;

    /// The empty mask.
    pub const EMPTY: Self = Self {
        words: [0; MASK_WORDS],
    };

    /// Creates an empty mask.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self::EMPTY
    }

    #[inline]
    fn locate(index: u32) -> (usize, u64) {
        let index = index as usize;
        assert!(
            index < Self::CAPACITY,
            "type index {index} exceeds TypeMask capacity {}",
            Self::CAPACITY
        );
        (index / 64, 1u64 << (index % 64))
    }

    /// Sets the bit at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= TypeMask::CAPACITY`.
    #[inline]
    pub fn insert(&mut self, index: u32) {
        let (word, bit) = Self::locate(index);
        self.words[word] |= bit;
    }

    /// Clears the bit at `index`.
    #[inline]
    pub fn remove(&mut self, index: u32) {
        let (word, bit) = Self::locate(index);
        self.words[word] &= !bit;
    }

    /// Returns `true` if the bit at `index` is set.
    #[inline]
    #[must_use]
    pub fn contains(&self, index: u32) -> bool {
        if index as usize >= Self::CAPACITY {
            return false;
        }
        let (word, bit) = Self::locate(index);
        self.words[word] & bit != 0
    }

    /// Returns `true` if every bit of `other` is also set in `self`.
    ///
    /// An empty `other` is trivially contained.
    #[inline]
    #[must_use]
    pub fn contains_all(&self, other: &TypeMask) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .all(|(mine, theirs)| mine & theirs == *theirs)
    }

    /// Returns `true` if `self` and `other` share at least one bit.
    #[inline]
    #[must_use]
    pub fn intersects(&self, other: &TypeMask) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .any(|(mine, theirs)| mine & theirs != 0)
    }

    /// Sets every bit of `other` in `self`.
    #[inline]
    pub fn union_with(&mut self, other: &TypeMask) {
        for (mine, theirs) in self.words.iter_mut().zip(other.words.iter()) {
            *mine |= theirs;
        }
    }

    /// Clears every bit of `other` in `self`.
    #[inline]
    pub fn subtract(&mut self, other: &TypeMask) {
        for (mine, theirs) in self.words.iter_mut().zip(other.words.iter()) {
            *mine &= !theirs;
        }
    }

    /// Returns `true` if no bit is set.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|word| *word == 0)
    }

    /// Returns the number of set bits.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Clears every bit.
    #[inline]
    pub fn clear(&mut self) {
        self.words = [0; MASK_WORDS];
    }

    /// Iterates over the set indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.words
            .iter()
            .enumerate()
            .flat_map(|(word_idx, word)| {
                let mut remaining = *word;
                std::iter::from_fn(move || {
                    if remaining == 0 {
                        return None;
                    }
                    let bit = remaining.trailing_zeros();
                    remaining &= remaining - 1;
                    Some(word_idx as u32 * 64 + bit)
                })
            })
    }
}

impl fmt::Debug for TypeMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<u32> for TypeMask {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let mut mask = TypeMask::EMPTY;
        for index in iter {
            mask.insert(index);
        }
        mask
    }
}
