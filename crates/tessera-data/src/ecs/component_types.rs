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

use std::any::{type_name, TypeId};
use std::collections::HashMap;

use tessera_core::ecs::TypeMask;

/// Assigns a stable, first-come index to every component type a registry sees.
///
/// Indices start at 0 and are handed out in registration order. Each registry
/// owns its own `ComponentTypes`, so independent registries never compete for
/// mask bits.
#[derive(Debug)]
pub struct ComponentTypes {
    indices: HashMap<TypeId, u32>,
    names: Vec<&'static str>,
    limit: usize,
}

impl ComponentTypes {
    /// Creates an empty index map that accepts at most `limit` types.
    ///
    /// # Panics
    ///
    /// Panics if `limit` exceeds [`TypeMask::CAPACITY`].
    pub fn new(limit: usize) -> Self {
        assert!(
            limit <= TypeMask::CAPACITY,
            "component type limit {limit} exceeds TypeMask capacity {}",
            TypeMask::CAPACITY
        );
        Self {
            indices: HashMap::new(),
            names: Vec::new(),
            limit,
        }
    }

    /// Returns the index of `T`, registering it on first request.
    ///
    /// # Panics
    ///
    /// Panics if `T` is new and the type limit has been reached.
    pub fn register<T: 'static>(&mut self) -> u32 {
        let id = TypeId::of::<T>();
        if let Some(index) = self.indices.get(&id) {
            return *index;
        }
        assert!(
            self.names.len() < self.limit,
            "component type limit ({}) exceeded while registering `{}`",
            self.limit,
            type_name::<T>()
        );
        let index = self.names.len() as u32;
        self.indices.insert(id, index);
        self.names.push(type_name::<T>());
        log::trace!("Registered component type `{}` as #{index}.", type_name::<T>());
        index
    }

    /// Returns the index of `T` if it has been registered.
    pub fn index_of<T: 'static>(&self) -> Option<u32> {
        self.indices.get(&TypeId::of::<T>()).copied()
    }

    /// Returns the type name recorded for `index`.
    pub fn name(&self, index: u32) -> Option<&'static str> {
        self.names.get(index as usize).copied()
    }

    /// Returns the number of registered types.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if no type has been registered.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns the maximum number of types this map accepts.
    pub fn limit(&self) -> usize {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct A;
    struct B;
    struct C;

    #[test]
    fn indices_are_first_come_and_stable() {
        let mut types = ComponentTypes::new(8);
        assert_eq!(types.register::<B>(), 0);
        assert_eq!(types.register::<A>(), 1);
        assert_eq!(types.register::<B>(), 0);
        assert_eq!(types.index_of::<A>(), Some(1));
        assert_eq!(types.index_of::<C>(), None);
        assert!(types.name(0).is_some_and(|n| n.ends_with("B")));
    }

    #[test]
    fn separate_maps_have_independent_counters() {
        let mut first = ComponentTypes::new(8);
        let mut second = ComponentTypes::new(8);
        first.register::<A>();
        first.register::<B>();
        assert_eq!(second.register::<B>(), 0);
    }

    #[test]
    #[should_panic(expected = "component type limit")]
    fn exceeding_limit_panics() {
        let mut types = ComponentTypes::new(2);
        types.register::<A>();
        types.register::<B>();
        types.register::<C>();
    }
}
