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

//! The context-scoped registry of systems and their per-hook dispatch tables.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;

use crate::system::{Handler, Hook, System};
use crate::table::{AnyTable, DispatchTable};

struct SystemSlot {
    name: &'static str,
    instance: Box<dyn Any>,
}

/// Owns live system instances and, per hook, the order they run in.
///
/// A system must be inserted with [`insert_system`](Self::insert_system) and
/// enabled for each hook it should receive. Dispatching a hook runs every
/// enabled handler in ascending priority; equal priorities run in the order
/// they were enabled. Re-enabling a system moves it instead of adding a
/// second entry.
///
/// Dispatchers are plain values: tests and independent runtimes each build
/// their own, with no shared global tables.
#[derive(Default)]
pub struct SystemDispatcher {
    systems: HashMap<TypeId, SystemSlot>,
    tables: HashMap<TypeId, Box<dyn AnyTable>>,
}

impl SystemDispatcher {
    /// Creates an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the live instance of `S`, returning the instance it replaces.
    pub fn insert_system<S: System>(&mut self, system: S) -> Option<S> {
        let name = system.name();
        log::info!("SystemDispatcher: Registered system `{name}`.");
        let previous = self.systems.insert(
            TypeId::of::<S>(),
            SystemSlot {
                name,
                instance: Box::new(system),
            },
        )?;
        previous.instance.downcast::<S>().ok().map(|boxed| *boxed)
    }

    /// Removes the instance of `S` and disables it for every hook.
    pub fn remove_system<S: System>(&mut self) -> Option<S> {
        let owner = TypeId::of::<S>();
        for table in self.tables.values_mut() {
            if table.remove(owner) {
                log::debug!(
                    "Disabled `{}` for hook `{}` on removal.",
                    type_name::<S>(),
                    table.hook_name()
                );
            }
        }
        let slot = self.systems.remove(&owner)?;
        slot.instance.downcast::<S>().ok().map(|boxed| *boxed)
    }

    /// Returns the instance of `S`, if registered.
    pub fn system<S: System>(&self) -> Option<&S> {
        self.systems
            .get(&TypeId::of::<S>())
            .and_then(|slot| slot.instance.downcast_ref::<S>())
    }

    /// Returns the instance of `S` mutably, if registered.
    pub fn system_mut<S: System>(&mut self) -> Option<&mut S> {
        self.systems
            .get_mut(&TypeId::of::<S>())
            .and_then(|slot| slot.instance.downcast_mut::<S>())
    }

    /// Returns the number of registered instances.
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    fn table<H: Hook>(&self) -> Option<&DispatchTable<H>> {
        self.tables
            .get(&TypeId::of::<H>())
            .and_then(|table| table.as_any().downcast_ref::<DispatchTable<H>>())
    }

    fn table_mut<H: Hook>(&mut self) -> &mut DispatchTable<H> {
        let table = self
            .tables
            .entry(TypeId::of::<H>())
            .or_insert_with(|| Box::new(DispatchTable::<H>::new()));
        match table.as_any_mut().downcast_mut::<DispatchTable<H>>() {
            Some(table) => table,
            None => unreachable!("dispatch table keyed by the wrong hook type"),
        }
    }

    /// Enables `S` as a handler of `H` at `priority`; lower runs first.
    ///
    /// Enabling an already enabled system moves it to the new priority.
    pub fn enable<H, S>(&mut self, priority: i32)
    where
        H: Hook,
        S: Handler<H>,
    {
        self.table_mut::<H>().enable::<S>(priority);
        log::debug!(
            "Enabled `{}` for hook `{}` (priority {priority}).",
            type_name::<S>(),
            H::NAME
        );
    }

    /// Disables `S` for `H`. Returns `false` if it was not enabled.
    pub fn disable<H, S>(&mut self) -> bool
    where
        H: Hook,
        S: Handler<H>,
    {
        self.tables
            .get_mut(&TypeId::of::<H>())
            .is_some_and(|table| table.remove(TypeId::of::<S>()))
    }

    /// Returns `true` if `S` is enabled for `H`.
    pub fn is_enabled<H, S>(&self) -> bool
    where
        H: Hook,
        S: Handler<H>,
    {
        self.priority_of::<H, S>().is_some()
    }

    /// Returns the priority `S` is enabled with for `H`.
    pub fn priority_of<H, S>(&self) -> Option<i32>
    where
        H: Hook,
        S: Handler<H>,
    {
        self.table::<H>()?.priority_of(TypeId::of::<S>())
    }

    /// Returns the names of the handlers of `H`, in dispatch order.
    pub fn order<H: Hook>(&self) -> Vec<&'static str> {
        let Some(table) = self.table::<H>() else {
            return Vec::new();
        };
        table
            .entries()
            .iter()
            .map(|entry| {
                self.systems
                    .get(&entry.owner)
                    .map_or(entry.type_name, |slot| slot.name)
            })
            .collect()
    }

    /// Runs every handler of `H` in order with the same arguments.
    ///
    /// Returns the number of handlers that ran.
    ///
    /// # Panics
    ///
    /// Panics if an enabled system has no registered instance.
    pub fn dispatch<H: Hook>(&mut self, args: &mut H::Args<'_>) -> usize {
        let Some(table) = self
            .tables
            .get(&TypeId::of::<H>())
            .and_then(|table| table.as_any().downcast_ref::<DispatchTable<H>>())
        else {
            return 0;
        };

        for entry in table.entries() {
            let Some(slot) = self.systems.get_mut(&entry.owner) else {
                panic!(
                    "system `{}` is enabled for hook `{}` but has no live instance",
                    entry.type_name,
                    H::NAME
                );
            };
            log::trace!("Dispatching `{}` to `{}`.", H::NAME, slot.name);
            entry.invoke(&mut *slot.instance, args);
        }
        table.entries().len()
    }
}

impl std::fmt::Debug for SystemDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.systems.values().map(|slot| slot.name).collect();
        names.sort_unstable();
        f.debug_struct("SystemDispatcher")
            .field("systems", &names)
            .field("hooks", &self.tables.len())
            .finish()
    }
}
