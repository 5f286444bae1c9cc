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

use std::any::{type_name, Any, TypeId};
use std::marker::PhantomData;

use crate::system::{Handler, Hook};

/// Calls `S`'s implementation of `H` on a type-erased instance.
trait Invoke<H: Hook> {
    fn invoke(&self, system: &mut dyn Any, args: &mut H::Args<'_>);
}

struct Invoker<S>(PhantomData<fn() -> S>);

impl<H: Hook, S: Handler<H>> Invoke<H> for Invoker<S> {
    fn invoke(&self, system: &mut dyn Any, args: &mut H::Args<'_>) {
        match system.downcast_mut::<S>() {
            Some(system) => system.handle(args),
            None => panic!(
                "dispatch table for `{}` holds a mismatched instance for `{}`",
                H::NAME,
                type_name::<S>()
            ),
        }
    }
}

pub(crate) struct Entry<H: Hook> {
    pub(crate) owner: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) priority: i32,
    invoker: Box<dyn Invoke<H>>,
}

impl<H: Hook> Entry<H> {
    pub(crate) fn invoke(&self, system: &mut dyn Any, args: &mut H::Args<'_>) {
        self.invoker.invoke(system, args);
    }
}

/// Handlers of one hook in ascending priority; ties keep enable order.
pub(crate) struct DispatchTable<H: Hook> {
    entries: Vec<Entry<H>>,
}

impl<H: Hook> DispatchTable<H> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds `S` or moves it to its new priority.
    pub(crate) fn enable<S: Handler<H>>(&mut self, priority: i32) {
        let owner = TypeId::of::<S>();
        self.remove(owner);
        let position = self.entries.partition_point(|entry| entry.priority <= priority);
        self.entries.insert(
            position,
            Entry {
                owner,
                type_name: type_name::<S>(),
                priority,
                invoker: Box::new(Invoker::<S>(PhantomData)),
            },
        );
    }

    pub(crate) fn entries(&self) -> &[Entry<H>] {
        &self.entries
    }

    pub(crate) fn priority_of(&self, owner: TypeId) -> Option<i32> {
        self.entries
            .iter()
            .find(|entry| entry.owner == owner)
            .map(|entry| entry.priority)
    }
}

/// Type-erased view of a [`DispatchTable`], so the dispatcher can manage
/// tables of every hook in one map.
pub(crate) trait AnyTable {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn remove(&mut self, owner: TypeId) -> bool;
    fn hook_name(&self) -> &'static str;
}

impl<H: Hook> AnyTable for DispatchTable<H> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn remove(&mut self, owner: TypeId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.owner != owner);
        self.entries.len() != before
    }

    fn hook_name(&self) -> &'static str {
        H::NAME
    }
}
