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

//! The registry, its component pools and the typed component contracts.
//!
//! The primary entry point is [`EntityRegistry`]. Component types are plain
//! `'static` structs that implement [`Component`] (usually through the derive
//! macro); multi-type queries are expressed with tuples through [`ComponentSet`].

mod component;
mod component_types;
mod entity_store;
mod handle;
mod pool;
mod registry;

pub use component::{Component, ComponentSet};
pub use component_types::ComponentTypes;
pub use handle::EntityHandle;
pub use pool::ChunkedPool;
pub use registry::{EntityRegistry, RegistryStats};

pub use tessera_core::ecs::{EntityId, TypeMask};
pub use tessera_macros::Component;
