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

//! Entity and component storage for the Tessera core.
//!
//! This crate owns the data side of the ECS: the [`ecs::EntityRegistry`] that
//! hands out generational ids, the [`ecs::ChunkedPool`] arenas that hold
//! component values, and the [`ecs::EntityHandle`] guards that keep entities
//! alive across deferred destruction.

#![warn(missing_docs)]

// Lets `#[derive(Component)]` resolve `::tessera_data` inside this crate.
extern crate self as tessera_data;

pub mod ecs;
