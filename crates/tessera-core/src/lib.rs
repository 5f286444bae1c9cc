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

//! # Tessera Core
//!
//! Foundational crate containing the identity types, the component bitmask,
//! the instance-scoped event bus and the configuration contracts shared by the
//! rest of the workspace.
//!
//! Everything in this crate is single-threaded by design: a registry, a bus or
//! a dispatcher belongs to exactly one host thread.

#![warn(missing_docs)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod event;
pub mod utils;

pub use config::{CoreConfig, EventBusConfig, RegistryConfig};
pub use error::ConfigError;
