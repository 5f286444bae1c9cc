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

//! Lifecycle dispatch for the Tessera core.
//!
//! Systems are plain structs registered with a [`SystemDispatcher`]. Each
//! lifecycle point is a [`Hook`] marker type; a system opts into a hook by
//! implementing [`Handler`] for it and being enabled with a priority. The host
//! then calls [`SystemDispatcher::dispatch`] for each hook in whatever order
//! its frame loop needs.

#![warn(missing_docs)]

// Lets `#[derive(System)]` resolve `::tessera_control` inside this crate.
extern crate self as tessera_control;

pub mod dispatcher;
pub mod hooks;
pub mod plugin;
pub mod system;
mod table;

pub use dispatcher::SystemDispatcher;
pub use hooks::{FrameArgs, Initiate, RenderNotify, Shutdown, Update};
pub use plugin::SystemPlugin;
pub use system::{Handler, Hook, System};
pub use tessera_macros::System;

/// Re-exported so plugin crates can register without depending on `inventory`.
pub use inventory;
