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

//! The standard lifecycle hooks a host frame loop drives.

use tessera_data::ecs::EntityRegistry;

use crate::system::Hook;

/// Arguments shared by the standard frame hooks.
#[derive(Debug)]
pub struct FrameArgs<'a> {
    /// The registry systems read and mutate.
    pub registry: &'a mut EntityRegistry,
    /// Number of frames completed before this one.
    pub frame: u64,
    /// Seconds since the previous frame.
    pub delta_seconds: f32,
}

impl<'a> FrameArgs<'a> {
    /// Bundles frame arguments.
    pub fn new(registry: &'a mut EntityRegistry, frame: u64, delta_seconds: f32) -> Self {
        Self {
            registry,
            frame,
            delta_seconds,
        }
    }
}

macro_rules! frame_hook {
    ($(#[$doc:meta])* $name:ident, $label:literal) => {
        $(#[$doc])*
        #[derive(Debug)]
        pub enum $name {}

        impl Hook for $name {
            type Args<'a> = FrameArgs<'a>;
            const NAME: &'static str = $label;
        }
    };
}

frame_hook!(
    /// Runs once, before the first frame.
    Initiate,
    "initiate"
);
frame_hook!(
    /// Runs every frame to advance simulation state.
    Update,
    "update"
);
frame_hook!(
    /// Runs every frame after [`Update`], for collaborators that present state.
    RenderNotify,
    "render-notify"
);
frame_hook!(
    /// Runs once, after the last frame.
    Shutdown,
    "shutdown"
);
