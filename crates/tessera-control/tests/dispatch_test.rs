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

use tessera_control::{
    FrameArgs, Handler, Initiate, Shutdown, System, SystemDispatcher, SystemPlugin, Update,
};
use tessera_core::config::RegistryConfig;
use tessera_data::ecs::{Component, EntityRegistry};

// --- DUMMY COMPONENTS AND SYSTEMS FOR THIS TEST ---
#[derive(Debug, Clone, Copy, PartialEq, Component)]
struct Position(f32);

#[derive(Debug, Clone, Copy, PartialEq, Component)]
struct Velocity(f32);

#[derive(Default, System)]
struct Spawner {
    spawned: usize,
}

impl Handler<Initiate> for Spawner {
    fn handle(&mut self, args: &mut FrameArgs<'_>) {
        for i in 0..3 {
            let id = args.registry.create();
            args.registry.add_component(id, Position(0.0));
            args.registry.add_component(id, Velocity(i as f32));
            self.spawned += 1;
        }
    }
}

#[derive(Default, System)]
#[system(name = "movement")]
struct Movement {
    frames: u64,
}

impl Handler<Update> for Movement {
    fn handle(&mut self, args: &mut FrameArgs<'_>) {
        let dt = args.delta_seconds;
        args.registry
            .each_with::<(Position, Velocity), _>(|registry, id| {
                let velocity = registry.get_component::<Velocity>(id).map_or(0.0, |v| v.0);
                if let Some(position) = registry.get_component_mut::<Position>(id) {
                    position.0 += velocity * dt;
                }
            });
        self.frames = args.frame + 1;
    }
}

impl Handler<Shutdown> for Movement {
    fn handle(&mut self, args: &mut FrameArgs<'_>) {
        args.registry.clear();
    }
}

fn install_spawner(dispatcher: &mut SystemDispatcher) {
    dispatcher.insert_system(Spawner::default());
    dispatcher.enable::<Initiate, Spawner>(0);
}

fn install_movement(dispatcher: &mut SystemDispatcher) {
    dispatcher.insert_system(Movement::default());
    dispatcher.enable::<Update, Movement>(10);
    dispatcher.enable::<Shutdown, Movement>(0);
}

// Submitted out of name order on purpose.
inventory::submit! {
    SystemPlugin::new("movement", install_movement)
}

inventory::submit! {
    SystemPlugin::new("spawner", install_spawner)
}

#[test]
fn test_plugins_drive_a_frame_loop() {
    let _ = env_logger::builder().is_test(true).try_init();

    // --- 1. ARRANGE ---
    let mut registry = EntityRegistry::new(RegistryConfig::default());
    let mut dispatcher = SystemDispatcher::new();
    assert_eq!(dispatcher.install_plugins(), 2);

    // --- 2. ACT ---
    dispatcher.dispatch::<Initiate>(&mut FrameArgs::new(&mut registry, 0, 0.0));
    for frame in 0..4 {
        dispatcher.dispatch::<Update>(&mut FrameArgs::new(&mut registry, frame, 0.5));
    }

    // --- 3. ASSERT ---
    assert_eq!(dispatcher.system::<Spawner>().map(|s| s.spawned), Some(3));
    assert_eq!(dispatcher.system::<Movement>().map(|s| s.frames), Some(4));
    assert_eq!(dispatcher.order::<Update>(), vec!["movement"]);

    let mut positions = Vec::new();
    registry.iterate(|registry, id| {
        if let Some(position) = registry.get_component::<Position>(id) {
            positions.push(position.0);
        }
    });
    assert_eq!(positions, vec![0.0, 2.0, 4.0]);

    dispatcher.dispatch::<Shutdown>(&mut FrameArgs::new(&mut registry, 4, 0.0));
    assert_eq!(registry.alive_count(), 0);
}

#[test]
fn test_default_system_name_is_the_type_name() {
    let spawner = Spawner::default();
    assert_eq!(spawner.name(), "Spawner");
    assert_eq!(Movement::default().name(), "movement");
}
