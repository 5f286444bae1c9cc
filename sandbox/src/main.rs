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

// Tessera Sandbox
// Drives a short frame loop over the registry, dispatcher and event bus.

use std::rc::Rc;

use anyhow::{Context, Result};
use tessera_control::{
    FrameArgs, Handler, Initiate, RenderNotify, Shutdown, System, SystemDispatcher, Update,
};
use tessera_core::event::{EventBus, EventSender, EventSlot, OwnerId};
use tessera_core::CoreConfig;
use tessera_data::ecs::{Component, EntityHandle, EntityId, EntityRegistry};

const FRAMES: u64 = 8;
const DELTA_SECONDS: f32 = 1.0 / 60.0;

const ENTITY_EXPIRED: EventSlot = EventSlot(0);
const VIEWPORT_RESIZED: EventSlot = EventSlot(1);

#[derive(Debug, Clone, Copy)]
enum SandboxEvent {
    Expired(EntityId),
    Resized { width: u32, height: u32 },
}

#[derive(Debug, Clone, Copy, Component)]
struct Position([f32; 2]);

#[derive(Debug, Clone, Copy, Component)]
struct Velocity([f32; 2]);

#[derive(Debug, Clone, Copy, Component)]
struct Lifetime {
    frames_left: u32,
}

#[derive(Debug, Component)]
struct Camera;

#[derive(Default, System)]
#[system(name = "spawner")]
struct Spawner {
    /// Keeps the camera alive even if something destroys it mid-run.
    camera: Option<EntityHandle>,
}

impl Handler<Initiate> for Spawner {
    fn handle(&mut self, args: &mut FrameArgs<'_>) {
        let registry = &mut *args.registry;
        for i in 0..16u32 {
            let id = registry.create();
            let fi = i as f32;
            registry.add_component(id, Position([fi, 0.0]));
            registry.add_component(id, Velocity([1.0, fi * 0.5]));
            registry.add_component(id, Lifetime { frames_left: 2 + i % 6 });
        }

        let camera = registry.create();
        registry.add_component(camera, Camera);
        registry.add_component(camera, Position([0.0, 10.0]));
        self.camera = registry.handle(camera);
        log::info!("Spawned 16 bodies and a camera ({camera}).");
    }
}

#[derive(System)]
#[system(name = "movement")]
struct Movement;

impl Handler<Update> for Movement {
    fn handle(&mut self, args: &mut FrameArgs<'_>) {
        let dt = args.delta_seconds;
        args.registry
            .each_with::<(Position, Velocity), _>(|registry, id| {
                let Some(velocity) = registry.get_component::<Velocity>(id).copied() else {
                    return;
                };
                if let Some(position) = registry.get_component_mut::<Position>(id) {
                    position.0[0] += velocity.0[0] * dt;
                    position.0[1] += velocity.0[1] * dt;
                }
            });
    }
}

#[derive(System)]
#[system(name = "reaper")]
struct Reaper {
    events: EventSender<SandboxEvent>,
}

impl Handler<Update> for Reaper {
    fn handle(&mut self, args: &mut FrameArgs<'_>) {
        let events = &self.events;
        args.registry.each_with::<Lifetime, _>(|registry, id| {
            let expired = match registry.get_component_mut::<Lifetime>(id) {
                Some(lifetime) if lifetime.frames_left == 0 => true,
                Some(lifetime) => {
                    lifetime.frames_left -= 1;
                    false
                }
                None => false,
            };
            if expired && registry.destroy(id) {
                events.post(ENTITY_EXPIRED, SandboxEvent::Expired(id));
            }
        });
    }
}

#[derive(Default, System)]
#[system(name = "reporter")]
struct Reporter {
    last_alive: usize,
}

impl Handler<RenderNotify> for Reporter {
    fn handle(&mut self, args: &mut FrameArgs<'_>) {
        let stats = args.registry.stats();
        if stats.alive != self.last_alive {
            log::info!(
                "Frame {}: {} alive, {} pool chunk(s), {} bytes pooled.",
                args.frame,
                stats.alive,
                stats.pool_chunks,
                stats.pool_bytes
            );
            self.last_alive = stats.alive;
        }
    }
}

impl Handler<Shutdown> for Reporter {
    fn handle(&mut self, args: &mut FrameArgs<'_>) {
        let destroyed = args.registry.clear();
        log::info!("Shutdown cleared {destroyed} entities.");
    }
}

fn load_config() -> Result<CoreConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            CoreConfig::load(&path).with_context(|| format!("loading sandbox config from {path}"))
        }
        None => Ok(CoreConfig::default()),
    }
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = load_config()?;
    config.validate().context("validating sandbox config")?;

    let mut registry = EntityRegistry::try_new(config.registry.clone())?;
    let bus = Rc::new(EventBus::<SandboxEvent>::new(config.events.clone()));

    let expired = Rc::new(std::cell::Cell::new(0u32));
    let counter = Rc::clone(&expired);
    bus.subscribe(OwnerId::new(1), ENTITY_EXPIRED, 0, move |event| {
        if let SandboxEvent::Expired(id) = event {
            log::debug!("Entity {id} expired.");
            counter.set(counter.get() + 1);
        }
    });
    bus.subscribe(OwnerId::new(2), VIEWPORT_RESIZED, 0, |event| {
        if let SandboxEvent::Resized { width, height } = event {
            log::info!("Viewport resized to {width}x{height}.");
        }
    });

    let mut dispatcher = SystemDispatcher::new();
    dispatcher.insert_system(Spawner::default());
    dispatcher.insert_system(Movement);
    dispatcher.insert_system(Reaper {
        events: bus.sender(),
    });
    dispatcher.insert_system(Reporter::default());

    dispatcher.enable::<Initiate, Spawner>(0);
    dispatcher.enable::<Update, Reaper>(10);
    dispatcher.enable::<Update, Movement>(0);
    dispatcher.enable::<RenderNotify, Reporter>(0);
    dispatcher.enable::<Shutdown, Reporter>(0);
    dispatcher.install_plugins();
    log::info!("Update order: {:?}", dispatcher.order::<Update>());

    dispatcher.dispatch::<Initiate>(&mut FrameArgs::new(&mut registry, 0, 0.0));
    for frame in 0..FRAMES {
        dispatcher.dispatch::<Update>(&mut FrameArgs::new(&mut registry, frame, DELTA_SECONDS));
        bus.pump();
        dispatcher.dispatch::<RenderNotify>(&mut FrameArgs::new(
            &mut registry,
            frame,
            DELTA_SECONDS,
        ));
        if frame == FRAMES / 2 {
            bus.dispatch(
                VIEWPORT_RESIZED,
                &SandboxEvent::Resized {
                    width: 1280,
                    height: 720,
                },
            );
        }
    }
    dispatcher.dispatch::<Shutdown>(&mut FrameArgs::new(&mut registry, FRAMES, 0.0));

    if let Some(spawner) = dispatcher.system_mut::<Spawner>() {
        if let Some(camera) = spawner.camera.take() {
            log::info!(
                "Camera {} survived shutdown while held: {}.",
                camera.id(),
                registry.valid(camera.id())
            );
        }
    }

    log::info!("{} entities expired over {FRAMES} frames.", expired.get());
    bus.unsubscribe_owner(OwnerId::new(1));
    bus.unsubscribe_owner(OwnerId::new(2));
    Ok(())
}
