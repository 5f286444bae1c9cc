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

//! Exercises the registry through its public surface only, the way a host
//! crate would.

use tessera_core::config::{CoreConfig, RegistryConfig};
use tessera_data::ecs::{Component, EntityHandle, EntityRegistry};

// --- DUMMY COMPONENTS FOR THIS TEST ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Component)]
struct Health(i32);

#[derive(Debug, Clone, PartialEq, Eq, Component)]
struct Name(String);

/// A stand-in for a game-side "possession" link that must keep its target alive.
struct Possession {
    target: EntityHandle,
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_health_scenario() {
    init_logger();

    // --- 1. ARRANGE ---
    let mut registry = EntityRegistry::new(RegistryConfig::default());
    let a = registry.create();
    registry.add_component(a, Health(100));

    // --- 2. ACT ---
    registry.destroy(a);

    // --- 3. ASSERT ---
    assert!(registry.get_component::<Health>(a).is_none());
    assert!(!registry.valid(a));
}

#[test]
fn test_possession_keeps_target_alive() {
    init_logger();

    // --- 1. ARRANGE ---
    let mut registry = EntityRegistry::new(RegistryConfig::default());
    let body = registry.create();
    registry.add_component(body, Name("body".to_owned()));
    let possession = Possession {
        target: registry.handle(body).expect("body is alive"),
    };

    // --- 2. ACT ---
    registry.destroy(body);

    // --- 3. ASSERT ---
    let target = possession.target.id();
    assert_eq!(target, body);
    assert!(registry.valid(target), "A possessed entity outlives destroy");
    assert_eq!(
        registry.get_component::<Name>(target).map(|n| n.0.as_str()),
        Some("body")
    );

    drop(possession);
    assert!(!registry.valid(body));
    assert_eq!(registry.stats().pending_destroy, 1, "Teardown waits for the next mutation");
    registry.create();
    assert_eq!(registry.stats().pending_destroy, 0);
}

#[test]
fn test_registry_from_ron_config() {
    init_logger();

    let config = CoreConfig::from_ron_str("(registry: (chunk_size: 256, max_component_types: 4))")
        .expect("valid RON");
    let mut registry = EntityRegistry::new(config.registry);
    let id = registry.create();
    registry.add_component(id, Health(1));

    assert_eq!(registry.config().chunk_size, 256);
    assert_eq!(registry.component_types().limit(), 4);
    assert_eq!(registry.stats().pool_bytes, 256);
}

#[test]
fn test_handles_outliving_registry_are_harmless() {
    init_logger();

    let mut registry = EntityRegistry::default();
    let id = registry.create();
    let handle = registry.handle(id).expect("alive");
    drop(registry);
    drop(handle);
}
