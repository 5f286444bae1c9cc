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

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use tessera_core::event::{EventBus, EventSlot, OwnerId};
use tessera_core::{ConfigError, CoreConfig};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_load_config_from_file_drives_bus_capacity() {
    init_logger();

    // --- 1. ARRANGE ---
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(
        file,
        "(registry: (chunk_size: 1024), events: (events: 2, listeners_per_event: 1))"
    )
    .expect("write config");

    // --- 2. ACT ---
    let config = CoreConfig::load(file.path()).expect("config loads");
    let bus = EventBus::<u8>::new(config.events.clone());

    // --- 3. ASSERT ---
    assert_eq!(config.registry.chunk_size, 1024);
    assert_eq!(
        config.registry.max_component_types, 64,
        "Missing fields fall back to defaults"
    );
    bus.subscribe(OwnerId::new(1), EventSlot(1), 0, |_| {});
    assert_eq!(bus.listener_count(), 1);
}

#[test]
fn test_malformed_config_file_is_a_parse_error() {
    init_logger();

    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "(registry: (chunk_size: \"big\"))").expect("write config");

    let err = CoreConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)), "unexpected error: {err}");
}

#[test]
fn test_invalid_values_are_rejected_after_parsing() {
    init_logger();

    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "(events: (events: 0))").expect("write config");

    let err = CoreConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_owner_unsubscribe_from_inside_dispatch() {
    init_logger();

    // --- 1. ARRANGE ---
    let bus = Rc::new(EventBus::<&'static str>::default());
    let log = Rc::new(RefCell::new(Vec::new()));
    let window = OwnerId::new(10);
    let hud = OwnerId::new(20);

    for (order, (owner, name)) in [(window, "window"), (hud, "hud")].into_iter().enumerate() {
        let log = Rc::clone(&log);
        let weak = Rc::downgrade(&bus);
        bus.subscribe(owner, EventSlot(0), order as i32, move |event: &&'static str| {
            log.borrow_mut().push(format!("{name}:{event}"));
            if *event == "close" {
                if let Some(bus) = weak.upgrade() {
                    bus.unsubscribe_event(EventSlot(0));
                }
            }
        });
    }

    // --- 2. ACT ---
    bus.dispatch(EventSlot(0), &"close");
    bus.dispatch(EventSlot(0), &"again");

    // --- 3. ASSERT ---
    assert_eq!(*log.borrow(), vec!["window:close", "hud:close"]);
    assert_eq!(bus.listener_count(), 0);
}
