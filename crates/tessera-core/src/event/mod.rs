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

//! Provides the instance-scoped event bus used for loosely-coupled notification.
//!
//! Unlike lifecycle dispatch, which walks every enabled system in priority
//! order, the [`EventBus`] lets arbitrary owners bind one closure per event
//! slot and receive only the events they asked for. Subscriptions may be added
//! or removed from inside a handler; a dispatch pass always invokes exactly the
//! listeners that were bound when it started.

mod bus;

pub use self::bus::{EventBus, EventSender, EventSlot, OwnerId};
