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
use std::collections::HashMap;
use std::fmt;

use crate::config::EventBusConfig;
use crate::ecs::EntityId;

/// Identifies one event channel of a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventSlot(pub u16);

impl EventSlot {
    /// Returns the slot as a table index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u16> for EventSlot {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

/// Opaque identity of a subscriber.
///
/// An owner can hold at most one binding per event slot. Owners are usually
/// derived from the address of the subscribing object or from an entity id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(u64);

impl OwnerId {
    /// Creates an owner from a raw value.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Derives an owner from the address of `value`.
    ///
    /// The id is only meaningful while `value` stays at the same address.
    pub fn of<T: ?Sized>(value: &T) -> Self {
        Self(value as *const T as *const () as usize as u64)
    }

    /// Returns the raw value.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<EntityId> for OwnerId {
    fn from(id: EntityId) -> Self {
        Self(id.to_bits())
    }
}

impl fmt::Debug for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OwnerId({:#x})", self.0)
    }
}

type Handler<E> = Box<dyn FnMut(&E)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Free,
    Live,
    /// Unbound during a dispatch pass; freed when the outermost pass ends.
    Retired,
}

struct Listener<E> {
    owner: OwnerId,
    order: i32,
    handler: Option<Handler<E>>,
    state: SlotState,
    generation: u32,
}

struct BusState<E> {
    listeners: Vec<Listener<E>>,
    free_slots: Vec<u32>,
    /// Per event slot, listener indices in dispatch order.
    order: Vec<Vec<u32>>,
    bindings: HashMap<(OwnerId, EventSlot), u32>,
    dispatch_depth: u32,
    retired: Vec<u32>,
}

impl<E> BusState<E> {
    /// Removes the `(owner, event)` binding. Returns the handler when it can
    /// be released immediately, so the caller can drop it outside the borrow.
    fn unbind(&mut self, owner: OwnerId, event: EventSlot) -> Option<Option<Handler<E>>> {
        let index = self.bindings.remove(&(owner, event))?;
        let order = &mut self.order[event.index()];
        if let Some(position) = order.iter().position(|slot| *slot == index) {
            order.remove(position);
        }

        let listener = &mut self.listeners[index as usize];
        if self.dispatch_depth > 0 {
            listener.state = SlotState::Retired;
            self.retired.push(index);
            return Some(None);
        }
        Some(self.release(index))
    }

    fn release(&mut self, index: u32) -> Option<Handler<E>> {
        let listener = &mut self.listeners[index as usize];
        listener.state = SlotState::Free;
        listener.generation = listener.generation.wrapping_add(1);
        self.free_slots.push(index);
        listener.handler.take()
    }
}

/// A many-producer, many-consumer event channel with ordered subscriptions.
///
/// Each event slot keeps its listeners in ascending `order`; a new listener is
/// placed before the first existing listener whose order is not less than its
/// own, so among equal orders the most recent subscription runs first.
///
/// All methods take `&self`, which lets handlers subscribe, unsubscribe or
/// dispatch again while a dispatch is in progress. A pass works on a snapshot
/// of the slot's listeners taken before the first handler runs: bindings made
/// during the pass are not called by it, and bindings removed during the pass
/// are still called by it, then released once the outermost pass returns.
/// A handler is never re-entered by a nested dispatch of its own slot.
///
/// Events can also be queued with [`EventBus::post`] or an [`EventSender`] and
/// delivered later by [`EventBus::pump`].
pub struct EventBus<E: 'static> {
    config: EventBusConfig,
    state: RefCell<BusState<E>>,
    sender: flume::Sender<(EventSlot, E)>,
    receiver: flume::Receiver<(EventSlot, E)>,
}

/// A cloneable handle for queueing events onto a bus.
pub struct EventSender<E> {
    sender: flume::Sender<(EventSlot, E)>,
}

impl<E> Clone for EventSender<E> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<E> EventSender<E> {
    /// Queues `event` for the next [`EventBus::pump`]. Returns `false` if the
    /// bus has been dropped.
    pub fn post(&self, slot: EventSlot, event: E) -> bool {
        if self.sender.send((slot, event)).is_err() {
            log::error!("Failed to post event to slot {}: bus dropped.", slot.0);
            return false;
        }
        true
    }
}

struct DispatchScope<'a, E: 'static> {
    bus: &'a EventBus<E>,
}

impl<E: 'static> Drop for DispatchScope<'_, E> {
    fn drop(&mut self) {
        let released = {
            let mut state = self.bus.state.borrow_mut();
            state.dispatch_depth -= 1;
            if state.dispatch_depth > 0 {
                return;
            }
            let retired = std::mem::take(&mut state.retired);
            retired
                .into_iter()
                .filter_map(|index| state.release(index))
                .collect::<Vec<_>>()
        };
        drop(released);
    }
}

impl<E: 'static> EventBus<E> {
    /// Creates a bus with the given capacities.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid.
    pub fn new(config: EventBusConfig) -> Self {
        if let Err(e) = config.validate() {
            panic!("EventBus configuration rejected: {e}");
        }
        let (sender, receiver) = flume::unbounded();
        let state = BusState {
            listeners: Vec::new(),
            free_slots: Vec::new(),
            order: (0..config.events)
                .map(|_| Vec::with_capacity(config.listeners_per_event))
                .collect(),
            bindings: HashMap::new(),
            dispatch_depth: 0,
            retired: Vec::new(),
        };
        log::info!(
            "EventBus initialized ({} events x {} listeners).",
            config.events,
            config.listeners_per_event
        );
        Self {
            config,
            state: RefCell::new(state),
            sender,
            receiver,
        }
    }

    /// Returns the capacities the bus was built with.
    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }

    fn check_slot(&self, slot: EventSlot) {
        assert!(
            slot.index() < self.config.events,
            "event slot {} exceeds configured capacity {}",
            slot.0,
            self.config.events
        );
    }

    /// Binds `handler` to `slot` on behalf of `owner`.
    ///
    /// Re-subscribing the same `(owner, slot)` replaces the previous binding.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range or the slot already holds
    /// `listeners_per_event` listeners.
    pub fn subscribe<F>(&self, owner: OwnerId, slot: EventSlot, order: i32, handler: F)
    where
        F: FnMut(&E) + 'static,
    {
        self.check_slot(slot);
        let replaced = {
            let mut state = self.state.borrow_mut();
            let replaced = state.unbind(owner, slot).flatten();

            assert!(
                state.order[slot.index()].len() < self.config.listeners_per_event,
                "event slot {} is full ({} listeners)",
                slot.0,
                self.config.listeners_per_event
            );

            let index = match state.free_slots.pop() {
                Some(index) => index,
                None => {
                    let index = state.listeners.len() as u32;
                    state.listeners.push(Listener {
                        owner,
                        order,
                        handler: None,
                        state: SlotState::Free,
                        generation: 0,
                    });
                    index
                }
            };

            let listener = &mut state.listeners[index as usize];
            listener.owner = owner;
            listener.order = order;
            listener.handler = Some(Box::new(handler));
            listener.state = SlotState::Live;

            let BusState {
                listeners, order: orders, ..
            } = &mut *state;
            let sequence = &mut orders[slot.index()];
            let position = sequence
                .iter()
                .position(|existing| listeners[*existing as usize].order >= order)
                .unwrap_or(sequence.len());
            sequence.insert(position, index);
            state.bindings.insert((owner, slot), index);

            log::trace!("{owner:?} subscribed to slot {} (order {order}).", slot.0);
            replaced
        };
        drop(replaced);
    }

    /// Removes the binding of `owner` on `slot`. Returns `false` if there was none.
    pub fn unsubscribe(&self, owner: OwnerId, slot: EventSlot) -> bool {
        self.check_slot(slot);
        let removed = self.state.borrow_mut().unbind(owner, slot);
        match removed {
            Some(handler) => {
                drop(handler);
                true
            }
            None => false,
        }
    }

    /// Removes every binding held by `owner`. Returns how many were removed.
    pub fn unsubscribe_owner(&self, owner: OwnerId) -> usize {
        let released = {
            let mut state = self.state.borrow_mut();
            let slots: Vec<EventSlot> = state
                .bindings
                .keys()
                .filter(|(bound, _)| *bound == owner)
                .map(|(_, slot)| *slot)
                .collect();
            slots
                .into_iter()
                .filter_map(|slot| state.unbind(owner, slot))
                .collect::<Vec<_>>()
        };
        let count = released.len();
        drop(released);
        count
    }

    /// Removes every binding on `slot`. Returns how many were removed.
    pub fn unsubscribe_event(&self, slot: EventSlot) -> usize {
        self.check_slot(slot);
        let released = {
            let mut state = self.state.borrow_mut();
            let owners: Vec<OwnerId> = state.order[slot.index()]
                .iter()
                .map(|index| state.listeners[*index as usize].owner)
                .collect();
            owners
                .into_iter()
                .filter_map(|owner| state.unbind(owner, slot))
                .collect::<Vec<_>>()
        };
        let count = released.len();
        drop(released);
        count
    }

    /// Invokes every listener bound to `slot` in order, passing `event`.
    ///
    /// Returns the number of handlers that ran.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range.
    pub fn dispatch(&self, slot: EventSlot, event: &E) -> usize {
        self.check_slot(slot);
        let snapshot: Vec<(u32, u32)> = {
            let mut state = self.state.borrow_mut();
            state.dispatch_depth += 1;
            state.order[slot.index()]
                .iter()
                .map(|index| (*index, state.listeners[*index as usize].generation))
                .collect()
        };
        let _scope = DispatchScope { bus: self };

        let mut invoked = 0;
        for (index, generation) in snapshot {
            let handler = {
                let mut state = self.state.borrow_mut();
                let listener = &mut state.listeners[index as usize];
                if listener.generation != generation || listener.state == SlotState::Free {
                    continue;
                }
                match listener.handler.take() {
                    Some(handler) => handler,
                    // Already running further up the stack.
                    None => continue,
                }
            };

            let mut handler = handler;
            handler(event);
            invoked += 1;

            let mut state = self.state.borrow_mut();
            let listener = &mut state.listeners[index as usize];
            if listener.generation == generation && listener.handler.is_none() {
                listener.handler = Some(handler);
            } else {
                drop(state);
                drop(handler);
            }
        }
        invoked
    }

    /// Queues `event` on `slot` for the next [`EventBus::pump`].
    pub fn post(&self, slot: EventSlot, event: E) {
        self.check_slot(slot);
        if let Err(e) = self.sender.send((slot, event)) {
            log::error!("Failed to queue event: {e}.");
        }
    }

    /// Returns a sender that queues events onto this bus.
    pub fn sender(&self) -> EventSender<E> {
        EventSender {
            sender: self.sender.clone(),
        }
    }

    /// Dispatches queued events in FIFO order until the queue is empty,
    /// including events queued by the handlers themselves.
    ///
    /// Returns the number of events delivered.
    pub fn pump(&self) -> usize {
        let mut delivered = 0;
        while let Ok((slot, event)) = self.receiver.try_recv() {
            if slot.index() >= self.config.events {
                log::error!("Dropping queued event for out-of-range slot {}.", slot.0);
                continue;
            }
            self.dispatch(slot, &event);
            delivered += 1;
        }
        delivered
    }

    /// Returns the number of events waiting for [`EventBus::pump`].
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Returns `true` if `owner` has a binding on `slot`.
    pub fn is_subscribed(&self, owner: OwnerId, slot: EventSlot) -> bool {
        self.state.borrow().bindings.contains_key(&(owner, slot))
    }

    /// Returns the total number of live bindings.
    pub fn listener_count(&self) -> usize {
        self.state.borrow().bindings.len()
    }

    /// Returns the owners bound to `slot`, in dispatch order.
    pub fn listeners_of(&self, slot: EventSlot) -> Vec<OwnerId> {
        self.check_slot(slot);
        let state = self.state.borrow();
        state.order[slot.index()]
            .iter()
            .map(|index| state.listeners[*index as usize].owner)
            .collect()
    }
}

impl<E: 'static> Default for EventBus<E> {
    fn default() -> Self {
        Self::new(EventBusConfig::default())
    }
}

impl<E: 'static> Drop for EventBus<E> {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if !state.bindings.is_empty() {
            log::warn!(
                "EventBus dropped with {} live listener(s); releasing them.",
                state.bindings.len()
            );
        }
        state.bindings.clear();
        for order in &mut state.order {
            order.clear();
        }
        let handlers: Vec<_> = state
            .listeners
            .iter_mut()
            .filter_map(|listener| listener.handler.take())
            .collect();
        drop(handlers);
    }
}

impl<E: 'static> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("config", &self.config)
            .field("listeners", &self.listener_count())
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    const RESIZED: EventSlot = EventSlot(0);
    const CLOSED: EventSlot = EventSlot(1);

    type Log = Rc<RefCell<Vec<(&'static str, i32)>>>;

    fn recorder(log: &Log, name: &'static str) -> impl FnMut(&i32) + 'static {
        let log = Rc::clone(log);
        move |value| log.borrow_mut().push((name, *value))
    }

    #[test]
    fn lower_order_dispatches_first() {
        let bus = EventBus::<i32>::default();
        let log: Log = Rc::default();
        let x = OwnerId::new(1);
        let y = OwnerId::new(2);

        bus.subscribe(x, RESIZED, 0, recorder(&log, "x"));
        bus.subscribe(y, RESIZED, -1, recorder(&log, "y"));

        assert_eq!(bus.dispatch(RESIZED, &42), 2);
        assert_eq!(*log.borrow(), vec![("y", 42), ("x", 42)]);
    }

    #[test]
    fn equal_order_runs_most_recent_first() {
        let bus = EventBus::<i32>::default();
        let log: Log = Rc::default();

        bus.subscribe(OwnerId::new(1), RESIZED, 5, recorder(&log, "first"));
        bus.subscribe(OwnerId::new(2), RESIZED, 5, recorder(&log, "second"));
        bus.subscribe(OwnerId::new(3), RESIZED, 9, recorder(&log, "late"));

        bus.dispatch(RESIZED, &1);
        let names: Vec<_> = log.borrow().iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["second", "first", "late"]);
    }

    #[test]
    fn resubscribe_replaces_previous_binding() {
        let bus = EventBus::<i32>::default();
        let log: Log = Rc::default();
        let owner = OwnerId::new(7);

        bus.subscribe(owner, RESIZED, 0, recorder(&log, "old"));
        bus.subscribe(owner, RESIZED, 0, recorder(&log, "new"));

        assert_eq!(bus.listener_count(), 1);
        bus.dispatch(RESIZED, &3);
        assert_eq!(*log.borrow(), vec![("new", 3)]);
    }

    #[test]
    fn unsubscribe_variants() {
        let bus = EventBus::<i32>::default();
        let a = OwnerId::new(1);
        let b = OwnerId::new(2);
        bus.subscribe(a, RESIZED, 0, |_| {});
        bus.subscribe(a, CLOSED, 0, |_| {});
        bus.subscribe(b, RESIZED, 0, |_| {});
        bus.subscribe(b, CLOSED, 0, |_| {});

        assert!(bus.unsubscribe(a, RESIZED));
        assert!(!bus.unsubscribe(a, RESIZED));
        assert_eq!(bus.unsubscribe_owner(b), 2);
        assert_eq!(bus.unsubscribe_event(CLOSED), 1);
        assert_eq!(bus.listener_count(), 0);
        assert_eq!(bus.dispatch(RESIZED, &0), 0);
    }

    #[test]
    fn unsubscribed_listener_still_runs_in_current_pass() {
        let bus = Rc::new(EventBus::<i32>::default());
        let log: Log = Rc::default();
        let first = OwnerId::new(1);
        let second = OwnerId::new(2);

        let weak = Rc::downgrade(&bus);
        let first_log = Rc::clone(&log);
        bus.subscribe(first, RESIZED, 0, move |value| {
            first_log.borrow_mut().push(("first", *value));
            if let Some(bus) = weak.upgrade() {
                bus.unsubscribe(second, RESIZED);
            }
        });
        bus.subscribe(second, RESIZED, 1, recorder(&log, "second"));

        assert_eq!(bus.dispatch(RESIZED, &1), 2);
        assert_eq!(*log.borrow(), vec![("first", 1), ("second", 1)]);
        assert!(!bus.is_subscribed(second, RESIZED));

        log.borrow_mut().clear();
        assert_eq!(bus.dispatch(RESIZED, &2), 1);
        assert_eq!(*log.borrow(), vec![("first", 2)]);
    }

    #[test]
    fn subscription_during_dispatch_waits_for_next_pass() {
        let bus = Rc::new(EventBus::<i32>::default());
        let log: Log = Rc::default();
        let late = OwnerId::new(99);

        let weak = Rc::downgrade(&bus);
        let inner_log = Rc::clone(&log);
        bus.subscribe(OwnerId::new(1), RESIZED, 0, move |_| {
            if let Some(bus) = weak.upgrade() {
                let log = Rc::clone(&inner_log);
                bus.subscribe(late, RESIZED, -10, move |v| log.borrow_mut().push(("late", *v)));
            }
        });

        assert_eq!(bus.dispatch(RESIZED, &1), 1);
        assert!(log.borrow().is_empty());
        assert_eq!(bus.dispatch(RESIZED, &2), 2);
        assert_eq!(*log.borrow(), vec![("late", 2)]);
    }

    #[test]
    fn self_unsubscribe_releases_after_pass() {
        let bus = Rc::new(EventBus::<i32>::default());
        let calls = Rc::new(Cell::new(0));
        let owner = OwnerId::new(5);

        let weak = Rc::downgrade(&bus);
        let counter = Rc::clone(&calls);
        bus.subscribe(owner, RESIZED, 0, move |_| {
            counter.set(counter.get() + 1);
            if let Some(bus) = weak.upgrade() {
                bus.unsubscribe(owner, RESIZED);
            }
        });

        bus.dispatch(RESIZED, &0);
        bus.dispatch(RESIZED, &0);
        assert_eq!(calls.get(), 1);
        // The closure held one clone of `calls`; it is gone once released.
        assert_eq!(Rc::strong_count(&calls), 1);
    }

    #[test]
    fn nested_dispatch_does_not_reenter_running_handler() {
        let bus = Rc::new(EventBus::<i32>::default());
        let calls = Rc::new(Cell::new(0));

        let weak = Rc::downgrade(&bus);
        let counter = Rc::clone(&calls);
        bus.subscribe(OwnerId::new(1), RESIZED, 0, move |depth| {
            counter.set(counter.get() + 1);
            if *depth == 0 {
                if let Some(bus) = weak.upgrade() {
                    assert_eq!(bus.dispatch(RESIZED, &1), 0);
                }
            }
        });

        assert_eq!(bus.dispatch(RESIZED, &0), 1);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn queued_events_are_pumped_in_order() {
        let bus = EventBus::<i32>::default();
        let log: Log = Rc::default();
        bus.subscribe(OwnerId::new(1), RESIZED, 0, recorder(&log, "r"));
        bus.subscribe(OwnerId::new(1), CLOSED, 0, recorder(&log, "c"));

        let sender = bus.sender();
        bus.post(RESIZED, 1);
        assert!(sender.post(CLOSED, 2));
        bus.post(RESIZED, 3);
        assert_eq!(bus.pending(), 3);

        assert_eq!(bus.pump(), 3);
        assert_eq!(*log.borrow(), vec![("r", 1), ("c", 2), ("r", 3)]);
        assert_eq!(bus.pending(), 0);
    }

    #[test]
    fn sender_reports_dropped_bus() {
        let bus = EventBus::<i32>::default();
        let sender = bus.sender();
        drop(bus);
        assert!(!sender.post(RESIZED, 1));
    }

    #[test]
    fn drop_releases_remaining_listeners() {
        let token = Rc::new(());
        {
            let bus = EventBus::<i32>::default();
            let held = Rc::clone(&token);
            bus.subscribe(OwnerId::new(1), RESIZED, 0, move |_| {
                let _ = &held;
            });
            assert_eq!(Rc::strong_count(&token), 2);
        }
        assert_eq!(Rc::strong_count(&token), 1);
    }

    #[test]
    #[should_panic(expected = "is full")]
    fn listener_capacity_is_fatal() {
        let bus = EventBus::<i32>::new(EventBusConfig {
            events: 1,
            listeners_per_event: 2,
        });
        for owner in 0..3 {
            bus.subscribe(OwnerId::new(owner), RESIZED, 0, |_| {});
        }
    }

    #[test]
    #[should_panic(expected = "exceeds configured capacity")]
    fn event_capacity_is_fatal() {
        let bus = EventBus::<i32>::new(EventBusConfig {
            events: 1,
            listeners_per_event: 2,
        });
        bus.dispatch(EventSlot(1), &0);
    }

    #[test]
    fn owner_from_entity_and_address() {
        let id = EntityId::new(4, 2);
        assert_eq!(OwnerId::from(id).raw(), id.to_bits());

        let a = 1u32;
        let b = 2u32;
        assert_ne!(OwnerId::of(&a), OwnerId::of(&b));
        assert_eq!(OwnerId::of(&a), OwnerId::of(&a));
    }
}
