//! Change notifications for the [`Store`](crate::store::Store).
//!
//! Every store mutation emits a [`StoreEvent`] into a pre-allocated ring
//! buffer. Buffered events are delivered, oldest first, when the owner calls
//! [`Store::flush`](crate::store::Store::flush); reads never wait for
//! delivery, so a write is visible to the next read immediately.
//!
//! # Subscriber Types
//!
//! - **Passive listeners**: read-only, used to re-render views.
//! - **Reactive handlers**: return [`StoreCommand`]s that the store applies
//!   once delivery has finished.
//!
//! Both receive the event together with the current [`AppState`].

use tracing::{trace, warn};

use crate::material::MaterialId;
use crate::store::{AppState, Collection, EntityRef};

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    MaterialChanged {
        previous: MaterialId,
        current: MaterialId,
    },
    IconScaleChanged {
        requested: f64,
        applied: f64,
    },
    CollectionReplaced {
        collection: Collection,
        len: usize,
    },
    SelectionChanged {
        previous: Option<EntityRef>,
        current: Option<EntityRef>,
    },
}

/// Discriminant tag for event types, used for subscription and suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    MaterialChanged,
    IconScaleChanged,
    CollectionReplaced,
    SelectionChanged,
}

const EVENT_KIND_COUNT: usize = 4;

impl StoreEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            StoreEvent::MaterialChanged { .. } => EventKind::MaterialChanged,
            StoreEvent::IconScaleChanged { .. } => EventKind::IconScaleChanged,
            StoreEvent::CollectionReplaced { .. } => EventKind::CollectionReplaced,
            StoreEvent::SelectionChanged { .. } => EventKind::SelectionChanged,
        }
    }
}

impl EventKind {
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// Commands (returned by reactive handlers)
// ---------------------------------------------------------------------------

/// A write a reactive handler asks the store to perform after delivery.
/// Collections are not replaceable through commands; loading stays with
/// the owner of the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCommand {
    SetMaterial(MaterialId),
    SetIconScale(f64),
    Select(EntityRef),
    ClearSelection,
}

// ---------------------------------------------------------------------------
// EventBuffer: pre-allocated ring buffer
// ---------------------------------------------------------------------------

/// Fixed-capacity ring buffer of events. When full, the oldest event is
/// dropped.
#[derive(Debug)]
pub struct EventBuffer {
    events: Vec<Option<StoreEvent>>,
    /// Next write position; also the oldest entry once full.
    head: usize,
    len: usize,
    total_written: u64,
}

impl EventBuffer {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
        }
    }

    /// Push an event. Returns `true` if the oldest event was overwritten.
    pub fn push(&mut self, event: StoreEvent) -> bool {
        let overwrote = self.len == self.capacity();
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % self.capacity();
        if !overwrote {
            self.len += 1;
        }
        self.total_written += 1;
        overwrote
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total events written since creation (including dropped).
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Iterate from oldest to newest.
    pub fn iter(&self) -> EventBufferIter<'_> {
        let start = if self.len < self.capacity() {
            0
        } else {
            self.head
        };
        EventBufferIter {
            buffer: self,
            index: start,
            remaining: self.len,
        }
    }

    /// Remove and return all events, oldest first.
    pub fn drain(&mut self) -> Vec<StoreEvent> {
        let start = if self.len < self.capacity() {
            0
        } else {
            self.head
        };
        let capacity = self.capacity();
        let mut out = Vec::with_capacity(self.len);
        for offset in 0..self.len {
            if let Some(event) = self.events[(start + offset) % capacity].take() {
                out.push(event);
            }
        }
        self.head = 0;
        self.len = 0;
        out
    }

    pub fn clear(&mut self) {
        for slot in &mut self.events {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

pub struct EventBufferIter<'a> {
    buffer: &'a EventBuffer,
    index: usize,
    remaining: usize,
}

impl<'a> Iterator for EventBufferIter<'a> {
    type Item = &'a StoreEvent;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let event = self.buffer.events[self.index].as_ref();
        self.index = (self.index + 1) % self.buffer.capacity();
        self.remaining -= 1;
        event
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for EventBufferIter<'_> {}

// ---------------------------------------------------------------------------
// Subscribers
// ---------------------------------------------------------------------------

pub type PassiveListener = Box<dyn FnMut(&StoreEvent, &AppState)>;

pub type ReactiveHandler = Box<dyn FnMut(&StoreEvent, &AppState) -> Vec<StoreCommand>>;

/// Optional predicate that filters events for a subscriber.
pub type EventFilter = Box<dyn Fn(&StoreEvent) -> bool>;

/// Handle returned on subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

/// Lower priorities run first; equal priorities run in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubscriberPriority {
    Pre = 0,
    Normal = 1,
    Post = 2,
}

enum Subscriber {
    Passive(PassiveListener),
    Reactive(ReactiveHandler),
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Subscriber::Passive(_) => write!(f, "Passive(<fn>)"),
            Subscriber::Reactive(_) => write!(f, "Reactive(<fn>)"),
        }
    }
}

struct SubscriberEntry {
    id: SubscriptionId,
    kind: EventKind,
    priority: SubscriberPriority,
    filter: Option<EventFilter>,
    subscriber: Subscriber,
}

impl std::fmt::Debug for SubscriberEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberEntry")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("priority", &self.priority)
            .field(
                "filter",
                &if self.filter.is_some() {
                    "Some(<fn>)"
                } else {
                    "None"
                },
            )
            .field("subscriber", &self.subscriber)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Buffers emitted events and fans them out to subscribers on delivery.
pub struct EventBus {
    buffer: EventBuffer,
    suppressed: [bool; EVENT_KIND_COUNT],
    /// Kept sorted by `(priority, id)`.
    subscribers: Vec<SubscriberEntry>,
    pending_commands: Vec<StoreCommand>,
    next_id: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("buffer", &self.buffer)
            .field("suppressed", &self.suppressed)
            .field("subscribers", &self.subscribers.len())
            .field("pending_commands", &self.pending_commands)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: EventBuffer::new(capacity),
            suppressed: [false; EVENT_KIND_COUNT],
            subscribers: Vec::new(),
            pending_commands: Vec::new(),
            next_id: 0,
        }
    }

    /// Suppressed kinds are never buffered.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
    }

    pub fn unsuppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = false;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Buffer an event for the next delivery. Suppressed kinds are dropped.
    pub fn emit(&mut self, event: StoreEvent) {
        if self.suppressed[event.kind().index()] {
            return;
        }
        if self.buffer.push(event) {
            warn!(
                capacity = self.buffer.capacity(),
                "event buffer full, dropped oldest undelivered event"
            );
        }
    }

    /// Register a passive listener for `kind` at normal priority.
    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) -> SubscriptionId {
        self.on_passive_filtered(kind, SubscriberPriority::Normal, None, listener)
    }

    /// Register a reactive handler for `kind` at normal priority.
    pub fn on_reactive(&mut self, kind: EventKind, handler: ReactiveHandler) -> SubscriptionId {
        self.on_reactive_filtered(kind, SubscriberPriority::Normal, None, handler)
    }

    pub fn on_passive_filtered(
        &mut self,
        kind: EventKind,
        priority: SubscriberPriority,
        filter: Option<EventFilter>,
        listener: PassiveListener,
    ) -> SubscriptionId {
        self.insert(kind, priority, filter, Subscriber::Passive(listener))
    }

    pub fn on_reactive_filtered(
        &mut self,
        kind: EventKind,
        priority: SubscriberPriority,
        filter: Option<EventFilter>,
        handler: ReactiveHandler,
    ) -> SubscriptionId {
        self.insert(kind, priority, filter, Subscriber::Reactive(handler))
    }

    fn insert(
        &mut self,
        kind: EventKind,
        priority: SubscriberPriority,
        filter: Option<EventFilter>,
        subscriber: Subscriber,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(SubscriberEntry {
            id,
            kind,
            priority,
            filter,
            subscriber,
        });
        self.subscribers.sort_by_key(|entry| (entry.priority, entry.id));
        id
    }

    /// Remove a subscriber. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|entry| entry.id != id);
        self.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Deliver every buffered event, oldest first. For each event the
    /// matching subscribers run in `(priority, registration)` order; filters
    /// returning `false` skip the subscriber for that event. Commands from
    /// reactive handlers accumulate until [`drain_commands`](Self::drain_commands).
    ///
    /// Returns the number of events delivered.
    pub fn deliver(&mut self, state: &AppState) -> usize {
        let events = self.buffer.drain();
        for event in &events {
            let kind = event.kind();
            trace!(?kind, "delivering store event");
            for entry in &mut self.subscribers {
                if entry.kind != kind {
                    continue;
                }
                if let Some(ref filter) = entry.filter
                    && !filter(event)
                {
                    continue;
                }
                match &mut entry.subscriber {
                    Subscriber::Passive(listener) => listener(event, state),
                    Subscriber::Reactive(handler) => {
                        let commands = handler(event, state);
                        self.pending_commands.extend(commands);
                    }
                }
            }
        }
        events.len()
    }

    /// Take the commands reactive handlers returned since the last drain.
    pub fn drain_commands(&mut self) -> Vec<StoreCommand> {
        std::mem::take(&mut self.pending_commands)
    }

    pub fn buffer(&self) -> &EventBuffer {
        &self.buffer
    }

    /// Events waiting for delivery.
    pub fn buffered_count(&self) -> usize {
        self.buffer.len()
    }

    /// Drop buffered events and pending commands. Subscribers and
    /// suppression settings are kept.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.pending_commands.clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
