/// Deterministic event queue.
///
/// Uses a `BinaryHeap` with reversed `Ord` on `Event` to act as a
/// min-heap keyed by `(when, group, order)`. The order is assigned on
/// insertion from a strictly increasing counter, so no two queued events
/// compare equal and pop order is fully determined by insertion history.

use std::collections::BinaryHeap;

use crate::event::{Event, EventOrder, EventOrderGen};

/// Priority queue of pending events.
#[derive(Debug, Default)]
pub struct EventQueue {
    /// Min-heap (via reversed Ord on Event).
    heap: BinaryHeap<Event>,

    /// Enqueue counter.
    order_gen: EventOrderGen,
}

impl EventQueue {
    /// Create a new, empty queue.
    pub fn new() -> Self {
        EventQueue {
            heap: BinaryHeap::new(),
            order_gen: EventOrderGen::new(),
        }
    }

    /// Assign the event its enqueue order and insert it.
    ///
    /// Returns the order assigned.
    pub fn insert(&mut self, mut event: Event) -> EventOrder {
        let order = self.order_gen.next_order();
        event.set_order(order);
        self.heap.push(event);
        order
    }

    /// Pop the earliest event.
    ///
    /// Returns `None` when the queue is empty.
    pub fn pop_min(&mut self) -> Option<Event> {
        self.heap.pop()
    }

    /// Peek at the earliest event without removing it.
    pub fn peek_min(&self) -> Option<&Event> {
        self.heap.peek()
    }

    /// Returns `true` if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Returns the number of pending events.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Total number of events ever inserted.
    pub fn inserted(&self) -> u64 {
        self.order_gen.issued()
    }

    /// Drain all events in pop order into a `Vec`.
    pub fn drain_ordered(&mut self) -> Vec<Event> {
        let mut events = Vec::with_capacity(self.heap.len());
        while let Some(e) = self.heap.pop() {
            events.push(e);
        }
        events
    }
}
