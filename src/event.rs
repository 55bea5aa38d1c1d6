/// Event model for the logic simulation.
///
/// Every signal change is modeled as an `Event` placed on the
/// scheduler's priority queue. Processing an event consumes it and may
/// produce follow-up events, which the scheduler enqueues in turn.
///
/// Events are totally ordered by `(when, group, order)`. The group
/// batches events that must be observed together: all edges arriving at
/// one component at one timestamp share a group, and only the last of
/// them triggers the component's clock phase.

use std::cmp::Ordering;

use tracing::trace;

use crate::circuit::Circuit;
use crate::component::{ComponentId, Level};
use crate::time::SimTime;

// ── Event order ───────────────────────────────────────────────────────

/// Strictly increasing enqueue counter value.
///
/// Assigned when an event is scheduled. Breaks ties between events with
/// the same `(when, group)` in scheduling order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct EventOrder(u64);

impl EventOrder {
    #[inline]
    pub fn new(raw: u64) -> Self {
        EventOrder(raw)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EventOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Deterministic, strictly-increasing enqueue counter.
#[derive(Debug, Clone, Default)]
pub struct EventOrderGen {
    next: u64,
}

impl EventOrderGen {
    pub fn new() -> Self {
        EventOrderGen { next: 0 }
    }

    /// Mint the next order value.
    pub fn next_order(&mut self) -> EventOrder {
        let order = EventOrder(self.next);
        self.next += 1;
        order
    }

    /// Number of values handed out so far.
    pub fn issued(&self) -> u64 {
        self.next
    }
}

// ── Group ─────────────────────────────────────────────────────────────

/// Batch tag of an event.
///
/// The derived ordering puts every output commit before every plain
/// event, plain events before input edges, and actions last:
///
/// `Commit(_) < Tag(_) < Edge(_) < Action`
///
/// so a component's own output commits, and the edges they create for
/// the same timestamp, are in place before any input edge of that
/// timestamp is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Group {
    /// Output commits of one component.
    Commit(ComponentId),
    /// Plain events with a caller-chosen tag.
    Tag(i64),
    /// Input edges of one component.
    Edge(ComponentId),
    /// Deferred callbacks.
    Action,
}

// ── Event kind ────────────────────────────────────────────────────────

/// Callback fired by an [`EventKind::Action`].
pub type ActionFn = Box<dyn FnOnce(SimTime) -> Vec<Event>>;

/// What an event does when processed.
pub enum EventKind {
    /// Does nothing.
    Marker,

    /// An input level change on `component`. Without `input` the event
    /// only forces a clock phase.
    Edge {
        component: ComponentId,
        input: Option<(usize, Level)>,
    },

    /// An output level commit on `component`, carried across the wire.
    OutEdge {
        component: ComponentId,
        output_port: usize,
        state: Level,
    },

    /// A deferred one-shot callback.
    Action(ActionFn),
}

impl std::fmt::Debug for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Marker => write!(f, "Marker"),
            EventKind::Edge { component, input } => f
                .debug_struct("Edge")
                .field("component", component)
                .field("input", input)
                .finish(),
            EventKind::OutEdge {
                component,
                output_port,
                state,
            } => f
                .debug_struct("OutEdge")
                .field("component", component)
                .field("output_port", output_port)
                .field("state", state)
                .finish(),
            EventKind::Action(_) => write!(f, "Action(..)"),
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Marker => write!(f, "Marker"),
            EventKind::Edge {
                component,
                input: Some((port, state)),
            } => write!(f, "Edge({}.in{} = {})", component, port, state),
            EventKind::Edge {
                component,
                input: None,
            } => write!(f, "Edge({})", component),
            EventKind::OutEdge {
                component,
                output_port,
                state,
            } => write!(f, "OutEdge({}.out{} = {})", component, output_port, state),
            EventKind::Action(_) => write!(f, "Action"),
        }
    }
}

// ── Event ─────────────────────────────────────────────────────────────

/// A single simulation event.
#[derive(Debug)]
pub struct Event {
    when: SimTime,
    group: Group,
    order: Option<EventOrder>,
    kind: EventKind,
}

impl Event {
    /// A plain event that does nothing when processed.
    pub fn marker(when: SimTime, tag: i64) -> Self {
        Event::new(when, Group::Tag(tag), EventKind::Marker)
    }

    /// An input edge setting `input_port` of `component` to `state`.
    pub fn edge(when: SimTime, component: ComponentId, input_port: usize, state: Level) -> Self {
        Event::new(
            when,
            Group::Edge(component),
            EventKind::Edge {
                component,
                input: Some((input_port, state)),
            },
        )
    }

    /// An edge without a port, only forcing a clock phase on `component`.
    pub fn clock_only(when: SimTime, component: ComponentId) -> Self {
        Event::new(
            when,
            Group::Edge(component),
            EventKind::Edge {
                component,
                input: None,
            },
        )
    }

    /// An output commit of `output_port` on `component`.
    pub fn out_edge(when: SimTime, component: ComponentId, output_port: usize, state: Level) -> Self {
        Event::new(
            when,
            Group::Commit(component),
            EventKind::OutEdge {
                component,
                output_port,
                state,
            },
        )
    }

    /// A callback fired at `when`, after every other event of that time.
    pub fn action<F>(when: SimTime, callback: F) -> Self
    where
        F: FnOnce(SimTime) -> Vec<Event> + 'static,
    {
        Event::new(when, Group::Action, EventKind::Action(Box::new(callback)))
    }

    fn new(when: SimTime, group: Group, kind: EventKind) -> Self {
        Event {
            when,
            group,
            order: None,
            kind,
        }
    }

    #[inline]
    pub fn when(&self) -> SimTime {
        self.when
    }

    #[inline]
    pub fn group(&self) -> Group {
        self.group
    }

    /// Enqueue order, `None` until the event has been scheduled.
    #[inline]
    pub fn order(&self) -> Option<EventOrder> {
        self.order
    }

    #[inline]
    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    pub(crate) fn set_order(&mut self, order: EventOrder) {
        self.order = Some(order);
    }

    /// Whether `other` belongs to the same `(when, group)` batch.
    #[inline]
    pub fn same_batch(&self, other: &Event) -> bool {
        self.when == other.when && self.group == other.group
    }

    /// Consume the event and return its follow-ups.
    ///
    /// `last_in_group` is `true` for exactly one event of every
    /// `(when, group)` batch, the last one processed.
    pub fn process(self, last_in_group: bool, circuit: &mut Circuit) -> Vec<Event> {
        let when = self.when;
        match self.kind {
            EventKind::Marker => Vec::new(),

            EventKind::Edge { component, input } => {
                let Some(target) = circuit.component_mut(component) else {
                    trace!(%component, "edge for removed component dropped");
                    return Vec::new();
                };
                if let Some((port, state)) = input {
                    target.notify_input_edge(port, state);
                }
                if !last_in_group {
                    // More edges for this component are still pending.
                    return Vec::new();
                }
                target.clock(when)
            }

            EventKind::OutEdge {
                component,
                output_port,
                state,
            } => {
                let Some(source) = circuit.component_mut(component) else {
                    trace!(%component, "output commit for removed component dropped");
                    return Vec::new();
                };
                let mut events = Vec::new();
                if let Some(wire) = source.commit_output_edge(output_port, state) {
                    events.push(Event::edge(
                        when.after(wire.delay),
                        wire.component,
                        wire.input_port,
                        state,
                    ));
                }
                if last_in_group {
                    // One trailing clock phase reports inputs and outputs
                    // of this timestamp together.
                    events.push(Event::clock_only(when, component));
                }
                events
            }

            EventKind::Action(callback) => callback(when),
        }
    }

    fn key(&self) -> (SimTime, Group, Option<EventOrder>) {
        (self.when, self.group, self.order)
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Event {}

/// Ordering: smallest `(when, group, order)` first.
///
/// Rust's `BinaryHeap` is a *max*-heap, so the natural ordering is
/// **reversed** here to turn it into a min-heap.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn c(id: u64) -> ComponentId {
        ComponentId::new(id)
    }

    fn scheduled(mut event: Event, order: u64) -> Event {
        event.set_order(EventOrder::new(order));
        event
    }

    #[test]
    fn test_order_gen_monotonic() {
        let mut gen = EventOrderGen::new();
        let a = gen.next_order();
        let b = gen.next_order();
        assert!(a < b);
        assert_eq!(gen.issued(), 2);
    }

    #[test]
    fn test_unscheduled_event_has_no_order() {
        assert_eq!(Event::marker(SimTime::ZERO, 0).order(), None);
    }

    #[test]
    fn test_group_ordering() {
        assert!(Group::Commit(c(9)) < Group::Tag(i64::MIN));
        assert!(Group::Tag(i64::MAX) < Group::Edge(c(1)));
        assert!(Group::Edge(c(u64::MAX)) < Group::Action);
        assert!(Group::Commit(c(1)) < Group::Commit(c(2)));
        assert!(Group::Edge(c(1)) < Group::Edge(c(2)));
    }

    #[test]
    fn test_event_ordering_by_time_then_group_then_order() {
        let e0 = scheduled(Event::marker(SimTime::new(0), 0), 0);
        let e1 = scheduled(Event::marker(SimTime::new(1), -1), 5);
        let e2 = scheduled(Event::marker(SimTime::new(1), 2), 1);
        let e3 = scheduled(Event::marker(SimTime::new(1), 2), 3);
        // Reversed ordering: earlier events compare greater.
        assert!(e0 > e1);
        assert!(e1 > e2);
        assert!(e2 > e3);
        assert!(e0 > e3);
        assert_eq!(e0.cmp(&e0), Ordering::Equal);
    }

    #[test]
    fn test_out_edge_sorts_before_unrelated_edge() {
        let commit = scheduled(Event::out_edge(SimTime::new(4), c(7), 0, Level::High), 9);
        let edge = scheduled(Event::edge(SimTime::new(4), c(1), 0, Level::Low), 1);
        assert!(commit > edge);
    }

    #[test]
    fn test_action_sorts_last() {
        let action = scheduled(Event::action(SimTime::new(4), |_| Vec::new()), 0);
        let edge = scheduled(Event::edge(SimTime::new(4), c(u64::MAX), 0, Level::Low), 1);
        assert!(edge > action);
    }

    #[test]
    fn test_marker_has_no_followups() {
        let mut circuit = Circuit::new();
        assert!(Event::marker(SimTime::ZERO, 0).process(false, &mut circuit).is_empty());
        assert!(Event::marker(SimTime::ZERO, 0).process(true, &mut circuit).is_empty());
    }

    #[test]
    fn test_action_fires_with_its_time() {
        let fired = Rc::new(Cell::new(None));
        let seen = Rc::clone(&fired);
        let mut circuit = Circuit::new();
        let event = Event::action(SimTime::new(12), move |when| {
            seen.set(Some(when));
            vec![Event::marker(when.after(1), 0)]
        });
        let followups = event.process(true, &mut circuit);
        assert_eq!(fired.get(), Some(SimTime::new(12)));
        assert_eq!(followups.len(), 1);
        assert_eq!(followups[0].when(), SimTime::new(13));
    }

    #[test]
    fn test_edge_for_missing_component_is_noop() {
        let mut circuit = Circuit::new();
        let event = Event::edge(SimTime::ZERO, c(42), 0, Level::High);
        assert!(event.process(true, &mut circuit).is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Event::edge(SimTime::ZERO, c(3), 1, Level::High).kind().to_string(),
            "Edge(C3.in1 = 1)"
        );
        assert_eq!(
            Event::out_edge(SimTime::ZERO, c(3), 0, Level::Low).kind().to_string(),
            "OutEdge(C3.out0 = 0)"
        );
    }
}
