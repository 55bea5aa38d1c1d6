//! `Component` — a port-based logic node with batched evaluation.
//!
//! Input changes arrive in two phases. Every edge first writes its level
//! into the input port and marks the component dirty
//! ([`Component::notify_input_edge`]); once all edges of one timestamp
//! have been delivered, a single [`Component::clock`] call evaluates the
//! logic function and emits output commits for the outputs that changed.

use std::rc::Rc;

use tracing::warn;

use crate::error::{SimError, SimResult};
use crate::event::Event;
use crate::time::SimTime;

use super::connection::{InboundConnection, OutboundConnection};
use super::id::ComponentId;
use super::level::Level;
use super::props::{ComponentTemplate, LogicFn, PortBounds, Properties, PropertyValue};
use super::record::{ComponentRecord, Detached, Propagate};

/// A connection cut because the port it was attached to went away.
///
/// The component only clears its own side; whoever owns both ends must
/// clear the peer's side (see [`Circuit`](crate::circuit::Circuit)).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Severed {
    Inbound(InboundConnection),
    Outbound(OutboundConnection),
}

/// A logic component instance.
pub struct Component {
    id: ComponentId,
    kind: String,
    logic: LogicFn,
    delay: u64,
    input_bounds: PortBounds,
    output_bounds: PortBounds,
    input_states: Vec<Level>,
    output_states: Vec<Level>,
    /// Levels last handed out as output commits.
    last_logic_outputs: Vec<Level>,
    input_connections: Vec<Option<InboundConnection>>,
    output_connections: Vec<Option<OutboundConnection>>,
    properties: Properties,
    inputs_dirty: bool,
    outputs_dirty: bool,
    parent: Rc<dyn Propagate>,
}

impl Component {
    /// Instantiate `template` with its defaults and no overrides.
    ///
    /// The full snapshot is propagated to `parent` once.
    pub fn new(id: ComponentId, template: &ComponentTemplate, parent: Rc<dyn Propagate>) -> Self {
        let component = Self::from_template(id, template, parent);
        component.propagate_self();
        component
    }

    fn from_template(id: ComponentId, template: &ComponentTemplate, parent: Rc<dyn Propagate>) -> Self {
        let inputs = template.inputs();
        let outputs = template.outputs();
        Component {
            id,
            kind: template.kind().to_owned(),
            logic: Rc::clone(template.logic()),
            delay: template.delay(),
            input_bounds: template.input_bounds(),
            output_bounds: template.output_bounds(),
            input_states: vec![Level::Unset; inputs],
            output_states: vec![Level::Unset; outputs],
            last_logic_outputs: vec![Level::Unset; outputs],
            input_connections: vec![None; inputs],
            output_connections: vec![None; outputs],
            properties: template.properties().clone(),
            inputs_dirty: false,
            outputs_dirty: false,
            parent,
        }
    }

    // ── Accessors ─────────────────────────────────────────────────

    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Template kind this component was built from.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn delay(&self) -> u64 {
        self.delay
    }

    pub fn inputs(&self) -> usize {
        self.input_states.len()
    }

    pub fn outputs(&self) -> usize {
        self.output_states.len()
    }

    pub fn input_bounds(&self) -> PortBounds {
        self.input_bounds
    }

    pub fn output_bounds(&self) -> PortBounds {
        self.output_bounds
    }

    pub fn input_state(&self, port: usize) -> Option<Level> {
        self.input_states.get(port).copied()
    }

    /// Committed level of an output port.
    pub fn output_state(&self, port: usize) -> Option<Level> {
        self.output_states.get(port).copied()
    }

    pub fn input_states(&self) -> &[Level] {
        &self.input_states
    }

    pub fn output_states(&self) -> &[Level] {
        &self.output_states
    }

    pub fn input_connection(&self, port: usize) -> Option<InboundConnection> {
        self.input_connections.get(port).copied().flatten()
    }

    pub fn output_connection(&self, port: usize) -> Option<OutboundConnection> {
        self.output_connections.get(port).copied().flatten()
    }

    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// `true` between an edge arriving and the next clock phase.
    pub fn is_dirty(&self) -> bool {
        self.inputs_dirty || self.outputs_dirty
    }

    // ── Edge / clock protocol ─────────────────────────────────────

    /// Record a new level on an input port and mark the component dirty.
    ///
    /// The logic function is not evaluated here; that happens in the next
    /// [`clock`](Self::clock). Writing the level a port already has still
    /// marks the component dirty. Edges on ports outside the current
    /// input range are ignored and reported as `false`.
    pub fn notify_input_edge(&mut self, port: usize, state: Level) -> bool {
        let Some(slot) = self.input_states.get_mut(port) else {
            warn!(component = %self.id, port, "edge on nonexistent input ignored");
            return false;
        };
        *slot = state;
        self.inputs_dirty = true;
        true
    }

    /// Run the clock phase for all edges delivered at `when`.
    ///
    /// Evaluates the logic function at most once and returns one output
    /// commit, `delay` ticks later, for every output whose level differs
    /// from the last one handed out. Clean components return nothing.
    pub fn clock(&mut self, when: SimTime) -> Vec<Event> {
        if !self.is_dirty() {
            return Vec::new();
        }

        let mut events = Vec::new();
        if self.inputs_dirty {
            let outputs = self.outputs();
            let future = (self.logic)(&self.input_states, outputs);
            for port in 0..outputs {
                let next = future.get(port).copied().unwrap_or_default();
                if next != self.last_logic_outputs[port] {
                    events.push(Event::out_edge(when.after(self.delay), self.id, port, next));
                    self.last_logic_outputs[port] = next;
                }
            }
        }

        let mut record = ComponentRecord::new(self.id);
        record.input_states = Some(self.input_states.clone());
        record.output_states = Some(self.output_states.clone());
        self.parent.propagate(record);

        self.inputs_dirty = false;
        self.outputs_dirty = false;
        events
    }

    /// Make an output commit take effect.
    ///
    /// Returns the wire attached to the port, if any, so the caller can
    /// carry the level to the other end.
    pub fn commit_output_edge(&mut self, port: usize, state: Level) -> Option<OutboundConnection> {
        let slot = self.output_states.get_mut(port)?;
        *slot = state;
        self.outputs_dirty = true;
        self.output_connection(port)
    }

    // ── Connections ───────────────────────────────────────────────

    /// Accept a wire from `source`'s `output_port` onto `input_port`.
    ///
    /// This is the sink's half of a connect. The port is seeded with the
    /// source's current level right away. Returns `false` if the port does
    /// not exist or already has a wire.
    pub fn connected(
        &mut self,
        source: ComponentId,
        output_port: usize,
        input_port: usize,
        state: Level,
    ) -> bool {
        if !matches!(self.input_connections.get(input_port), Some(None)) {
            return false;
        }
        self.input_connections[input_port] = Some(InboundConnection {
            component: source,
            output_port,
        });
        self.notify_input_edge(input_port, state);
        self.report_input_connections();
        true
    }

    /// Drop the wire arriving at `input_port`.
    ///
    /// This is the sink's half of a disconnect. Returns `false` if there
    /// was nothing connected.
    pub fn disconnected(&mut self, input_port: usize) -> bool {
        let Some(slot) = self.input_connections.get_mut(input_port) else {
            return false;
        };
        if slot.take().is_none() {
            return false;
        }
        self.report_input_connections();
        true
    }

    /// Attach the source's half of a wire. The port must be free.
    pub(crate) fn bind_output(&mut self, port: usize, wire: OutboundConnection) -> bool {
        let Some(slot) = self.output_connections.get_mut(port) else {
            return false;
        };
        if slot.is_some() {
            return false;
        }
        *slot = Some(wire);
        self.report_output_connections();
        true
    }

    /// Detach the source's half of a wire.
    pub(crate) fn unbind_output(&mut self, port: usize) -> Option<OutboundConnection> {
        let wire = self.output_connections.get_mut(port)?.take()?;
        self.report_output_connections();
        Some(wire)
    }

    fn report_input_connections(&self) {
        let mut record = ComponentRecord::new(self.id);
        record.input_connections = Some(self.input_connections.clone());
        self.parent.propagate(record);
    }

    fn report_output_connections(&self) {
        let mut record = ComponentRecord::new(self.id);
        record.output_connections = Some(self.output_connections.clone());
        self.parent.propagate(record);
    }

    /// Report that this component is gone. Its ports must be unwired.
    pub(crate) fn retire(&mut self) {
        self.inputs_dirty = false;
        self.outputs_dirty = false;
        let mut record = ComponentRecord::new(self.id);
        record.kind = Some(None);
        self.parent.propagate(record);
    }

    // ── Snapshots ─────────────────────────────────────────────────

    /// The complete current state as a record.
    pub fn snapshot(&self) -> ComponentRecord {
        ComponentRecord {
            id: self.id,
            kind: Some(Some(self.kind.clone())),
            inputs: Some(self.inputs()),
            outputs: Some(self.outputs()),
            input_bounds: Some(self.input_bounds),
            output_bounds: Some(self.output_bounds),
            delay: Some(self.delay),
            input_states: Some(self.input_states.clone()),
            output_states: Some(self.output_states.clone()),
            input_connections: Some(self.input_connections.clone()),
            output_connections: Some(self.output_connections.clone()),
            properties: self.properties.clone(),
        }
    }

    /// Propagate the complete current state to the parent.
    pub fn propagate_self(&self) {
        self.parent.propagate(self.snapshot());
    }

    // ── Properties ────────────────────────────────────────────────

    /// Apply a property batch, best effort.
    ///
    /// Port bounds are applied before port counts so one batch can widen
    /// the range and grow into it. Returns the errors of every field that
    /// failed, and the wires cut by removed ports.
    pub(crate) fn apply_properties(&mut self, properties: &Properties) -> (Vec<SimError>, Vec<Severed>) {
        let mut errors = Vec::new();
        let mut severed = Vec::new();
        let mut update = ComponentRecord::new(self.id);
        let mut changed = false;

        let (bounds, rest): (Vec<_>, Vec<_>) = properties
            .iter()
            .partition(|(key, _)| key.ends_with("_min") || key.ends_with("_max"));

        for (key, value) in bounds.into_iter().chain(rest) {
            let applied = match key.as_str() {
                "id" | "type" => Err(SimError::ReadOnlyProperty(key.clone())),
                "delay" => value.as_count(key).map(|delay| {
                    self.delay = delay;
                    update.delay = Some(delay);
                    changed = true;
                }),
                "inputs" => value
                    .as_count(key)
                    .map(|count| self.resize_inputs(count as usize, &mut severed)),
                "outputs" => value
                    .as_count(key)
                    .map(|count| self.resize_outputs(count as usize, &mut severed)),
                "inputs_min" | "inputs_max" => self.set_bound(key, value).map(|()| {
                    update.input_bounds = Some(self.input_bounds);
                    changed = true;
                }),
                "outputs_min" | "outputs_max" => self.set_bound(key, value).map(|()| {
                    update.output_bounds = Some(self.output_bounds);
                    changed = true;
                }),
                _ => {
                    self.properties.insert(key.clone(), value.clone());
                    update.properties.insert(key.clone(), value.clone());
                    changed = true;
                    Ok(())
                }
            };
            if let Err(e) = applied {
                errors.push(e);
            }
        }

        if changed {
            self.parent.propagate(update);
        }
        (errors, severed)
    }

    fn set_bound(&mut self, key: &str, value: &PropertyValue) -> SimResult<()> {
        let limit = value.as_count(key)? as usize;
        let (bounds, is_min) = match key {
            "inputs_min" => (&mut self.input_bounds, true),
            "inputs_max" => (&mut self.input_bounds, false),
            "outputs_min" => (&mut self.output_bounds, true),
            _ => (&mut self.output_bounds, false),
        };
        if is_min && limit > bounds.max {
            return Err(SimError::invalid(key, "cannot set minimum above maximum"));
        }
        if !is_min && limit < bounds.min {
            return Err(SimError::invalid(key, "cannot set maximum below minimum"));
        }
        if is_min {
            bounds.min = limit;
        } else {
            bounds.max = limit;
        }
        Ok(())
    }

    /// Change the number of inputs, clamped to the input bounds.
    fn resize_inputs(&mut self, requested: usize, severed: &mut Vec<Severed>) {
        let count = self.input_bounds.clamp(requested);
        if count == self.inputs() {
            return;
        }
        while self.input_connections.len() > count {
            if let Some(Some(wire)) = self.input_connections.pop() {
                severed.push(Severed::Inbound(wire));
            }
        }
        self.input_connections.resize(count, None);
        self.input_states.resize(count, Level::Unset);
        self.inputs_dirty = true;

        let mut record = ComponentRecord::new(self.id);
        record.inputs = Some(count);
        record.input_states = Some(self.input_states.clone());
        record.input_connections = Some(self.input_connections.clone());
        self.parent.propagate(record);
    }

    /// Change the number of outputs, clamped to the output bounds.
    fn resize_outputs(&mut self, requested: usize, severed: &mut Vec<Severed>) {
        let count = self.output_bounds.clamp(requested);
        if count == self.outputs() {
            return;
        }
        while self.output_connections.len() > count {
            if let Some(Some(wire)) = self.output_connections.pop() {
                severed.push(Severed::Outbound(wire));
            }
        }
        self.output_connections.resize(count, None);
        self.output_states.resize(count, Level::Unset);
        self.last_logic_outputs.resize(count, Level::Unset);

        let mut record = ComponentRecord::new(self.id);
        record.outputs = Some(count);
        record.output_states = Some(self.output_states.clone());
        record.output_connections = Some(self.output_connections.clone());
        self.parent.propagate(record);
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("delay", &self.delay)
            .field("input_states", &self.input_states)
            .field("output_states", &self.output_states)
            .field("input_connections", &self.input_connections)
            .field("output_connections", &self.output_connections)
            .field("dirty", &self.is_dirty())
            .finish_non_exhaustive()
    }
}

// ── ComponentBuilder ──────────────────────────────────────────────────

/// Builds a [`Component`] from a template plus per-instance overrides.
///
/// Template defaults are copied once; overrides are validated and
/// applied on top before the component is handed out. The finished
/// component propagates its full snapshot to the parent exactly once.
///
/// ```rust
/// use std::rc::Rc;
/// use gatewave::component::{builtin, ComponentBuilder, ComponentId, RecordLog};
///
/// let log = Rc::new(RecordLog::new());
/// let or = ComponentBuilder::new(ComponentId::new(1), &builtin::or())
///     .parent(log.clone())
///     .property("inputs", 3)
///     .property("label", "enable")
///     .build()
///     .unwrap();
///
/// assert_eq!(or.inputs(), 3);
/// assert_eq!(log.len(), 1);
/// ```
pub struct ComponentBuilder<'t> {
    id: ComponentId,
    template: &'t ComponentTemplate,
    parent: Rc<dyn Propagate>,
    overrides: Properties,
}

impl<'t> ComponentBuilder<'t> {
    pub fn new(id: ComponentId, template: &'t ComponentTemplate) -> Self {
        ComponentBuilder {
            id,
            template,
            parent: Rc::new(Detached),
            overrides: Properties::new(),
        }
    }

    /// Where the component reports its state changes.
    pub fn parent(mut self, parent: Rc<dyn Propagate>) -> Self {
        self.parent = parent;
        self
    }

    /// Override one property.
    pub fn property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }

    /// Override several properties.
    pub fn properties(mut self, overrides: Properties) -> Self {
        self.overrides.extend(overrides);
        self
    }

    /// Validate the overrides and build the component.
    ///
    /// Fails with [`SimError::PropertyBatch`] listing every rejected
    /// override; nothing is propagated in that case.
    pub fn build(self) -> SimResult<Component> {
        let mut component = Component::from_template(self.id, self.template, Rc::new(Detached));
        let (errors, _) = component.apply_properties(&self.overrides);
        if !errors.is_empty() {
            return Err(SimError::PropertyBatch(errors));
        }
        // Fresh ports may have been added above; start clean.
        component.inputs_dirty = false;
        component.parent = self.parent;
        component.propagate_self();
        Ok(component)
    }
}
