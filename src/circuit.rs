//! `Circuit` — owns every component and keeps both ends of a wire in sync.
//!
//! Components refer to their peers by [`ComponentId`] only. Anything that
//! touches two components at once (wiring, unwiring, port resizes,
//! removal) goes through the circuit so the two halves never disagree.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::component::{
    Component, ComponentId, ComponentRecord, Level, OutboundConnection, Properties, Severed,
};
use crate::error::{SimError, SimResult};

/// The set of live components, keyed by id.
#[derive(Debug, Default)]
pub struct Circuit {
    components: BTreeMap<ComponentId, Component>,
}

impl Circuit {
    pub fn new() -> Self {
        Circuit {
            components: BTreeMap::new(),
        }
    }

    /// Add a component. Its id must not be in use.
    pub fn add(&mut self, component: Component) -> SimResult<()> {
        let id = component.id();
        if self.components.contains_key(&id) {
            return Err(SimError::ComponentAlreadyRegistered(id));
        }
        info!(component = %id, kind = component.kind(), "component added");
        self.components.insert(id, component);
        Ok(())
    }

    pub fn component(&self, id: ComponentId) -> Option<&Component> {
        self.components.get(&id)
    }

    pub fn component_mut(&mut self, id: ComponentId) -> Option<&mut Component> {
        self.components.get_mut(&id)
    }

    fn require(&self, id: ComponentId) -> SimResult<&Component> {
        self.components.get(&id).ok_or(SimError::ComponentNotFound(id))
    }

    fn require_mut(&mut self, id: ComponentId) -> SimResult<&mut Component> {
        self.components.get_mut(&id).ok_or(SimError::ComponentNotFound(id))
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.components.contains_key(&id)
    }

    /// All component ids in ascending order.
    pub fn component_ids(&self) -> Vec<ComponentId> {
        self.components.keys().copied().collect()
    }

    /// The lowest id above every id in use.
    pub fn next_id(&self) -> ComponentId {
        let next = self
            .components
            .keys()
            .next_back()
            .map_or(0, |id| id.raw() + 1);
        ComponentId::new(next)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    // ── Wiring ────────────────────────────────────────────────────

    /// Wire `source.output_port` to `sink.input_port` with `delay` ticks.
    ///
    /// The sink's input takes the source's current output level at once.
    /// Returns `Ok(false)` when either port is out of range or already
    /// wired; nothing changes in that case.
    pub fn connect(
        &mut self,
        source: ComponentId,
        output_port: usize,
        sink: ComponentId,
        input_port: usize,
        delay: u64,
    ) -> SimResult<bool> {
        self.require(sink)?;
        let src = self.require(source)?;
        if output_port >= src.outputs() || src.output_connection(output_port).is_some() {
            debug!(%source, output_port, "connect rejected by source");
            return Ok(false);
        }
        let state = src.output_state(output_port).unwrap_or_default();

        if !self.require_mut(sink)?.connected(source, output_port, input_port, state) {
            debug!(%sink, input_port, "connect rejected by sink");
            return Ok(false);
        }
        let wire = OutboundConnection {
            component: sink,
            input_port,
            delay,
        };
        if !self.require_mut(source)?.bind_output(output_port, wire) {
            // Only reachable if the source changed underneath us; undo the sink half.
            self.require_mut(sink)?.disconnected(input_port);
            return Ok(false);
        }
        debug!(%source, output_port, %sink, input_port, delay, "connected");
        Ok(true)
    }

    /// Remove the wire leaving `source.output_port`.
    ///
    /// Returns `Ok(false)` if the port had no wire.
    pub fn disconnect(&mut self, source: ComponentId, output_port: usize) -> SimResult<bool> {
        let Some(wire) = self.require_mut(source)?.unbind_output(output_port) else {
            return Ok(false);
        };
        if let Some(sink) = self.components.get_mut(&wire.component) {
            sink.disconnected(wire.input_port);
        }
        debug!(%source, output_port, sink = %wire.component, "disconnected");
        Ok(true)
    }

    /// Remove the wire arriving at `sink.input_port`.
    pub fn disconnect_input(&mut self, sink: ComponentId, input_port: usize) -> SimResult<bool> {
        match self.require(sink)?.input_connection(input_port) {
            Some(from) => self.disconnect(from.component, from.output_port),
            None => Ok(false),
        }
    }

    // ── Updates ───────────────────────────────────────────────────

    /// Deliver an input level directly, outside the scheduler.
    ///
    /// The component is left dirty; its next clock phase evaluates it.
    pub fn notify_input_edge(&mut self, id: ComponentId, port: usize, state: Level) -> SimResult<bool> {
        Ok(self.require_mut(id)?.notify_input_edge(port, state))
    }

    /// Apply a property batch to one component, best effort.
    ///
    /// Every field that can be applied is; the rest are returned together
    /// as [`SimError::PropertyBatch`]. Wires on ports removed by a resize
    /// are cut on the peer side too.
    pub fn set_properties(&mut self, id: ComponentId, properties: &Properties) -> SimResult<()> {
        let (errors, severed) = self.require_mut(id)?.apply_properties(properties);
        for cut in severed {
            match cut {
                Severed::Inbound(from) => {
                    if let Some(source) = self.components.get_mut(&from.component) {
                        source.unbind_output(from.output_port);
                    }
                }
                Severed::Outbound(to) => {
                    if let Some(sink) = self.components.get_mut(&to.component) {
                        sink.disconnected(to.input_port);
                    }
                }
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(SimError::PropertyBatch(errors))
        }
    }

    /// Unwire every port of `id` and take it out of the circuit.
    ///
    /// The removal is propagated as a record with a null kind. Queued
    /// events that still name the component become no-ops.
    pub fn remove(&mut self, id: ComponentId) -> SimResult<Component> {
        let component = self.require(id)?;
        let inbound: Vec<_> = (0..component.inputs())
            .filter_map(|port| component.input_connection(port))
            .collect();
        let outputs = component.outputs();

        for from in inbound {
            self.disconnect(from.component, from.output_port)?;
        }
        for port in 0..outputs {
            self.disconnect(id, port)?;
        }

        let mut component = self
            .components
            .remove(&id)
            .ok_or(SimError::ComponentNotFound(id))?;
        component.retire();
        info!(component = %id, "component removed");
        Ok(component)
    }

    /// A full record of every component, in id order.
    pub fn snapshot(&self) -> Vec<ComponentRecord> {
        self.components.values().map(Component::snapshot).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::component::{builtin, InboundConnection, RecordLog};

    fn c(id: u64) -> ComponentId {
        ComponentId::new(id)
    }

    fn circuit_with(kinds: &[crate::component::ComponentTemplate]) -> (Circuit, Rc<RecordLog>) {
        let log = Rc::new(RecordLog::new());
        let mut circuit = Circuit::new();
        for (i, template) in kinds.iter().enumerate() {
            circuit
                .add(Component::new(c(i as u64), template, log.clone()))
                .unwrap();
        }
        log.clear();
        (circuit, log)
    }

    #[test]
    fn test_add_rejects_duplicate_id() {
        let (mut circuit, _) = circuit_with(&[builtin::and()]);
        let dup = Component::new(c(0), &builtin::or(), Rc::new(crate::component::Detached));
        assert_eq!(circuit.add(dup).unwrap_err(), SimError::ComponentAlreadyRegistered(c(0)));
        assert_eq!(circuit.next_id(), c(1));
    }

    #[test]
    fn test_connect_updates_both_sides() {
        let (mut circuit, _) = circuit_with(&[builtin::not(), builtin::buffer()]);
        assert!(circuit.connect(c(0), 0, c(1), 0, 3).unwrap());

        let wire = circuit.component(c(0)).unwrap().output_connection(0);
        assert_eq!(
            wire,
            Some(OutboundConnection {
                component: c(1),
                input_port: 0,
                delay: 3
            })
        );
        let back = circuit.component(c(1)).unwrap().input_connection(0);
        assert_eq!(
            back,
            Some(InboundConnection {
                component: c(0),
                output_port: 0
            })
        );
        assert!(circuit.component(c(1)).unwrap().is_dirty());
    }

    #[test]
    fn test_connect_rejects_occupied_and_out_of_range() {
        let (mut circuit, _) = circuit_with(&[builtin::not(), builtin::and(), builtin::buffer()]);
        assert!(circuit.connect(c(0), 0, c(1), 0, 1).unwrap());
        // Output already wired.
        assert!(!circuit.connect(c(0), 0, c(1), 1, 1).unwrap());
        // Input already wired.
        assert!(!circuit.connect(c(2), 0, c(1), 0, 1).unwrap());
        // No such ports.
        assert!(!circuit.connect(c(2), 1, c(1), 1, 1).unwrap());
        assert!(!circuit.connect(c(2), 0, c(1), 5, 1).unwrap());
        assert!(circuit.component(c(2)).unwrap().output_connection(0).is_none());
        assert!(circuit.connect(c(5), 0, c(1), 1, 1).is_err());
    }

    #[test]
    fn test_self_loop() {
        let (mut circuit, _) = circuit_with(&[builtin::not()]);
        assert!(circuit.connect(c(0), 0, c(0), 0, 1).unwrap());
        assert!(circuit.disconnect(c(0), 0).unwrap());
        assert!(circuit.component(c(0)).unwrap().input_connection(0).is_none());
    }

    #[test]
    fn test_disconnect_clears_both_sides() {
        let (mut circuit, _) = circuit_with(&[builtin::not(), builtin::buffer()]);
        circuit.connect(c(0), 0, c(1), 0, 1).unwrap();
        assert!(circuit.disconnect_input(c(1), 0).unwrap());
        assert!(circuit.component(c(0)).unwrap().output_connection(0).is_none());
        assert!(circuit.component(c(1)).unwrap().input_connection(0).is_none());
        assert!(!circuit.disconnect(c(0), 0).unwrap());
    }

    #[test]
    fn test_remove_unwires_and_reports() {
        let (mut circuit, log) = circuit_with(&[builtin::not(), builtin::buffer(), builtin::not()]);
        circuit.connect(c(0), 0, c(1), 0, 1).unwrap();
        circuit.connect(c(1), 0, c(2), 0, 1).unwrap();
        log.clear();

        circuit.remove(c(1)).unwrap();
        assert!(!circuit.contains(c(1)));
        assert!(circuit.component(c(0)).unwrap().output_connection(0).is_none());
        assert!(circuit.component(c(2)).unwrap().input_connection(0).is_none());
        assert!(log.records_for(c(1)).iter().any(ComponentRecord::is_removal));
        assert_eq!(circuit.remove(c(1)).unwrap_err(), SimError::ComponentNotFound(c(1)));
    }

    #[test]
    fn test_snapshot_in_id_order() {
        let (circuit, _) = circuit_with(&[builtin::and(), builtin::or()]);
        let ids: Vec<_> = circuit.snapshot().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![c(0), c(1)]);
    }
}
