//! State snapshots reported by components to their parent.

use std::cell::RefCell;
use std::collections::BTreeMap;

use super::connection::{InboundConnection, OutboundConnection};
use super::id::ComponentId;
use super::level::Level;
use super::props::{PortBounds, PropertyValue};

/// A plain, serializable snapshot of (part of) a component's state.
///
/// Only the fields that changed are filled in; everything else stays
/// `None` and is left out of the serialized form. Peers are referenced by
/// [`ComponentId`] only, so a record never borrows from the circuit.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct ComponentRecord {
    pub id: ComponentId,

    /// Template kind. `Some(None)` reports that the component was removed.
    #[cfg_attr(
        feature = "serialize",
        serde(rename = "type", skip_serializing_if = "Option::is_none")
    )]
    pub kind: Option<Option<String>>,

    #[cfg_attr(feature = "serialize", serde(skip_serializing_if = "Option::is_none"))]
    pub inputs: Option<usize>,

    #[cfg_attr(feature = "serialize", serde(skip_serializing_if = "Option::is_none"))]
    pub outputs: Option<usize>,

    /// Range `inputs` may be adjusted within.
    #[cfg_attr(feature = "serialize", serde(skip_serializing_if = "Option::is_none"))]
    pub input_bounds: Option<PortBounds>,

    #[cfg_attr(feature = "serialize", serde(skip_serializing_if = "Option::is_none"))]
    pub output_bounds: Option<PortBounds>,

    #[cfg_attr(feature = "serialize", serde(skip_serializing_if = "Option::is_none"))]
    pub delay: Option<u64>,

    #[cfg_attr(feature = "serialize", serde(skip_serializing_if = "Option::is_none"))]
    pub input_states: Option<Vec<Level>>,

    #[cfg_attr(feature = "serialize", serde(skip_serializing_if = "Option::is_none"))]
    pub output_states: Option<Vec<Level>>,

    #[cfg_attr(feature = "serialize", serde(skip_serializing_if = "Option::is_none"))]
    pub input_connections: Option<Vec<Option<InboundConnection>>>,

    #[cfg_attr(feature = "serialize", serde(skip_serializing_if = "Option::is_none"))]
    pub output_connections: Option<Vec<Option<OutboundConnection>>>,

    /// Free-form properties set on the component.
    #[cfg_attr(feature = "serialize", serde(skip_serializing_if = "BTreeMap::is_empty"))]
    pub properties: BTreeMap<String, PropertyValue>,
}

impl ComponentRecord {
    /// An empty record for `id`.
    pub fn new(id: ComponentId) -> Self {
        ComponentRecord {
            id,
            kind: None,
            inputs: None,
            outputs: None,
            input_bounds: None,
            output_bounds: None,
            delay: None,
            input_states: None,
            output_states: None,
            input_connections: None,
            output_connections: None,
            properties: BTreeMap::new(),
        }
    }

    /// Whether this record announces the removal of its component.
    pub fn is_removal(&self) -> bool {
        matches!(self.kind, Some(None))
    }

    /// Serialize this record as a JSON object.
    #[cfg(feature = "serialize")]
    pub fn to_json(&self) -> crate::error::SimResult<String> {
        serde_json::to_string(self)
            .map_err(|e| crate::error::SimError::Serialization(e.to_string()))
    }
}

// ── Propagate ─────────────────────────────────────────────────────────

/// The parent handle a component reports its state changes to.
///
/// Called on every dirty clock phase and whenever ports, connections or
/// properties change through an explicit operation.
pub trait Propagate {
    fn propagate(&self, record: ComponentRecord);
}

/// A parent backed by a closure.
impl<F> Propagate for F
where
    F: Fn(ComponentRecord),
{
    fn propagate(&self, record: ComponentRecord) {
        (self)(record)
    }
}

/// A parent that discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct Detached;

impl Propagate for Detached {
    fn propagate(&self, _record: ComponentRecord) {}
}

/// A parent that keeps every record it receives, in order.
///
/// Useful for tests and for hosts that forward updates in batches.
#[derive(Debug, Default)]
pub struct RecordLog {
    records: RefCell<Vec<ComponentRecord>>,
}

impl RecordLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records received so far.
    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    /// Copy of every record received so far.
    pub fn records(&self) -> Vec<ComponentRecord> {
        self.records.borrow().clone()
    }

    /// Records received for one component.
    pub fn records_for(&self, id: ComponentId) -> Vec<ComponentRecord> {
        self.records
            .borrow()
            .iter()
            .filter(|r| r.id == id)
            .cloned()
            .collect()
    }

    /// Remove and return everything received so far.
    pub fn take(&self) -> Vec<ComponentRecord> {
        std::mem::take(&mut *self.records.borrow_mut())
    }

    /// Drop everything received so far.
    pub fn clear(&self) {
        self.records.borrow_mut().clear();
    }
}

impl Propagate for RecordLog {
    fn propagate(&self, record: ComponentRecord) {
        self.records.borrow_mut().push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_log_take_empties() {
        let log = RecordLog::new();
        log.propagate(ComponentRecord::new(ComponentId::new(1)));
        log.propagate(ComponentRecord::new(ComponentId::new(2)));
        assert_eq!(log.len(), 2);
        assert_eq!(log.records_for(ComponentId::new(2)).len(), 1);
        assert_eq!(log.take().len(), 2);
        assert!(log.is_empty());
    }

    #[test]
    fn test_closure_parent() {
        let seen = RefCell::new(Vec::new());
        let parent = |r: ComponentRecord| seen.borrow_mut().push(r.id);
        parent.propagate(ComponentRecord::new(ComponentId::new(7)));
        assert_eq!(*seen.borrow(), vec![ComponentId::new(7)]);
    }

    #[cfg(feature = "serialize")]
    #[test]
    fn test_json_omits_unchanged_fields() {
        let mut record = ComponentRecord::new(ComponentId::new(3));
        record.output_states = Some(vec![Level::High, Level::Unset]);
        assert_eq!(
            record.to_json().unwrap(),
            r#"{"id":3,"output_states":[true,null]}"#
        );
    }

    #[cfg(feature = "serialize")]
    #[test]
    fn test_json_removal_reports_null_type() {
        let mut record = ComponentRecord::new(ComponentId::new(3));
        record.kind = Some(None);
        assert!(record.is_removal());
        assert_eq!(record.to_json().unwrap(), r#"{"id":3,"type":null}"#);
    }

    #[cfg(feature = "serialize")]
    #[test]
    fn test_json_connections_reference_ids() {
        let mut record = ComponentRecord::new(ComponentId::new(1));
        record.output_connections = Some(vec![
            Some(OutboundConnection {
                component: ComponentId::new(9),
                input_port: 1,
                delay: 2,
            }),
            None,
        ]);
        assert_eq!(
            record.to_json().unwrap(),
            r#"{"id":1,"output_connections":[{"component":9,"input_port":1,"delay":2},null]}"#
        );
    }
}
