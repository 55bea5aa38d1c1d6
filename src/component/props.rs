//! Component templates and property values.
//!
//! A [`ComponentTemplate`] holds the defaults every instance of a kind
//! starts from. Instances copy those defaults once at construction and
//! apply their own overrides on top (see
//! [`ComponentBuilder`](super::ComponentBuilder)); there is no live link
//! back to the template afterwards.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::error::{SimError, SimResult};

use super::level::Level;

/// The pure logic function of a component.
///
/// Receives the current input levels and the number of outputs, returns
/// the output levels. Missing trailing outputs are read as
/// [`Level::Unset`].
pub type LogicFn = Rc<dyn Fn(&[Level], usize) -> Vec<Level>>;

/// A set of named property values, as passed to `set_properties`.
pub type Properties = BTreeMap<String, PropertyValue>;

// ── PropertyValue ─────────────────────────────────────────────────────

/// A single property value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(untagged))]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl PropertyValue {
    /// Read the value as a non-negative integer count.
    pub fn as_count(&self, field: &str) -> SimResult<u64> {
        match *self {
            PropertyValue::Int(n) if n >= 0 => Ok(n as u64),
            _ => Err(SimError::invalid(
                field,
                format!("expected a non-negative integer, got {}", self),
            )),
        }
    }
}

impl std::fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Int(n) => write!(f, "{}", n),
            PropertyValue::Float(x) => write!(f, "{}", x),
            PropertyValue::Text(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        PropertyValue::Int(v.into())
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Float(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::Text(v.to_owned())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::Text(v)
    }
}

// ── PortBounds ────────────────────────────────────────────────────────

/// Inclusive range a port count may be adjusted within.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct PortBounds {
    pub min: usize,
    pub max: usize,
}

impl PortBounds {
    /// A port count that cannot change.
    pub fn fixed(count: usize) -> Self {
        PortBounds {
            min: count,
            max: count,
        }
    }

    /// Clamp `count` into the range.
    pub fn clamp(self, count: usize) -> usize {
        count.clamp(self.min, self.max.max(self.min))
    }
}

// ── ComponentTemplate ─────────────────────────────────────────────────

/// The shared defaults of one component kind.
///
/// ```rust
/// use gatewave::component::{ComponentTemplate, Level};
///
/// let and = ComponentTemplate::new("AND", |ins: &[Level], _outs: usize| {
///     vec![Level::from(ins.iter().all(|l| l.is_high()))]
/// })
/// .with_input_range(2, 2, 8)
/// .with_outputs(1)
/// .with_delay(1);
///
/// assert_eq!(and.kind(), "AND");
/// assert_eq!(and.inputs(), 2);
/// ```
#[derive(Clone)]
pub struct ComponentTemplate {
    kind: String,
    logic: LogicFn,
    inputs: usize,
    input_bounds: PortBounds,
    outputs: usize,
    output_bounds: PortBounds,
    delay: u64,
    properties: Properties,
}

impl ComponentTemplate {
    /// A template without ports and with a delay of one tick.
    pub fn new<F>(kind: impl Into<String>, logic: F) -> Self
    where
        F: Fn(&[Level], usize) -> Vec<Level> + 'static,
    {
        ComponentTemplate {
            kind: kind.into(),
            logic: Rc::new(logic),
            inputs: 0,
            input_bounds: PortBounds::fixed(0),
            outputs: 0,
            output_bounds: PortBounds::fixed(0),
            delay: 1,
            properties: Properties::new(),
        }
    }

    /// A fixed number of inputs.
    pub fn with_inputs(self, count: usize) -> Self {
        self.with_input_range(count, count, count)
    }

    /// `count` inputs by default, adjustable within `min..=max`.
    pub fn with_input_range(mut self, count: usize, min: usize, max: usize) -> Self {
        self.input_bounds = PortBounds { min, max: max.max(min) };
        self.inputs = self.input_bounds.clamp(count);
        self
    }

    /// A fixed number of outputs.
    pub fn with_outputs(self, count: usize) -> Self {
        self.with_output_range(count, count, count)
    }

    /// `count` outputs by default, adjustable within `min..=max`.
    pub fn with_output_range(mut self, count: usize, min: usize, max: usize) -> Self {
        self.output_bounds = PortBounds { min, max: max.max(min) };
        self.outputs = self.output_bounds.clamp(count);
        self
    }

    /// Ticks between a clock phase and the output commits it causes.
    pub fn with_delay(mut self, delay: u64) -> Self {
        self.delay = delay;
        self
    }

    /// A free-form default property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn logic(&self) -> &LogicFn {
        &self.logic
    }

    pub fn inputs(&self) -> usize {
        self.inputs
    }

    pub fn input_bounds(&self) -> PortBounds {
        self.input_bounds
    }

    pub fn outputs(&self) -> usize {
        self.outputs
    }

    pub fn output_bounds(&self) -> PortBounds {
        self.output_bounds
    }

    pub fn delay(&self) -> u64 {
        self.delay
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }
}

impl std::fmt::Debug for ComponentTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentTemplate")
            .field("kind", &self.kind)
            .field("inputs", &self.inputs)
            .field("input_bounds", &self.input_bounds)
            .field("outputs", &self.outputs)
            .field("output_bounds", &self.output_bounds)
            .field("delay", &self.delay)
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}
