//! Wire descriptors stored on component ports.

use super::id::ComponentId;

/// The wire leaving an output port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct OutboundConnection {
    /// Component on the receiving end.
    pub component: ComponentId,
    /// Input port on `component` the wire drives.
    pub input_port: usize,
    /// Ticks between an output commit and the edge arriving at the sink.
    pub delay: u64,
}

/// The wire arriving at an input port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct InboundConnection {
    /// Component driving the wire.
    pub component: ComponentId,
    /// Output port on `component` the wire starts at.
    pub output_port: usize,
}
