//! Component ID — a lightweight, ordered, copyable component identifier.

/// A unique identifier for a component in a circuit.
///
/// Identifiers are chosen by whoever builds the circuit. Events, wires
/// and propagated records refer to components exclusively through their
/// `ComponentId`, never through references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(transparent))]
pub struct ComponentId(u64);

impl ComponentId {
    /// Create a component ID from a raw integer.
    #[inline]
    pub fn new(id: u64) -> Self {
        ComponentId(id)
    }

    /// Return the underlying integer.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "C{}", self.0)
    }
}
