/// Simulated time for the logic simulation.
///
/// Represents a point on the simulation clock in integer ticks. Time
/// advances when the scheduler processes events, or when the pacing
/// loop moves the clock forward against the wall clock while the
/// circuit sits in steady state.

/// A point in simulation time, measured in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SimTime(u64);

impl SimTime {
    /// The zero-point of simulation time.
    pub const ZERO: SimTime = SimTime(0);

    /// The latest representable time.
    pub const MAX: SimTime = SimTime(u64::MAX);

    /// Create a new `SimTime` from a raw tick value.
    #[inline]
    pub fn new(ticks: u64) -> Self {
        SimTime(ticks)
    }

    /// Return the raw tick value.
    #[inline]
    pub fn ticks(self) -> u64 {
        self.0
    }

    /// Advance time by `delta` ticks.
    /// Returns `None` on overflow.
    #[inline]
    pub fn advance(self, delta: u64) -> Option<SimTime> {
        self.0.checked_add(delta).map(SimTime)
    }

    /// The time `delay` ticks after `self`, pinned at [`SimTime::MAX`].
    ///
    /// Used when scheduling follow-up events; a circuit running into the
    /// end of the clock just stops moving forward.
    #[inline]
    pub fn after(self, delay: u64) -> SimTime {
        SimTime(self.0.saturating_add(delay))
    }

    /// Returns the duration (in ticks) between two points in time.
    /// Returns `None` if `other` is after `self`.
    #[inline]
    pub fn duration_since(self, other: SimTime) -> Option<u64> {
        self.0.checked_sub(other.0)
    }
}

impl std::fmt::Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T={}", self.0)
    }
}
