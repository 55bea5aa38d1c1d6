//! Tri-state signal level carried on ports and wires.

/// The level of a single port.
///
/// Ports start out `Unset` until something drives them. Built-in gates
/// read an unset input as low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serialize",
    serde(from = "Option<bool>", into = "Option<bool>")
)]
pub enum Level {
    /// Nothing has driven this port yet.
    #[default]
    Unset,
    /// Logic zero.
    Low,
    /// Logic one.
    High,
}

impl Level {
    /// `true` only for [`Level::High`].
    #[inline]
    pub fn is_high(self) -> bool {
        self == Level::High
    }

    /// `true` for anything that is not [`Level::Unset`].
    #[inline]
    pub fn is_set(self) -> bool {
        self != Level::Unset
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl From<Option<bool>> for Level {
    fn from(value: Option<bool>) -> Self {
        value.map_or(Level::Unset, Level::from)
    }
}

impl From<Level> for Option<bool> {
    fn from(level: Level) -> Self {
        match level {
            Level::Unset => None,
            Level::Low => Some(false),
            Level::High => Some(true),
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Level::Unset => write!(f, "-"),
            Level::Low => write!(f, "0"),
            Level::High => write!(f, "1"),
        }
    }
}
