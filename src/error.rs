//! Structured error types for gatewave.
//!
//! Fallible public APIs return `Result<T, SimError>`. Rejected
//! connections are not errors: `connect`/`disconnect` report them as a
//! plain `false` so callers can treat them as ordinary control flow.
//! Likewise starting a running scheduler or stopping a stopped one is a
//! no-op that returns `false`.

use thiserror::Error;

use crate::component::ComponentId;

/// The top-level error type for the simulation engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    // ── Circuit errors ────────────────────────────────────

    /// A component ID was referenced but is not part of the circuit.
    #[error("component {0} not found")]
    ComponentNotFound(ComponentId),

    /// Attempted to add a component with an ID that is already in use.
    #[error("component {0} is already registered")]
    ComponentAlreadyRegistered(ComponentId),

    /// The library has no template for the requested kind.
    #[error("unknown component kind '{0}'")]
    UnknownKind(String),

    // ── Validation errors ─────────────────────────────────

    /// A property was given a value it cannot take.
    #[error("invalid value for '{field}': {reason}")]
    InvalidProperty { field: String, reason: String },

    /// A property that is fixed at construction was written.
    #[error("property '{0}' is read-only")]
    ReadOnlyProperty(String),

    /// The simulation rate must be a finite, non-negative number.
    #[error("simulation rate must be finite and >= 0.0, got {0}")]
    InvalidSimulationRate(f64),

    /// The housekeeping interval must be non-zero.
    #[error("housekeeping interval must be greater than zero")]
    InvalidHousekeepingInterval,

    /// Every field of a best-effort property batch that failed to apply.
    #[error("{}", summarize(.0))]
    PropertyBatch(Vec<SimError>),

    // ── Driver errors ─────────────────────────────────────

    /// The circuit kept producing events past the given limit.
    #[error("circuit did not settle within {limit} events")]
    Unsettled { limit: usize },

    /// A record could not be turned into JSON.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl SimError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        SimError::InvalidProperty {
            field: field.to_owned(),
            reason: reason.into(),
        }
    }
}

fn summarize(errors: &[SimError]) -> String {
    let noun = if errors.len() == 1 { "property" } else { "properties" };
    let details = errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    format!("{} {} could not be applied: {}", errors.len(), noun, details)
}

/// Convenience alias for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_component_not_found() {
        let e = SimError::ComponentNotFound(ComponentId::new(5));
        assert_eq!(e.to_string(), "component C5 not found");
    }

    #[test]
    fn test_error_display_rate() {
        let e = SimError::InvalidSimulationRate(-2.5);
        assert!(e.to_string().contains("-2.5"));
    }

    #[test]
    fn test_error_display_batch_lists_every_field() {
        let e = SimError::PropertyBatch(vec![
            SimError::ReadOnlyProperty("id".into()),
            SimError::invalid("delay", "expected a non-negative integer"),
        ]);
        let s = e.to_string();
        assert!(s.starts_with("2 properties could not be applied"));
        assert!(s.contains("'id' is read-only"));
        assert!(s.contains("'delay'"));
    }

    #[test]
    fn test_error_is_std_error() {
        let e: Box<dyn std::error::Error> = Box::new(SimError::Unsettled { limit: 3 });
        assert_eq!(e.to_string(), "circuit did not settle within 3 events");
    }
}
