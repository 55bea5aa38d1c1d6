//! Scheduler configuration.

use std::time::Duration;

use crate::error::{SimError, SimResult};

/// Pacing parameters of a [`Scheduler`](crate::scheduler::Scheduler).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SchedulerConfig {
    /// Simulated ticks per wall-clock second. Zero pauses simulated time.
    pub simulation_rate: f64,
    /// Longest stretch of wall time one pacing pass may run before
    /// yielding to the host.
    pub housekeeping_interval: Duration,
}

impl SchedulerConfig {
    pub const DEFAULT_RATE: f64 = 1000.0;
    pub const DEFAULT_HOUSEKEEPING: Duration = Duration::from_millis(50);

    pub fn new(simulation_rate: f64, housekeeping_interval: Duration) -> Self {
        SchedulerConfig {
            simulation_rate,
            housekeeping_interval,
        }
    }

    pub fn with_rate(mut self, simulation_rate: f64) -> Self {
        self.simulation_rate = simulation_rate;
        self
    }

    pub fn with_housekeeping_interval(mut self, interval: Duration) -> Self {
        self.housekeeping_interval = interval;
        self
    }

    /// Check both fields.
    pub fn validate(&self) -> SimResult<()> {
        validate_rate(self.simulation_rate)?;
        validate_housekeeping(self.housekeeping_interval)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig::new(Self::DEFAULT_RATE, Self::DEFAULT_HOUSEKEEPING)
    }
}

pub(crate) fn validate_rate(rate: f64) -> SimResult<()> {
    if rate.is_finite() && rate >= 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidSimulationRate(rate))
    }
}

pub(crate) fn validate_housekeeping(interval: Duration) -> SimResult<()> {
    if interval.is_zero() {
        Err(SimError::InvalidHousekeepingInterval)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SchedulerConfig::default();
        assert_eq!(config.simulation_rate, 1000.0);
        assert_eq!(config.housekeeping_interval, Duration::from_millis(50));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let config = SchedulerConfig::default().with_rate(-1.0);
        assert_eq!(config.validate(), Err(SimError::InvalidSimulationRate(-1.0)));
        assert!(SchedulerConfig::default().with_rate(f64::NAN).validate().is_err());
        assert_eq!(
            SchedulerConfig::default().with_rate(f64::INFINITY).validate(),
            Err(SimError::InvalidSimulationRate(f64::INFINITY))
        );
        let config = SchedulerConfig::default().with_housekeeping_interval(Duration::ZERO);
        assert_eq!(config.validate(), Err(SimError::InvalidHousekeepingInterval));
        assert!(SchedulerConfig::default().with_rate(0.0).validate().is_ok());
    }
}
