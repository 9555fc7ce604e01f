mod camera;
mod sensor;
mod threshold;
#[cfg(test)]
mod tests;

pub use camera::CameraDetector;
pub use sensor::SensorDetector;
pub use threshold::{HysteresisMachine, ThresholdParams};

use serde::{Deserialize, Serialize};

/// Position of the signal relative to the hysteresis band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    BelowThreshold,
    AboveThreshold,
}

/// Per-detector state, mutated only by the detector's own processing path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorState {
    pub phase: Phase,
    /// Timestamp of the last accepted event; `None` until the first one
    pub last_event_timestamp: Option<u64>,
    pub refractory_millis: u64,
    pub count: u32,
}

impl DetectorState {
    pub fn new(refractory_millis: u64) -> Self {
        Self {
            phase: Phase::BelowThreshold,
            last_event_timestamp: None,
            refractory_millis,
            count: 0,
        }
    }
}

/// Counters describing what the detector accepted and rejected
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorStats {
    pub events_accepted: u64,
    pub refractory_lockouts: u64,
    pub plateaus_dropped: u64,
    pub manual_accepted: u64,
    pub manual_rejected: u64,
}

/// Turns a stream of inputs into discrete jump events.
///
/// Both strategies drive the same [`HysteresisMachine`]; they differ only in
/// how an input is reduced to a scalar and in their tuning.
pub trait EventDetector {
    type Input;

    /// Process one input; returns true exactly when a jump is recognised.
    fn feed(&mut self, input: &Self::Input) -> bool;

    fn state(&self) -> &DetectorState;

    fn stats(&self) -> &DetectorStats;

    /// Zero the count and drop any pending rise and refractory lockout
    fn reset_count(&mut self);

    fn count(&self) -> u32 {
        self.state().count
    }
}
