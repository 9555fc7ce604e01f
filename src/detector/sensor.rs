use super::threshold::{HysteresisMachine, ThresholdParams};
use super::{DetectorState, DetectorStats, EventDetector};
use crate::config::SensorConfig;
use crate::sample::SmoothedSignal;

/// Jump detector for the accelerometer path.
///
/// Consumes the preprocessor's deviation-from-rest signal.
#[derive(Debug, Clone)]
pub struct SensorDetector {
    machine: HysteresisMachine,
}

impl SensorDetector {
    pub fn new(params: ThresholdParams) -> Self {
        Self {
            machine: HysteresisMachine::new(params),
        }
    }

    pub fn from_config(config: &SensorConfig) -> Self {
        Self::new(ThresholdParams {
            rise_threshold: config.rise_threshold,
            fall_threshold: config.fall_threshold,
            refractory_ms: config.refractory_ms,
            plateau_timeout_ms: config.plateau_timeout_ms,
        })
    }

    pub fn params(&self) -> &ThresholdParams {
        self.machine.params()
    }
}

impl EventDetector for SensorDetector {
    type Input = SmoothedSignal;

    fn feed(&mut self, input: &SmoothedSignal) -> bool {
        self.machine.step(input.magnitude, input.timestamp_millis)
    }

    fn state(&self) -> &DetectorState {
        self.machine.state()
    }

    fn stats(&self) -> &DetectorStats {
        self.machine.stats()
    }

    fn reset_count(&mut self) {
        self.machine.reset_count();
    }
}
