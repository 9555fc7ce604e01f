use super::threshold::{HysteresisMachine, ThresholdParams};
use super::{DetectorState, DetectorStats, EventDetector};
use crate::config::{CameraConfig, FrameSignal};
use crate::sample::FrameDescriptor;

/// Jump detector for the camera path.
///
/// Runs the same hysteresis machine as the sensor path on one scalar taken
/// from each frame descriptor, and accepts operator-initiated triggers for
/// conditions where automatic detection is unreliable.
#[derive(Debug, Clone)]
pub struct CameraDetector {
    machine: HysteresisMachine,
    signal: FrameSignal,
}

impl CameraDetector {
    pub fn new(params: ThresholdParams, signal: FrameSignal) -> Self {
        Self {
            machine: HysteresisMachine::new(params),
            signal,
        }
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        Self::new(
            ThresholdParams {
                rise_threshold: config.rise_threshold,
                fall_threshold: config.fall_threshold,
                refractory_ms: config.effective_refractory_ms(),
                plateau_timeout_ms: config.plateau_timeout_ms,
            },
            config.signal,
        )
    }

    /// Register one jump now, bypassing the thresholds.
    ///
    /// Subject to the same refractory lockout as detected jumps.
    pub fn trigger_manual(&mut self, timestamp_millis: u64) -> bool {
        self.machine.trigger(timestamp_millis)
    }

    pub fn signal(&self) -> FrameSignal {
        self.signal
    }

    pub fn params(&self) -> &ThresholdParams {
        self.machine.params()
    }

    fn scalar(&self, frame: &FrameDescriptor) -> f64 {
        match self.signal {
            FrameSignal::VerticalDisplacement => frame.vertical_displacement,
            FrameSignal::LuminanceDelta => frame.luminance_delta,
        }
    }
}

impl EventDetector for CameraDetector {
    type Input = FrameDescriptor;

    fn feed(&mut self, input: &FrameDescriptor) -> bool {
        let value = self.scalar(input);
        self.machine.step(value, input.timestamp_millis)
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
