//! Accelerometer signal conditioning.
//!
//! Turns raw triaxial samples into a smoothed deviation-from-rest signal:
//! vector magnitude, exponential moving average, then baseline removal.
//! All updates are O(1) per sample with no history buffer.

use crate::config::SensorConfig;
use crate::sample::{MotionSample, SmoothedSignal};
use tracing::trace;

/// Per-session smoothing state for the sensor path
#[derive(Debug, Clone)]
pub struct SignalPreprocessor {
    smoothing_factor: f64,
    baseline: f64,
    adaptive_baseline: bool,
    adaptation_rate: f64,
    /// Rolling average accumulator, seeded by the first sample
    average: Option<f64>,
    samples_processed: u64,
}

impl SignalPreprocessor {
    pub fn new(config: &SensorConfig) -> Self {
        Self {
            smoothing_factor: config.smoothing_factor.clamp(f64::MIN_POSITIVE, 1.0),
            baseline: config.baseline_g,
            adaptive_baseline: config.adaptive_baseline,
            adaptation_rate: config.baseline_adaptation_rate.clamp(0.0, 1.0),
            average: None,
            samples_processed: 0,
        }
    }

    /// Smooth one sample and express it as deviation from rest.
    ///
    /// Cold-start output is expected to be noisy; the detector thresholds
    /// reject it.
    pub fn process(&mut self, sample: &MotionSample) -> SmoothedSignal {
        let magnitude = sample.magnitude();

        let smoothed = match self.average {
            Some(previous) => {
                self.smoothing_factor * magnitude + (1.0 - self.smoothing_factor) * previous
            }
            None => magnitude,
        };
        self.average = Some(smoothed);

        if self.adaptive_baseline {
            self.baseline += self.adaptation_rate * (magnitude - self.baseline);
        }

        self.samples_processed += 1;

        let deviation = smoothed - self.baseline;
        trace!(
            "Sample at {}ms: magnitude {:.3}g, smoothed {:.3}g, deviation {:.3}g",
            sample.timestamp_millis,
            magnitude,
            smoothed,
            deviation
        );

        SmoothedSignal::new(deviation, sample.timestamp_millis)
    }

    /// Current resting magnitude being removed
    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    pub fn samples_processed(&self) -> u64 {
        self.samples_processed
    }

    /// Forget the rolling average; the baseline estimate is kept
    pub fn reset(&mut self) {
        self.average = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(smoothing_factor: f64, baseline_g: f64) -> SensorConfig {
        SensorConfig {
            smoothing_factor,
            baseline_g,
            ..SensorConfig::default()
        }
    }

    #[test]
    fn test_rest_produces_zero_deviation() {
        let mut preprocessor = SignalPreprocessor::new(&config(0.5, 1.0));
        for t in 0..20 {
            let signal = preprocessor.process(&MotionSample::new(0.0, 0.0, 1.0, t * 10));
            assert!(signal.magnitude.abs() < 1e-12);
            assert_eq!(signal.timestamp_millis, t * 10);
        }
        assert_eq!(preprocessor.samples_processed(), 20);
    }

    #[test]
    fn test_unit_smoothing_passes_magnitude_through() {
        let mut preprocessor = SignalPreprocessor::new(&config(1.0, 0.0));
        let signal = preprocessor.process(&MotionSample::new(0.0, 0.0, 2.5, 0));
        assert!((signal.magnitude - 2.5).abs() < 1e-12);
        let signal = preprocessor.process(&MotionSample::new(0.0, 1.0, 0.0, 10));
        assert!((signal.magnitude - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_smoothing_damps_single_spike() {
        let mut preprocessor = SignalPreprocessor::new(&config(0.25, 1.0));
        preprocessor.process(&MotionSample::new(0.0, 0.0, 1.0, 0));
        let spike = preprocessor.process(&MotionSample::new(0.0, 0.0, 3.0, 10));
        // 0.25 * 3.0 + 0.75 * 1.0 - 1.0
        assert!((spike.magnitude - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_adaptive_baseline_converges() {
        let mut cfg = config(1.0, 1.0);
        cfg.adaptive_baseline = true;
        cfg.baseline_adaptation_rate = 0.1;
        let mut preprocessor = SignalPreprocessor::new(&cfg);

        // A sensor that reads 1.1g at rest
        let mut last = 0.0;
        for t in 0..200 {
            last = preprocessor
                .process(&MotionSample::new(0.0, 0.0, 1.1, t * 10))
                .magnitude;
        }
        assert!((preprocessor.baseline() - 1.1).abs() < 1e-3);
        assert!(last.abs() < 1e-3);
    }

    #[test]
    fn test_reset_reseeds_average() {
        let mut preprocessor = SignalPreprocessor::new(&config(0.1, 0.0));
        preprocessor.process(&MotionSample::new(0.0, 0.0, 5.0, 0));
        preprocessor.reset();
        let signal = preprocessor.process(&MotionSample::new(0.0, 0.0, 1.0, 10));
        assert!((signal.magnitude - 1.0).abs() < 1e-12);
    }
}
