use crate::error::{JumpError, Result};
use serde::{Deserialize, Serialize};

/// Largest vector magnitude, in g, accepted from an accelerometer
pub const MAX_MAGNITUDE_G: f64 = 1_000.0;

/// Detection strategy, fixed for the lifetime of one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Triaxial accelerometer samples
    Sensor,
    /// Per-frame motion summaries from the camera
    Camera,
}

/// One raw accelerometer reading, in g
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub timestamp_millis: u64,
}

impl MotionSample {
    pub fn new(x: f64, y: f64, z: f64, timestamp_millis: u64) -> Self {
        Self {
            x,
            y,
            z,
            timestamp_millis,
        }
    }

    /// Euclidean magnitude of the acceleration vector
    pub fn magnitude(&self) -> f64 {
        self.x.hypot(self.y).hypot(self.z)
    }

    /// Reject readings the sensor stack should never have produced
    pub fn validate(&self) -> Result<()> {
        if !(self.x.is_finite() && self.y.is_finite() && self.z.is_finite()) {
            return Err(JumpError::malformed(format!(
                "non-finite accelerometer reading at {}ms: ({}, {}, {})",
                self.timestamp_millis, self.x, self.y, self.z
            )));
        }
        let magnitude = self.magnitude();
        if magnitude > MAX_MAGNITUDE_G {
            return Err(JumpError::malformed(format!(
                "implausible accelerometer magnitude {:e}g at {}ms",
                magnitude, self.timestamp_millis
            )));
        }
        Ok(())
    }
}

/// Smoothed deviation from rest, produced by the preprocessor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothedSignal {
    pub magnitude: f64,
    pub timestamp_millis: u64,
}

impl SmoothedSignal {
    pub fn new(magnitude: f64, timestamp_millis: u64) -> Self {
        Self {
            magnitude,
            timestamp_millis,
        }
    }
}

/// Per-frame motion summary computed by the frame-capture collaborator.
///
/// The detector never sees pixel buffers, only these derived scalars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameDescriptor {
    /// Upward displacement of the motion centroid versus the previous frame,
    /// in pixels (positive = moving up)
    pub vertical_displacement: f64,
    /// Absolute change of mean luminance versus the previous frame (0-255 scale)
    #[serde(default)]
    pub luminance_delta: f64,
    pub timestamp_millis: u64,
}

impl FrameDescriptor {
    pub fn new(vertical_displacement: f64, luminance_delta: f64, timestamp_millis: u64) -> Self {
        Self {
            vertical_displacement,
            luminance_delta,
            timestamp_millis,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.vertical_displacement.is_finite() && self.luminance_delta.is_finite()) {
            return Err(JumpError::malformed(format!(
                "non-finite frame descriptor at {}ms",
                self.timestamp_millis
            )));
        }
        Ok(())
    }
}
