use crate::sample::Strategy;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct JumpConfig {
    pub sensor: SensorConfig,
    pub camera: CameraConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SensorConfig {
    /// Deviation from rest (g) at which a takeoff is considered
    #[serde(default = "default_sensor_rise_threshold")]
    pub rise_threshold: f64,

    /// Deviation from rest (g) under which a pending jump completes
    #[serde(default = "default_sensor_fall_threshold")]
    pub fall_threshold: f64,

    /// Minimum time between two accepted jumps
    #[serde(default = "default_sensor_refractory_ms")]
    pub refractory_ms: u64,

    /// Exponential moving average factor (1.0 = no smoothing)
    #[serde(default = "default_smoothing_factor")]
    pub smoothing_factor: f64,

    /// Resting magnitude removed from the signal
    #[serde(default = "default_baseline_g")]
    pub baseline_g: f64,

    /// Track the resting magnitude instead of trusting `baseline_g`
    #[serde(default = "default_adaptive_baseline")]
    pub adaptive_baseline: bool,

    /// Filter coefficient used when `adaptive_baseline` is on
    #[serde(default = "default_baseline_adaptation_rate")]
    pub baseline_adaptation_rate: f64,

    /// A rise with no fall within this window is dropped as a plateau
    #[serde(default = "default_sensor_plateau_timeout_ms")]
    pub plateau_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CameraConfig {
    /// Camera device index to acquire at initialization
    #[serde(default = "default_camera_device_index")]
    pub device_index: u32,

    /// Frame cadence delivered by the capture collaborator
    #[serde(default = "default_camera_fps")]
    pub fps: u32,

    #[serde(default = "default_camera_rise_threshold")]
    pub rise_threshold: f64,

    #[serde(default = "default_camera_fall_threshold")]
    pub fall_threshold: f64,

    /// Refractory period, rounded up to whole frame intervals
    #[serde(default = "default_camera_refractory_ms")]
    pub refractory_ms: u64,

    #[serde(default = "default_camera_plateau_timeout_ms")]
    pub plateau_timeout_ms: u64,

    /// Which frame scalar drives detection
    #[serde(default)]
    pub signal: FrameSignal,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SessionConfig {
    /// Detection strategy for the session
    #[serde(default = "default_strategy")]
    pub strategy: Strategy,

    /// Session event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FrameSignal {
    #[default]
    VerticalDisplacement,
    LuminanceDelta,
}

impl CameraConfig {
    /// Refractory period rounded up to a whole number of frame intervals
    pub fn effective_refractory_ms(&self) -> u64 {
        if self.fps == 0 {
            return self.refractory_ms;
        }
        let fps = self.fps as u64;
        // Periods too long to round in u64 are used as configured
        self.refractory_ms
            .checked_mul(fps)
            .map(|scaled| scaled.div_ceil(1000))
            .and_then(|frames| frames.checked_mul(1000))
            .map(|scaled| scaled.div_ceil(fps))
            .unwrap_or(self.refractory_ms)
    }
}

impl JumpConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("jumpsense.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("sensor.rise_threshold", default_sensor_rise_threshold())?
            .set_default("sensor.fall_threshold", default_sensor_fall_threshold())?
            .set_default("sensor.refractory_ms", default_sensor_refractory_ms())?
            .set_default("sensor.smoothing_factor", default_smoothing_factor())?
            .set_default("sensor.baseline_g", default_baseline_g())?
            .set_default("sensor.adaptive_baseline", default_adaptive_baseline())?
            .set_default(
                "sensor.baseline_adaptation_rate",
                default_baseline_adaptation_rate(),
            )?
            .set_default(
                "sensor.plateau_timeout_ms",
                default_sensor_plateau_timeout_ms(),
            )?
            .set_default("camera.device_index", default_camera_device_index())?
            .set_default("camera.fps", default_camera_fps())?
            .set_default("camera.rise_threshold", default_camera_rise_threshold())?
            .set_default("camera.fall_threshold", default_camera_fall_threshold())?
            .set_default("camera.refractory_ms", default_camera_refractory_ms())?
            .set_default(
                "camera.plateau_timeout_ms",
                default_camera_plateau_timeout_ms(),
            )?
            .set_default("camera.signal", "vertical_displacement")?
            .set_default("session.strategy", "sensor")?
            .set_default(
                "session.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .add_source(File::with_name(&path_str).required(false))
            // JUMPSENSE_SENSOR__RISE_THRESHOLD=0.9
            .add_source(
                Environment::with_prefix("JUMPSENSE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: JumpConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_thresholds(
            "sensor",
            self.sensor.rise_threshold,
            self.sensor.fall_threshold,
        )?;
        validate_thresholds(
            "camera",
            self.camera.rise_threshold,
            self.camera.fall_threshold,
        )?;

        if !(self.sensor.smoothing_factor > 0.0 && self.sensor.smoothing_factor <= 1.0) {
            return Err(ConfigError::Message(
                "Sensor smoothing_factor must be in (0, 1]".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.sensor.baseline_adaptation_rate) {
            return Err(ConfigError::Message(
                "Sensor baseline_adaptation_rate must be in [0, 1]".to_string(),
            ));
        }

        if self.sensor.refractory_ms == 0 || self.camera.refractory_ms == 0 {
            return Err(ConfigError::Message(
                "Refractory period must be greater than 0".to_string(),
            ));
        }

        if self.camera.fps == 0 {
            return Err(ConfigError::Message(
                "Camera fps must be greater than 0".to_string(),
            ));
        }

        if self.session.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

fn validate_thresholds(section: &str, rise: f64, fall: f64) -> Result<(), ConfigError> {
    if !(rise.is_finite() && fall.is_finite()) {
        return Err(ConfigError::Message(format!(
            "{} thresholds must be finite",
            section
        )));
    }
    if fall >= rise {
        return Err(ConfigError::Message(format!(
            "{} fall_threshold ({}) must be below rise_threshold ({})",
            section, fall, rise
        )));
    }
    Ok(())
}

impl Default for JumpConfig {
    fn default() -> Self {
        Self {
            sensor: SensorConfig::default(),
            camera: CameraConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            rise_threshold: default_sensor_rise_threshold(),
            fall_threshold: default_sensor_fall_threshold(),
            refractory_ms: default_sensor_refractory_ms(),
            smoothing_factor: default_smoothing_factor(),
            baseline_g: default_baseline_g(),
            adaptive_baseline: default_adaptive_baseline(),
            baseline_adaptation_rate: default_baseline_adaptation_rate(),
            plateau_timeout_ms: default_sensor_plateau_timeout_ms(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_index: default_camera_device_index(),
            fps: default_camera_fps(),
            rise_threshold: default_camera_rise_threshold(),
            fall_threshold: default_camera_fall_threshold(),
            refractory_ms: default_camera_refractory_ms(),
            plateau_timeout_ms: default_camera_plateau_timeout_ms(),
            signal: FrameSignal::default(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            event_bus_capacity: default_event_bus_capacity(),
        }
    }
}

// Default value functions
fn default_sensor_rise_threshold() -> f64 {
    0.8
}
fn default_sensor_fall_threshold() -> f64 {
    0.3
}
fn default_sensor_refractory_ms() -> u64 {
    350
}
fn default_smoothing_factor() -> f64 {
    0.5
}
fn default_baseline_g() -> f64 {
    1.0
}
fn default_adaptive_baseline() -> bool {
    false
}
fn default_baseline_adaptation_rate() -> f64 {
    0.02
}
fn default_sensor_plateau_timeout_ms() -> u64 {
    1500
}

fn default_camera_device_index() -> u32 {
    0
}
fn default_camera_fps() -> u32 {
    30
}
fn default_camera_rise_threshold() -> f64 {
    12.0
}
fn default_camera_fall_threshold() -> f64 {
    4.0
}
fn default_camera_refractory_ms() -> u64 {
    400
}
fn default_camera_plateau_timeout_ms() -> u64 {
    2000
}

fn default_strategy() -> Strategy {
    Strategy::Sensor
}
fn default_event_bus_capacity() -> usize {
    64
}
