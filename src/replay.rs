//! Recorded input replay.
//!
//! Recordings are JSON lines, one input per line, tagged by `kind`:
//!
//! ```text
//! {"kind":"motion","x":0.0,"y":0.0,"z":2.4,"timestamp_millis":120}
//! {"kind":"frame","vertical_displacement":18.5,"timestamp_millis":133}
//! {"kind":"manual","timestamp_millis":900}
//! {"kind":"switch_device","device_index":1}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use crate::camera::SimulatedCameraProvider;
use crate::config::JumpConfig;
use crate::error::Result;
use crate::events::{CountCause, CountUpdate};
use crate::sample::{FrameDescriptor, MotionSample, Strategy};
use crate::sensor::SimulatedSensorProvider;
use crate::session::{Lifecycle, SessionController, SessionMetrics};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// One line of a recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordedInput {
    Motion(MotionSample),
    Frame(FrameDescriptor),
    Manual { timestamp_millis: u64 },
    SwitchDevice { device_index: u32 },
}

impl RecordedInput {
    /// Strategy able to consume this input
    pub fn strategy(&self) -> Strategy {
        match self {
            RecordedInput::Motion(_) => Strategy::Sensor,
            RecordedInput::Frame(_)
            | RecordedInput::Manual { .. }
            | RecordedInput::SwitchDevice { .. } => Strategy::Camera,
        }
    }
}

/// Outcome of replaying a recording through one session
#[derive(Debug, Clone, Serialize)]
pub struct ReplaySummary {
    pub session_id: Uuid,
    pub strategy: Strategy,
    pub count: u32,
    pub lifecycle: Lifecycle,
    pub inputs_read: usize,
    /// Inputs meant for the other strategy
    pub inputs_skipped: usize,
    pub switch_failures: usize,
    pub jump_timestamps: Vec<u64>,
    pub metrics: SessionMetrics,
}

pub fn parse_recording<R: BufRead>(reader: R) -> Result<Vec<RecordedInput>> {
    let mut inputs = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let input = serde_json::from_str(trimmed).map_err(|e| {
            error!("Invalid recording entry on line {}: {}", index + 1, e);
            e
        })?;
        inputs.push(input);
    }
    Ok(inputs)
}

pub fn load_recording<P: AsRef<Path>>(path: P) -> Result<Vec<RecordedInput>> {
    let path = path.as_ref();
    let inputs = parse_recording(BufReader::new(File::open(path)?))?;
    info!("Loaded {} recorded inputs from {}", inputs.len(), path.display());
    Ok(inputs)
}

/// Drive a fresh session over simulated devices through
/// initialize, start, the recorded inputs and dispose.
pub async fn run(
    config: &JumpConfig,
    strategy: Strategy,
    inputs: &[RecordedInput],
) -> Result<ReplaySummary> {
    let session = match strategy {
        Strategy::Sensor => SessionController::with_sensor(
            config,
            Arc::new(SimulatedSensorProvider::default()),
        ),
        Strategy::Camera => {
            // One simulated device per index the recording can reach
            let indices: BTreeSet<u32> = inputs
                .iter()
                .filter_map(|input| match input {
                    RecordedInput::SwitchDevice { device_index } => Some(*device_index),
                    _ => None,
                })
                .chain(std::iter::once(config.camera.device_index))
                .collect();
            SessionController::with_camera(
                config,
                Arc::new(SimulatedCameraProvider::with_indices(indices)),
            )
        }
    };

    let jumps = Arc::new(Mutex::new(Vec::new()));
    let sink = jumps.clone();
    session.add_listener(move |update: &CountUpdate| match update.cause {
        CountCause::Jump(_) => sink.lock().extend(update.timestamp_millis),
        CountCause::Reset => sink.lock().clear(),
    });

    session.initialize().await?;
    session.start().await?;

    let summary = replay(&session, inputs).await;
    let lifecycle = session.lifecycle();
    session.dispose().await?;
    let (inputs_skipped, switch_failures) = summary?;

    let jump_timestamps = jumps.lock().clone();
    Ok(ReplaySummary {
        session_id: session.id(),
        strategy,
        count: session.count(),
        lifecycle,
        inputs_read: inputs.len(),
        inputs_skipped,
        switch_failures,
        jump_timestamps,
        metrics: session.metrics(),
    })
}

/// Feed `inputs` in order; returns (skipped, failed switches)
async fn replay(session: &SessionController, inputs: &[RecordedInput]) -> Result<(usize, usize)> {
    let mut skipped = 0;
    let mut switch_failures = 0;

    for input in inputs {
        if input.strategy() != session.strategy() {
            debug!("Skipping {:?} input in {:?} session", input, session.strategy());
            skipped += 1;
            continue;
        }

        match input {
            RecordedInput::Motion(sample) => {
                session.feed_sample(sample)?;
            }
            RecordedInput::Frame(frame) => {
                session.feed_frame(frame)?;
            }
            RecordedInput::Manual { timestamp_millis } => {
                session.trigger_manual(*timestamp_millis)?;
            }
            RecordedInput::SwitchDevice { device_index } => {
                match session.switch_camera(*device_index).await {
                    Ok(()) => {}
                    Err(e) if e.is_recoverable() => {
                        warn!("Camera switch to device {} failed: {}", device_index, e);
                        switch_failures += 1;
                        if session.lifecycle() == Lifecycle::Idle {
                            // No handle left; reacquire on the configured device
                            session.initialize().await?;
                            session.start().await?;
                        }
                    }
                    Err(e) => return Err(e),
                }
            }
        }
    }

    Ok((skipped, switch_failures))
}
