use crate::detector::DetectorStats;
use crate::sample::Strategy;
use serde::{Deserialize, Serialize};

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Idle,
    Initializing,
    Running,
    Paused,
    /// Camera handle being swapped; input is ignored until it completes
    SwitchingDevice,
    Disposed,
}

impl Lifecycle {
    /// Whether device resources are held in this state
    pub fn holds_resources(&self) -> bool {
        matches!(
            self,
            Lifecycle::Initializing | Lifecycle::Running | Lifecycle::SwitchingDevice
        )
    }
}

/// Snapshot of the controller's authoritative state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub lifecycle: Lifecycle,
    pub strategy: Strategy,
    pub count: u32,
}

/// Input accounting for one session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetrics {
    /// Inputs that reached the detector
    pub inputs_processed: u64,
    /// Inputs dropped because the session was not running
    pub inputs_ignored: u64,
    /// Inputs skipped because they were malformed
    pub inputs_malformed: u64,
    pub detector: DetectorStats,
}
