use super::{DetectorState, DetectorStats, Phase};
use tracing::debug;

/// Tuning for the rise/fall hysteresis band and refractory lockout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdParams {
    pub rise_threshold: f64,
    pub fall_threshold: f64,
    pub refractory_ms: u64,
    pub plateau_timeout_ms: u64,
}

/// Rise/fall crossing detector with refractory lockout.
///
/// A rise alone never emits. The event is emitted when the signal drops back
/// under the fall threshold. Rises inside the refractory window after the last
/// accepted event are ignored, and the machine then stays disarmed until the
/// signal has settled under the fall threshold, so a bounce that outlasts the
/// window is not counted either.
#[derive(Debug, Clone)]
pub struct HysteresisMachine {
    params: ThresholdParams,
    state: DetectorState,
    stats: DetectorStats,
    rise_started_at: Option<u64>,
    armed: bool,
}

impl HysteresisMachine {
    pub fn new(params: ThresholdParams) -> Self {
        Self {
            params,
            state: DetectorState::new(params.refractory_ms),
            stats: DetectorStats::default(),
            rise_started_at: None,
            armed: true,
        }
    }

    pub fn params(&self) -> &ThresholdParams {
        &self.params
    }

    pub fn state(&self) -> &DetectorState {
        &self.state
    }

    pub fn stats(&self) -> &DetectorStats {
        &self.stats
    }

    /// Whether a rise at `now` would be accepted
    pub fn is_armed(&self, now: u64) -> bool {
        self.armed && !self.in_refractory(now)
    }

    /// Advance the machine with one scalar; true when a jump completes
    pub fn step(&mut self, value: f64, now: u64) -> bool {
        match self.state.phase {
            Phase::BelowThreshold => {
                if !self.armed {
                    if value < self.params.fall_threshold {
                        self.armed = true;
                    }
                    return false;
                }

                if value >= self.params.rise_threshold {
                    if self.in_refractory(now) {
                        self.stats.refractory_lockouts += 1;
                        self.armed = false;
                        debug!(
                            "Rise at {}ms ignored, inside refractory window of {}ms",
                            now, self.params.refractory_ms
                        );
                    } else {
                        self.state.phase = Phase::AboveThreshold;
                        self.rise_started_at = Some(now);
                    }
                }
                false
            }
            Phase::AboveThreshold => {
                // A fall that arrives after the timeout still ends a plateau
                let rise_started = self.rise_started_at.unwrap_or(now);
                if now.saturating_sub(rise_started) >= self.params.plateau_timeout_ms {
                    self.state.phase = Phase::BelowThreshold;
                    self.rise_started_at = None;
                    self.armed = value < self.params.fall_threshold;
                    self.stats.plateaus_dropped += 1;
                    debug!(
                        "Signal above rise threshold since {}ms with no fall before {}ms, dropped as plateau",
                        rise_started, now
                    );
                    return false;
                }

                if value < self.params.fall_threshold {
                    self.accept(now);
                    return true;
                }
                false
            }
        }
    }

    /// Register one event without consulting the thresholds.
    ///
    /// The refractory lockout still applies, and any pending rise is discarded
    /// so the same movement cannot be counted again on its fall.
    pub fn trigger(&mut self, now: u64) -> bool {
        if self.in_refractory(now) {
            self.stats.manual_rejected += 1;
            debug!("Manual trigger at {}ms ignored, inside refractory window", now);
            return false;
        }
        self.stats.manual_accepted += 1;
        self.accept(now);
        true
    }

    pub fn reset_count(&mut self) {
        self.state = DetectorState::new(self.params.refractory_ms);
        self.rise_started_at = None;
        self.armed = true;
    }

    fn accept(&mut self, now: u64) {
        self.state.phase = Phase::BelowThreshold;
        self.state.last_event_timestamp = Some(now);
        self.state.count = self.state.count.saturating_add(1);
        self.rise_started_at = None;
        self.stats.events_accepted += 1;
    }

    fn in_refractory(&self, now: u64) -> bool {
        self.state
            .last_event_timestamp
            .is_some_and(|last| now.saturating_sub(last) < self.params.refractory_ms)
    }
}
