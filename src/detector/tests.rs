use super::*;
use crate::config::{CameraConfig, FrameSignal};
use crate::sample::{FrameDescriptor, SmoothedSignal};

fn scenario_params() -> ThresholdParams {
    ThresholdParams {
        rise_threshold: 1.8,
        fall_threshold: 1.2,
        refractory_ms: 300,
        plateau_timeout_ms: 1000,
    }
}

fn feed_all(detector: &mut SensorDetector, samples: &[(u64, f64)]) -> Vec<bool> {
    samples
        .iter()
        .map(|&(t, value)| detector.feed(&SmoothedSignal::new(value, t)))
        .collect()
}

fn camera_detector() -> CameraDetector {
    CameraDetector::from_config(&CameraConfig::default())
}

fn frame(t: u64, displacement: f64) -> FrameDescriptor {
    FrameDescriptor::new(displacement, 0.0, t)
}

#[test]
fn test_no_crossing_never_counts() {
    let mut detector = SensorDetector::new(scenario_params());
    let samples: Vec<(u64, f64)> = (0..500)
        .map(|i| (i * 10, 1.0 + 0.79 * ((i as f64) * 0.3).sin()))
        .collect();

    assert!(feed_all(&mut detector, &samples).iter().all(|emitted| !emitted));
    assert_eq!(detector.count(), 0);
    assert_eq!(detector.state().phase, Phase::BelowThreshold);
}

#[test]
fn test_single_spike_scenario() {
    let mut detector = SensorDetector::new(scenario_params());
    let emitted = feed_all(
        &mut detector,
        &[(0, 1.0), (100, 1.0), (200, 2.5), (300, 1.0), (400, 1.0)],
    );

    assert_eq!(emitted, vec![false, false, false, true, false]);
    assert_eq!(detector.count(), 1);
    assert_eq!(detector.state().last_event_timestamp, Some(300));
}

#[test]
fn test_rise_alone_does_not_emit() {
    let mut detector = SensorDetector::new(scenario_params());
    feed_all(&mut detector, &[(0, 1.0), (100, 2.5), (200, 2.0), (300, 1.5)]);

    assert_eq!(detector.count(), 0);
    assert_eq!(detector.state().phase, Phase::AboveThreshold);
}

#[test]
fn test_hysteresis_band_suppresses_chatter() {
    let mut detector = SensorDetector::new(scenario_params());
    // Oscillating around the rise threshold stays inside the band
    feed_all(
        &mut detector,
        &[
            (0, 1.79),
            (100, 1.81),
            (200, 1.79),
            (300, 1.81),
            (400, 1.5),
            (500, 1.81),
        ],
    );
    assert_eq!(detector.count(), 0);

    assert_eq!(feed_all(&mut detector, &[(600, 1.19)]), vec![true]);
    assert_eq!(detector.count(), 1);
}

#[test]
fn test_patterns_inside_refractory_count_once() {
    let mut detector = SensorDetector::new(scenario_params());
    feed_all(
        &mut detector,
        &[(0, 1.0), (100, 2.5), (200, 1.0), (300, 2.5), (400, 1.0)],
    );

    assert_eq!(detector.count(), 1);
    assert_eq!(detector.stats().refractory_lockouts, 1);
}

#[test]
fn test_patterns_outside_refractory_count_each() {
    let mut detector = SensorDetector::new(scenario_params());
    feed_all(
        &mut detector,
        &[(0, 1.0), (100, 2.5), (200, 1.0), (500, 2.5), (600, 1.0)],
    );

    assert_eq!(detector.count(), 2);
    assert_eq!(detector.stats().events_accepted, 2);
}

#[test]
fn test_bounce_outlasting_refractory_is_ignored() {
    let mut detector = SensorDetector::new(scenario_params());
    feed_all(
        &mut detector,
        &[
            (0, 1.0),
            (100, 2.5),
            (200, 1.0),
            // Vibration starts inside the window and carries past it
            (300, 2.5),
            (400, 2.5),
            (600, 2.5),
            (700, 1.0),
        ],
    );
    assert_eq!(detector.count(), 1);

    // Settled under the fall threshold, the next real jump counts
    feed_all(&mut detector, &[(900, 2.5), (1000, 1.0)]);
    assert_eq!(detector.count(), 2);
}

#[test]
fn test_plateau_is_dropped_without_emitting() {
    let mut detector = SensorDetector::new(scenario_params());
    let mut samples = vec![(0, 1.0)];
    samples.extend((1..=12).map(|i| (i * 100, 2.5)));
    samples.push((1300, 1.0));
    feed_all(&mut detector, &samples);

    assert_eq!(detector.count(), 0);
    assert_eq!(detector.stats().plateaus_dropped, 1);
    assert_eq!(detector.state().phase, Phase::BelowThreshold);

    feed_all(&mut detector, &[(1400, 2.5), (1500, 1.0)]);
    assert_eq!(detector.count(), 1);
}

#[test]
fn test_late_fall_after_timeout_is_a_plateau() {
    let mut detector = SensorDetector::new(ThresholdParams {
        plateau_timeout_ms: 1500,
        ..scenario_params()
    });

    // No samples between the rise and a fall well past the timeout
    assert_eq!(
        feed_all(&mut detector, &[(0, 2.5), (5000, 1.0)]),
        vec![false, false]
    );
    assert_eq!(detector.count(), 0);
    assert_eq!(detector.stats().plateaus_dropped, 1);

    // The late fall re-arms straight away
    assert_eq!(
        feed_all(&mut detector, &[(5100, 2.5), (5200, 1.0)]),
        vec![false, true]
    );
    assert_eq!(detector.count(), 1);
}

#[test]
fn test_camera_gap_does_not_count_stale_rise() {
    let mut detector = camera_detector();
    assert!(!detector.feed(&frame(0, 20.0)));
    assert!(!detector.feed(&frame(10_000, 0.0)));
    assert_eq!(detector.count(), 0);
    assert_eq!(detector.stats().plateaus_dropped, 1);
}

#[test]
fn test_machine_arming() {
    let mut machine = HysteresisMachine::new(scenario_params());
    assert!(machine.is_armed(0));

    machine.step(2.5, 0);
    assert!(machine.step(1.0, 100));
    assert!(!machine.is_armed(200));
    assert!(machine.is_armed(400));

    // Plateau still above the fall threshold stays disarmed until it drops
    machine.step(2.5, 500);
    assert!(!machine.step(2.5, 1600));
    assert!(!machine.is_armed(1700));
    machine.step(1.0, 1700);
    assert!(machine.is_armed(1800));
}

#[test]
fn test_reset_and_replay_reproduces_count() {
    let sequence = [
        (0, 1.0),
        (100, 2.5),
        (200, 1.0),
        (300, 2.5),
        (400, 1.0),
        (700, 2.6),
        (800, 1.1),
        (1200, 2.0),
        (1300, 0.9),
    ];
    let mut detector = SensorDetector::new(scenario_params());
    feed_all(&mut detector, &sequence);
    let first = detector.count();
    assert_eq!(first, 3);

    for _ in 0..3 {
        detector.reset_count();
        assert_eq!(detector.count(), 0);
        assert_eq!(detector.state().last_event_timestamp, None);
        feed_all(&mut detector, &sequence);
        assert_eq!(detector.count(), first);
    }
}

#[test]
fn test_reset_drops_pending_rise() {
    let mut detector = SensorDetector::new(scenario_params());
    feed_all(&mut detector, &[(0, 1.0), (100, 2.5)]);
    assert_eq!(detector.state().phase, Phase::AboveThreshold);

    detector.reset_count();
    assert_eq!(detector.state().phase, Phase::BelowThreshold);
    feed_all(&mut detector, &[(200, 1.0)]);
    assert_eq!(detector.count(), 0);
}

#[test]
fn test_camera_detects_upward_displacement() {
    let mut detector = camera_detector();
    let frames = [
        frame(0, 0.5),
        frame(33, 15.0),
        frame(66, 8.0),
        frame(100, 1.0),
        frame(133, -14.0),
        frame(166, 0.0),
    ];
    let emitted: Vec<bool> = frames.iter().map(|f| detector.feed(f)).collect();

    assert_eq!(emitted, vec![false, false, false, true, false, false]);
    assert_eq!(detector.count(), 1);
}

#[test]
fn test_camera_luminance_signal() {
    let mut config = CameraConfig::default();
    config.signal = FrameSignal::LuminanceDelta;
    let mut detector = CameraDetector::from_config(&config);
    assert_eq!(detector.signal(), FrameSignal::LuminanceDelta);

    // Large displacement is ignored when luminance drives detection
    detector.feed(&FrameDescriptor::new(30.0, 1.0, 0));
    detector.feed(&FrameDescriptor::new(0.0, 0.0, 33));
    assert_eq!(detector.count(), 0);

    detector.feed(&FrameDescriptor::new(0.0, 20.0, 66));
    detector.feed(&FrameDescriptor::new(0.0, 2.0, 100));
    assert_eq!(detector.count(), 1);
}

#[test]
fn test_manual_trigger_respects_refractory() {
    let mut detector = camera_detector();
    assert_eq!(detector.params().refractory_ms, 400);

    assert!(detector.trigger_manual(1000));
    assert!(!detector.trigger_manual(1100));

    // Detected rise inside the window is locked out as well
    detector.feed(&frame(1200, 20.0));
    detector.feed(&frame(1233, 0.0));
    assert_eq!(detector.count(), 1);

    assert!(detector.trigger_manual(1400));
    assert_eq!(detector.count(), 2);
    assert_eq!(detector.stats().manual_accepted, 2);
    assert_eq!(detector.stats().manual_rejected, 1);
}

#[test]
fn test_manual_trigger_discards_pending_rise() {
    let mut detector = camera_detector();
    detector.feed(&frame(0, 20.0));
    assert_eq!(detector.state().phase, Phase::AboveThreshold);

    assert!(detector.trigger_manual(33));
    assert!(!detector.feed(&frame(66, 0.0)));
    assert_eq!(detector.count(), 1);
}

#[test]
fn test_strategies_share_semantics() {
    let params = scenario_params();
    let mut sensor = SensorDetector::new(params);
    let mut camera = CameraDetector::new(params, FrameSignal::VerticalDisplacement);

    let values = [
        (0, 1.0),
        (100, 2.5),
        (200, 1.0),
        (250, 2.5),
        (300, 1.0),
        (600, 3.0),
        (650, 1.9),
        (700, 0.0),
    ];
    for &(t, value) in &values {
        let a = sensor.feed(&SmoothedSignal::new(value, t));
        let b = camera.feed(&FrameDescriptor::new(value, 0.0, t));
        assert_eq!(a, b, "strategies diverged at {}ms", t);
    }
    assert_eq!(sensor.state(), camera.state());
    assert_eq!(sensor.count(), 2);
}
