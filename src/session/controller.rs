use super::types::{Lifecycle, SessionMetrics, SessionState};
use crate::camera::{CameraProvider, CameraResourceManager};
use crate::config::JumpConfig;
use crate::detector::{CameraDetector, DetectorState, DetectorStats, EventDetector, SensorDetector};
use crate::error::{JumpError, Result};
use crate::events::{
    CountCause, CountListener, CountListeners, CountUpdate, EventBus, ListenerId, SessionEvent,
    TriggerSource,
};
use crate::preprocess::SignalPreprocessor;
use crate::sample::{FrameDescriptor, MotionSample, Strategy};
use crate::sensor::{SensorProvider, SensorRegistration};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

/// Detector owned by a session, fixed by its strategy
enum ActiveDetector {
    Sensor {
        preprocessor: SignalPreprocessor,
        detector: SensorDetector,
    },
    Camera(CameraDetector),
}

impl ActiveDetector {
    fn state(&self) -> &DetectorState {
        match self {
            ActiveDetector::Sensor { detector, .. } => detector.state(),
            ActiveDetector::Camera(detector) => detector.state(),
        }
    }

    fn stats(&self) -> &DetectorStats {
        match self {
            ActiveDetector::Sensor { detector, .. } => detector.stats(),
            ActiveDetector::Camera(detector) => detector.stats(),
        }
    }

    fn reset_count(&mut self) {
        match self {
            ActiveDetector::Sensor {
                preprocessor,
                detector,
            } => {
                preprocessor.reset();
                detector.reset_count();
            }
            ActiveDetector::Camera(detector) => detector.reset_count(),
        }
    }
}

/// Platform resources backing a session
enum DeviceResources {
    Sensor {
        provider: Arc<dyn SensorProvider>,
        registration: Option<SensorRegistration>,
    },
    Camera {
        provider: Arc<dyn CameraProvider>,
        manager: Option<CameraResourceManager>,
        device_index: u32,
    },
}

impl DeviceResources {
    async fn acquire(&mut self) -> Result<()> {
        match self {
            DeviceResources::Sensor {
                provider,
                registration,
            } => {
                if registration.is_none() {
                    *registration = Some(provider.register().await?);
                }
                Ok(())
            }
            DeviceResources::Camera {
                provider,
                manager,
                device_index,
            } => {
                if manager.is_none() {
                    *manager = Some(CameraResourceManager::new(Arc::clone(provider)).await?);
                }
                match manager.as_mut() {
                    Some(manager) => manager.acquire(*device_index).await.map(|_| ()),
                    None => Err(JumpError::NoCameraAvailable),
                }
            }
        }
    }

    async fn release(&mut self) {
        match self {
            DeviceResources::Sensor {
                provider,
                registration,
            } => {
                if let Some(registration) = registration.take() {
                    provider.unregister(registration).await;
                }
            }
            DeviceResources::Camera { manager, .. } => {
                if let Some(manager) = manager.as_mut() {
                    manager.release().await;
                }
            }
        }
    }

    async fn switch_camera(&mut self, target: u32) -> Result<u32> {
        match self {
            DeviceResources::Camera {
                manager,
                device_index,
                ..
            } => {
                let manager = manager.as_mut().ok_or(JumpError::NoCameraAvailable)?;
                let active = manager.switch_to(target).await?.device_index();
                *device_index = active;
                Ok(active)
            }
            DeviceResources::Sensor { .. } => Err(JumpError::StrategyMismatch {
                strategy: Strategy::Sensor,
                operation: "switch_camera",
            }),
        }
    }

    /// Device to open on the next acquisition
    fn set_preferred_device(&mut self, target: u32) {
        if let DeviceResources::Camera { device_index, .. } = self {
            *device_index = target;
        }
    }

    fn active_device(&self) -> Option<u32> {
        match self {
            DeviceResources::Camera { manager, .. } => {
                manager.as_ref().and_then(CameraResourceManager::current_device)
            }
            DeviceResources::Sensor { .. } => None,
        }
    }
}

struct SessionInner {
    lifecycle: Lifecycle,
    active_device: Option<u32>,
    detector: ActiveDetector,
    metrics: SessionMetrics,
}

enum FeedOutcome {
    Quiet,
    Rejected(String),
    Jump(CountUpdate),
}

enum SwitchPlan {
    Deferred,
    Swap { resume_to: Lifecycle },
}

/// Owns one detection session: lifecycle, device resources, detector and
/// the live jump count.
///
/// Input is fed synchronously from a single producer. Lifecycle operations
/// that touch devices are async and serialised against each other; a device
/// switch holds the session in `SwitchingDevice`, during which input is
/// ignored rather than rejected.
pub struct SessionController {
    id: Uuid,
    strategy: Strategy,
    inner: Mutex<SessionInner>,
    resources: tokio::sync::Mutex<DeviceResources>,
    listeners: Mutex<CountListeners>,
    event_bus: EventBus,
}

impl SessionController {
    /// Session driven by accelerometer samples
    pub fn with_sensor(config: &JumpConfig, provider: Arc<dyn SensorProvider>) -> Self {
        Self::new(
            Strategy::Sensor,
            config.session.event_bus_capacity,
            ActiveDetector::Sensor {
                preprocessor: SignalPreprocessor::new(&config.sensor),
                detector: SensorDetector::from_config(&config.sensor),
            },
            DeviceResources::Sensor {
                provider,
                registration: None,
            },
        )
    }

    /// Session driven by camera frame descriptors
    pub fn with_camera(config: &JumpConfig, provider: Arc<dyn CameraProvider>) -> Self {
        Self::new(
            Strategy::Camera,
            config.session.event_bus_capacity,
            ActiveDetector::Camera(CameraDetector::from_config(&config.camera)),
            DeviceResources::Camera {
                provider,
                manager: None,
                device_index: config.camera.device_index,
            },
        )
    }

    fn new(
        strategy: Strategy,
        event_bus_capacity: usize,
        detector: ActiveDetector,
        resources: DeviceResources,
    ) -> Self {
        let id = Uuid::new_v4();
        debug!(session = %id, "Created {:?} detection session", strategy);

        Self {
            id,
            strategy,
            inner: Mutex::new(SessionInner {
                lifecycle: Lifecycle::Idle,
                active_device: None,
                detector,
                metrics: SessionMetrics::default(),
            }),
            resources: tokio::sync::Mutex::new(resources),
            listeners: Mutex::new(CountListeners::default()),
            event_bus: EventBus::new(event_bus_capacity),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.inner.lock().lifecycle
    }

    pub fn count(&self) -> u32 {
        self.inner.lock().detector.state().count
    }

    pub fn state(&self) -> SessionState {
        let inner = self.inner.lock();
        SessionState {
            lifecycle: inner.lifecycle,
            strategy: self.strategy,
            count: inner.detector.state().count,
        }
    }

    pub fn detector_state(&self) -> DetectorState {
        *self.inner.lock().detector.state()
    }

    /// Camera device currently held, if any
    pub fn active_device(&self) -> Option<u32> {
        self.inner.lock().active_device
    }

    pub fn metrics(&self) -> SessionMetrics {
        let inner = self.inner.lock();
        SessionMetrics {
            detector: *inner.detector.stats(),
            ..inner.metrics.clone()
        }
    }

    /// Subscribe to session events on the broadcast bus
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_bus.subscribe()
    }

    /// Register a synchronous count listener
    pub fn add_listener<L: CountListener + 'static>(&self, listener: L) -> ListenerId {
        self.listeners.lock().add(Arc::new(listener))
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.lock().remove(id)
    }

    /// Acquire the strategy's device resources: `Idle -> Initializing`.
    ///
    /// On failure the session stays `Idle` and may be initialized again.
    pub async fn initialize(&self) -> Result<()> {
        let mut resources = self.resources.lock().await;
        self.expect_lifecycle("initialize", &[Lifecycle::Idle])?;

        info!(session = %self.id, "Initializing {:?} detection session", self.strategy);
        // Acquired before leaving Idle so a failure needs no rollback. The
        // resources lock is held throughout, so no other operation can see
        // an Idle session holding a handle.
        if let Err(e) = resources.acquire().await {
            error!(session = %self.id, "Failed to initialize session: {}", e);
            return Err(e);
        }

        self.transition(
            "initialize",
            &[Lifecycle::Idle],
            Lifecycle::Initializing,
            resources.active_device(),
        )?;
        Ok(())
    }

    /// Begin routing input to the detector.
    ///
    /// Resuming from `Paused` re-acquires the resources released by `pause`.
    pub async fn start(&self) -> Result<()> {
        let mut resources = self.resources.lock().await;
        let current = self.expect_lifecycle(
            "start",
            &[Lifecycle::Initializing, Lifecycle::Paused, Lifecycle::Running],
        )?;

        if current == Lifecycle::Running {
            warn!(session = %self.id, "Detection session is already running");
            return Ok(());
        }

        if current == Lifecycle::Paused {
            if let Err(e) = resources.acquire().await {
                error!(session = %self.id, "Failed to resume session: {}", e);
                return Err(e);
            }
        }

        self.transition("start", &[current], Lifecycle::Running, resources.active_device())?;
        info!(session = %self.id, "Detection session running");
        Ok(())
    }

    /// `Running -> Paused`; count and detector state are kept
    pub async fn pause(&self) -> Result<()> {
        // Fail fast instead of queueing behind an in-flight device switch
        self.expect_lifecycle("pause", &[Lifecycle::Running])?;
        let mut resources = self.resources.lock().await;
        self.transition("pause", &[Lifecycle::Running], Lifecycle::Paused, None)?;
        resources.release().await;
        Ok(())
    }

    /// Return to `Idle`, releasing devices; count and detector state are kept
    pub async fn stop(&self) -> Result<()> {
        let stoppable = [
            Lifecycle::Idle,
            Lifecycle::Initializing,
            Lifecycle::Running,
            Lifecycle::Paused,
        ];
        self.expect_lifecycle("stop", &stoppable)?;
        let mut resources = self.resources.lock().await;
        if self.expect_lifecycle("stop", &stoppable)? == Lifecycle::Idle {
            debug!(session = %self.id, "Session already idle");
            return Ok(());
        }

        self.transition(
            "stop",
            &[Lifecycle::Initializing, Lifecycle::Running, Lifecycle::Paused],
            Lifecycle::Idle,
            None,
        )?;
        resources.release().await;
        Ok(())
    }

    /// Release everything and enter the terminal `Disposed` state.
    ///
    /// Input stops being accepted before this awaits anything.
    pub async fn dispose(&self) -> Result<()> {
        {
            let mut inner = self.inner.lock();
            if inner.lifecycle == Lifecycle::Disposed {
                return Err(JumpError::AlreadyDisposed);
            }
            self.set_lifecycle(&mut inner, Lifecycle::Disposed, None);
        }

        let mut resources = self.resources.lock().await;
        resources.release().await;
        info!(session = %self.id, "Detection session disposed at count {}", self.count());
        Ok(())
    }

    /// Zero the count and return the detector to `BelowThreshold`.
    ///
    /// Valid in every state except `Disposed`; device resources are untouched.
    pub fn reset_count(&self) -> Result<()> {
        let previous = {
            let mut inner = self.inner.lock();
            if inner.lifecycle == Lifecycle::Disposed {
                return Err(JumpError::AlreadyDisposed);
            }
            let previous = inner.detector.state().count;
            inner.detector.reset_count();
            previous
        };

        info!(session = %self.id, "Count reset from {}", previous);
        self.notify(&CountUpdate {
            session_id: self.id,
            count: 0,
            cause: CountCause::Reset,
            timestamp_millis: None,
        });
        self.event_bus.publish(SessionEvent::CountReset {
            session_id: self.id,
            previous,
        });
        Ok(())
    }

    /// Switch the physical camera without losing the count.
    ///
    /// While a handle is held the session passes through `SwitchingDevice`
    /// and returns to its previous state. In `Idle`/`Paused` the device is
    /// only recorded for the next acquisition. If the switch fails and no
    /// handle could be restored the session drops to `Idle`.
    pub async fn switch_camera(&self, device_index: u32) -> Result<()> {
        if self.strategy != Strategy::Camera {
            return Err(JumpError::StrategyMismatch {
                strategy: self.strategy,
                operation: "switch_camera",
            });
        }

        let mut resources = self.resources.lock().await;

        let plan = {
            let mut inner = self.inner.lock();
            let lifecycle = inner.lifecycle;
            match lifecycle {
                Lifecycle::Disposed => return Err(JumpError::AlreadyDisposed),
                Lifecycle::Idle | Lifecycle::Paused => SwitchPlan::Deferred,
                Lifecycle::Initializing | Lifecycle::Running => {
                    let active = inner.active_device;
                    self.set_lifecycle(&mut inner, Lifecycle::SwitchingDevice, active);
                    SwitchPlan::Swap {
                        resume_to: lifecycle,
                    }
                }
                Lifecycle::SwitchingDevice => {
                    return Err(JumpError::InvalidTransition {
                        from: lifecycle,
                        operation: "switch_camera",
                    })
                }
            }
        };

        let resume_to = match plan {
            SwitchPlan::Deferred => {
                resources.set_preferred_device(device_index);
                info!(
                    session = %self.id,
                    "Camera device {} will be used on next acquisition", device_index
                );
                return Ok(());
            }
            SwitchPlan::Swap { resume_to } => resume_to,
        };

        let result = resources.switch_camera(device_index).await;
        let active = resources.active_device();

        let mut inner = self.inner.lock();
        if inner.lifecycle == Lifecycle::Disposed {
            // dispose() is waiting on the resources lock and releases the handle
            return Err(JumpError::AlreadyDisposed);
        }

        match result {
            Ok(device) => {
                self.set_lifecycle(&mut inner, resume_to, active);
                drop(inner);
                self.event_bus.publish(SessionEvent::DeviceSwitched {
                    session_id: self.id,
                    device_index: device,
                });
                Ok(())
            }
            Err(e) => {
                let next = if active.is_some() {
                    resume_to
                } else {
                    Lifecycle::Idle
                };
                error!(
                    session = %self.id,
                    "Camera switch to device {} failed, session is now {:?}: {}",
                    device_index, next, e
                );
                self.set_lifecycle(&mut inner, next, active);
                Err(e)
            }
        }
    }

    /// Feed one accelerometer sample; true when it completed a jump.
    ///
    /// Malformed samples are reported and skipped without affecting the count.
    pub fn feed_sample(&self, sample: &MotionSample) -> Result<bool> {
        let outcome = {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;
            Self::ensure_not_disposed(inner)?;

            let ActiveDetector::Sensor {
                preprocessor,
                detector,
            } = &mut inner.detector
            else {
                return Err(JumpError::StrategyMismatch {
                    strategy: self.strategy,
                    operation: "feed_sample",
                });
            };

            if inner.lifecycle != Lifecycle::Running {
                inner.metrics.inputs_ignored += 1;
                trace!(
                    "Sample at {}ms ignored while {:?}",
                    sample.timestamp_millis,
                    inner.lifecycle
                );
                return Ok(false);
            }

            match sample.validate() {
                Err(e) => {
                    inner.metrics.inputs_malformed += 1;
                    FeedOutcome::Rejected(e.to_string())
                }
                Ok(()) => {
                    inner.metrics.inputs_processed += 1;
                    let signal = preprocessor.process(sample);
                    if detector.feed(&signal) {
                        FeedOutcome::Jump(self.jump_update(
                            detector.count(),
                            sample.timestamp_millis,
                            TriggerSource::Sensor,
                        ))
                    } else {
                        FeedOutcome::Quiet
                    }
                }
            }
        };

        Ok(self.dispatch(outcome))
    }

    /// Feed one camera frame descriptor; true when it completed a jump
    pub fn feed_frame(&self, frame: &FrameDescriptor) -> Result<bool> {
        let outcome = {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;
            Self::ensure_not_disposed(inner)?;

            let ActiveDetector::Camera(detector) = &mut inner.detector else {
                return Err(JumpError::StrategyMismatch {
                    strategy: self.strategy,
                    operation: "feed_frame",
                });
            };

            if inner.lifecycle != Lifecycle::Running {
                inner.metrics.inputs_ignored += 1;
                trace!(
                    "Frame at {}ms ignored while {:?}",
                    frame.timestamp_millis,
                    inner.lifecycle
                );
                return Ok(false);
            }

            match frame.validate() {
                Err(e) => {
                    inner.metrics.inputs_malformed += 1;
                    FeedOutcome::Rejected(e.to_string())
                }
                Ok(()) => {
                    inner.metrics.inputs_processed += 1;
                    if detector.feed(frame) {
                        FeedOutcome::Jump(self.jump_update(
                            detector.count(),
                            frame.timestamp_millis,
                            TriggerSource::Camera,
                        ))
                    } else {
                        FeedOutcome::Quiet
                    }
                }
            }
        };

        Ok(self.dispatch(outcome))
    }

    /// Operator-initiated jump for the camera strategy.
    ///
    /// Bypasses the thresholds but not the refractory lockout.
    pub fn trigger_manual(&self, timestamp_millis: u64) -> Result<bool> {
        let outcome = {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;
            Self::ensure_not_disposed(inner)?;

            let ActiveDetector::Camera(detector) = &mut inner.detector else {
                return Err(JumpError::StrategyMismatch {
                    strategy: self.strategy,
                    operation: "trigger_manual",
                });
            };

            if inner.lifecycle != Lifecycle::Running {
                inner.metrics.inputs_ignored += 1;
                debug!(
                    "Manual trigger at {}ms ignored while {:?}",
                    timestamp_millis, inner.lifecycle
                );
                return Ok(false);
            }

            if detector.trigger_manual(timestamp_millis) {
                FeedOutcome::Jump(self.jump_update(
                    detector.count(),
                    timestamp_millis,
                    TriggerSource::Manual,
                ))
            } else {
                FeedOutcome::Quiet
            }
        };

        Ok(self.dispatch(outcome))
    }

    fn jump_update(&self, count: u32, timestamp_millis: u64, source: TriggerSource) -> CountUpdate {
        CountUpdate {
            session_id: self.id,
            count,
            cause: CountCause::Jump(source),
            timestamp_millis: Some(timestamp_millis),
        }
    }

    /// Runs after the session lock is released so listeners may query the
    /// controller.
    fn dispatch(&self, outcome: FeedOutcome) -> bool {
        match outcome {
            FeedOutcome::Quiet => false,
            FeedOutcome::Rejected(reason) => {
                self.event_bus.publish(SessionEvent::InputRejected {
                    session_id: self.id,
                    reason,
                });
                false
            }
            FeedOutcome::Jump(update) => {
                self.notify(&update);
                if let (CountCause::Jump(source), Some(timestamp_millis)) =
                    (update.cause, update.timestamp_millis)
                {
                    self.event_bus.publish(SessionEvent::JumpDetected {
                        session_id: self.id,
                        count: update.count,
                        timestamp_millis,
                        source,
                    });
                }
                true
            }
        }
    }

    fn notify(&self, update: &CountUpdate) {
        let listeners = self.listeners.lock().snapshot();
        for listener in listeners {
            listener.on_count(update);
        }
    }

    fn ensure_not_disposed(inner: &SessionInner) -> Result<()> {
        if inner.lifecycle == Lifecycle::Disposed {
            return Err(JumpError::AlreadyDisposed);
        }
        Ok(())
    }

    fn expect_lifecycle(&self, operation: &'static str, allowed: &[Lifecycle]) -> Result<Lifecycle> {
        let lifecycle = self.inner.lock().lifecycle;
        Self::check_lifecycle(lifecycle, operation, allowed)
    }

    fn check_lifecycle(
        lifecycle: Lifecycle,
        operation: &'static str,
        allowed: &[Lifecycle],
    ) -> Result<Lifecycle> {
        if lifecycle == Lifecycle::Disposed {
            return Err(JumpError::AlreadyDisposed);
        }
        if !allowed.contains(&lifecycle) {
            return Err(JumpError::InvalidTransition {
                from: lifecycle,
                operation,
            });
        }
        Ok(lifecycle)
    }

    /// Check and move the lifecycle under one lock acquisition
    fn transition(
        &self,
        operation: &'static str,
        allowed: &[Lifecycle],
        to: Lifecycle,
        active_device: Option<u32>,
    ) -> Result<Lifecycle> {
        let mut inner = self.inner.lock();
        let from = Self::check_lifecycle(inner.lifecycle, operation, allowed)?;
        self.set_lifecycle(&mut inner, to, active_device);
        Ok(from)
    }

    fn set_lifecycle(&self, inner: &mut SessionInner, to: Lifecycle, active_device: Option<u32>) {
        let from = inner.lifecycle;
        inner.lifecycle = to;
        inner.active_device = active_device;
        if from != to {
            info!(session = %self.id, "Session lifecycle {:?} -> {:?}", from, to);
            self.event_bus.publish(SessionEvent::LifecycleChanged {
                session_id: self.id,
                from,
                to,
            });
        }
    }
}
