use crate::error::{JumpError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use tracing::{debug, info};

/// Active listener registration with the platform's accelerometer
#[derive(Debug)]
pub struct SensorRegistration {
    id: u64,
    sampling_rate_hz: u32,
}

impl SensorRegistration {
    pub fn new(id: u64, sampling_rate_hz: u32) -> Self {
        Self {
            id,
            sampling_rate_hz,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn sampling_rate_hz(&self) -> u32 {
        self.sampling_rate_hz
    }
}

/// Platform seam for accelerometer access
#[async_trait]
pub trait SensorProvider: Send + Sync {
    /// Register for samples; fails when the sensor or permission is missing
    async fn register(&self) -> Result<SensorRegistration>;

    async fn unregister(&self, registration: SensorRegistration);
}

/// In-process accelerometer provider whose availability can be toggled
pub struct SimulatedSensorProvider {
    available: AtomicBool,
    sampling_rate_hz: u32,
    next_id: AtomicU64,
    active: AtomicUsize,
}

impl SimulatedSensorProvider {
    pub fn new(sampling_rate_hz: u32) -> Self {
        Self {
            available: AtomicBool::new(true),
            sampling_rate_hz,
            next_id: AtomicU64::new(1),
            active: AtomicUsize::new(0),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Registrations currently held
    pub fn active_registrations(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

impl Default for SimulatedSensorProvider {
    fn default() -> Self {
        Self::new(100)
    }
}

#[async_trait]
impl SensorProvider for SimulatedSensorProvider {
    async fn register(&self) -> Result<SensorRegistration> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(JumpError::resource_unavailable(
                "accelerometer",
                "sensor is not available or permission was denied",
            ));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.active.fetch_add(1, Ordering::SeqCst);
        info!(
            "Registered accelerometer listener {} at {}Hz",
            id, self.sampling_rate_hz
        );
        Ok(SensorRegistration::new(id, self.sampling_rate_hz))
    }

    async fn unregister(&self, registration: SensorRegistration) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        debug!("Unregistered accelerometer listener {}", registration.id());
    }
}
