use super::device::{CameraDeviceInfo, CameraFacing, CameraHandle, CameraProvider};
use crate::error::{JumpError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// In-process camera provider.
///
/// Models hardware that can only have one device open at a time. Devices can
/// be marked as failing to exercise acquisition errors, and an artificial
/// acquisition delay makes the switching window observable.
pub struct SimulatedCameraProvider {
    devices: Vec<CameraDeviceInfo>,
    state: Mutex<SimulatedState>,
    next_handle_id: AtomicU64,
    acquire_delay: Option<Duration>,
}

#[derive(Default)]
struct SimulatedState {
    failing: HashSet<u32>,
    open: HashSet<u64>,
    opens: u64,
    peak_open: usize,
}

impl SimulatedCameraProvider {
    /// Provider with `count` devices: back, front, then external cameras
    pub fn new(count: u32) -> Self {
        Self::with_indices(0..count)
    }

    /// Provider exposing exactly the given device indices, named as in [`Self::new`]
    pub fn with_indices<I: IntoIterator<Item = u32>>(indices: I) -> Self {
        let devices = indices
            .into_iter()
            .map(|index| {
                let (name, facing) = match index {
                    0 => ("back".to_string(), CameraFacing::Back),
                    1 => ("front".to_string(), CameraFacing::Front),
                    n => (format!("external-{}", n), CameraFacing::External),
                };
                CameraDeviceInfo {
                    index,
                    name,
                    facing,
                }
            })
            .collect();
        Self::with_devices(devices)
    }

    pub fn with_devices(devices: Vec<CameraDeviceInfo>) -> Self {
        Self {
            devices,
            state: Mutex::new(SimulatedState::default()),
            next_handle_id: AtomicU64::new(1),
            acquire_delay: None,
        }
    }

    pub fn with_acquire_delay(mut self, delay: Duration) -> Self {
        self.acquire_delay = Some(delay);
        self
    }

    /// Make future opens of `device_index` fail
    pub fn fail_device(&self, device_index: u32) {
        self.state.lock().failing.insert(device_index);
    }

    pub fn restore_device(&self, device_index: u32) {
        self.state.lock().failing.remove(&device_index);
    }

    /// Handles currently open
    pub fn open_count(&self) -> usize {
        self.state.lock().open.len()
    }

    /// Highest number of handles ever open at once
    pub fn peak_open_count(&self) -> usize {
        self.state.lock().peak_open
    }

    /// Successful opens so far
    pub fn total_opens(&self) -> u64 {
        self.state.lock().opens
    }
}

#[async_trait]
impl CameraProvider for SimulatedCameraProvider {
    async fn enumerate(&self) -> Result<Vec<CameraDeviceInfo>> {
        Ok(self.devices.clone())
    }

    async fn open(&self, device_index: u32) -> Result<CameraHandle> {
        if let Some(delay) = self.acquire_delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        if !self.devices.iter().any(|d| d.index == device_index) {
            return Err(JumpError::resource_unavailable(
                format!("camera device {}", device_index),
                "no such device",
            ));
        }
        if state.failing.contains(&device_index) {
            return Err(JumpError::resource_unavailable(
                format!("camera device {}", device_index),
                "device refused to open",
            ));
        }
        if !state.open.is_empty() {
            return Err(JumpError::resource_unavailable(
                format!("camera device {}", device_index),
                "another camera device is already open",
            ));
        }

        let id = self.next_handle_id.fetch_add(1, Ordering::Relaxed);
        state.open.insert(id);
        state.opens += 1;
        state.peak_open = state.peak_open.max(state.open.len());
        debug!("Simulated camera device {} opened (handle {})", device_index, id);

        Ok(CameraHandle::new(device_index, id))
    }

    async fn close(&self, handle: CameraHandle) -> Result<()> {
        let mut state = self.state.lock();
        if !state.open.remove(&handle.id()) {
            return Err(JumpError::system(format!(
                "camera handle {} was not open",
                handle.id()
            )));
        }
        debug!(
            "Simulated camera device {} closed (handle {})",
            handle.device_index(),
            handle.id()
        );
        Ok(())
    }
}
