use super::device::{CameraDeviceInfo, CameraHandle, CameraProvider};
use crate::error::{JumpError, Result};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Owns the single open camera handle of a session.
///
/// At most one handle is open at any time: switching devices releases the
/// current handle before opening the next one. A failed switch either rolls
/// back to the previous device or leaves no handle at all.
pub struct CameraResourceManager {
    provider: Arc<dyn CameraProvider>,
    devices: Vec<CameraDeviceInfo>,
    current: Option<CameraHandle>,
}

impl CameraResourceManager {
    /// Enumerate devices; fails with `NoCameraAvailable` when none are present
    pub async fn new(provider: Arc<dyn CameraProvider>) -> Result<Self> {
        let devices = provider.enumerate().await?;
        if devices.is_empty() {
            error!("Camera enumeration returned no devices");
            return Err(JumpError::NoCameraAvailable);
        }

        info!(
            "Enumerated {} camera device(s): {}",
            devices.len(),
            devices
                .iter()
                .map(|d| format!("{}={}", d.index, d.name))
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self {
            provider,
            devices,
            current: None,
        })
    }

    pub fn devices(&self) -> &[CameraDeviceInfo] {
        &self.devices
    }

    pub fn current(&self) -> Option<&CameraHandle> {
        self.current.as_ref()
    }

    pub fn current_device(&self) -> Option<u32> {
        self.current.as_ref().map(CameraHandle::device_index)
    }

    pub fn is_acquired(&self) -> bool {
        self.current.is_some()
    }

    fn is_enumerated(&self, device_index: u32) -> bool {
        self.devices.iter().any(|d| d.index == device_index)
    }

    /// Open `device_index` when no handle is held
    pub async fn acquire(&mut self, device_index: u32) -> Result<&CameraHandle> {
        if let Some(held) = self.current_device() {
            if held == device_index {
                debug!("Camera device {} already acquired", device_index);
                return self.current.as_ref().ok_or(JumpError::NoCameraAvailable);
            }
            return Err(JumpError::resource_unavailable(
                format!("camera device {}", device_index),
                format!("camera device {} is still held", held),
            ));
        }

        if !self.is_enumerated(device_index) {
            return Err(JumpError::resource_unavailable(
                format!("camera device {}", device_index),
                "device was not enumerated",
            ));
        }

        let handle = self.provider.open(device_index).await?;
        info!(
            "Acquired camera device {} (handle {})",
            device_index,
            handle.id()
        );
        Ok(&*self.current.insert(handle))
    }

    /// Release the current handle, then open `device_index`.
    ///
    /// On failure the previous device is reopened if possible; the error
    /// reports whether that rollback succeeded.
    pub async fn switch_to(&mut self, device_index: u32) -> Result<&CameraHandle> {
        if self.current_device() == Some(device_index) {
            debug!("Camera device {} already active, nothing to switch", device_index);
            return self.current.as_ref().ok_or(JumpError::NoCameraAvailable);
        }

        if !self.is_enumerated(device_index) {
            return Err(JumpError::AcquisitionFailed {
                device: device_index,
                details: "device was not enumerated".to_string(),
                rolled_back: self.current.is_some(),
            });
        }

        let previous = self.current_device();
        info!(
            "Switching camera from {:?} to device {}",
            previous, device_index
        );
        self.release().await;

        let open_error = match self.provider.open(device_index).await {
            Ok(handle) => {
                info!(
                    "Acquired camera device {} (handle {})",
                    device_index,
                    handle.id()
                );
                return Ok(&*self.current.insert(handle));
            }
            Err(e) => e,
        };

        error!(
            "Failed to open camera device {}: {}",
            device_index, open_error
        );

        let Some(previous) = previous else {
            return Err(JumpError::AcquisitionFailed {
                device: device_index,
                details: open_error.to_string(),
                rolled_back: false,
            });
        };

        match self.provider.open(previous).await {
            Ok(handle) => {
                warn!("Rolled back to camera device {}", previous);
                self.current = Some(handle);
                Err(JumpError::AcquisitionFailed {
                    device: device_index,
                    details: open_error.to_string(),
                    rolled_back: true,
                })
            }
            Err(rollback_error) => {
                error!(
                    "Rollback to camera device {} failed: {}",
                    previous, rollback_error
                );
                Err(JumpError::AcquisitionFailed {
                    device: device_index,
                    details: format!(
                        "{}; rollback to device {} failed: {}",
                        open_error, previous, rollback_error
                    ),
                    rolled_back: false,
                })
            }
        }
    }

    /// Release the current handle, if any; returns the released device index
    pub async fn release(&mut self) -> Option<u32> {
        let handle = self.current.take()?;
        let device_index = handle.device_index();
        let id = handle.id();
        let held_for = handle.opened_at().elapsed();

        // The handle is gone from this manager regardless of what the
        // platform reports.
        if let Err(e) = self.provider.close(handle).await {
            warn!("Error closing camera device {}: {}", device_index, e);
        }
        info!(
            "Released camera device {} (handle {}) after {:?}",
            device_index, id, held_for
        );
        Some(device_index)
    }
}
