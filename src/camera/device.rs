use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Which way a camera device points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraFacing {
    Front,
    Back,
    External,
}

/// One enumerated camera device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraDeviceInfo {
    pub index: u32,
    pub name: String,
    pub facing: CameraFacing,
}

/// Exclusive claim on one physical camera device.
///
/// Not `Clone`: it is owned by exactly one resource manager and handed back
/// to the provider by value when released.
#[derive(Debug)]
pub struct CameraHandle {
    device_index: u32,
    id: u64,
    opened_at: Instant,
}

impl CameraHandle {
    pub fn new(device_index: u32, id: u64) -> Self {
        Self {
            device_index,
            id,
            opened_at: Instant::now(),
        }
    }

    pub fn device_index(&self) -> u32 {
        self.device_index
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn opened_at(&self) -> Instant {
        self.opened_at
    }
}

/// Platform seam for camera enumeration and acquisition
#[async_trait]
pub trait CameraProvider: Send + Sync {
    /// List the devices currently present
    async fn enumerate(&self) -> Result<Vec<CameraDeviceInfo>>;

    /// Open a device; may suspend while the platform grants access
    async fn open(&self, device_index: u32) -> Result<CameraHandle>;

    /// Return a handle to the platform
    async fn close(&self, handle: CameraHandle) -> Result<()>;
}
