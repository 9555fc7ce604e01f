mod device;
mod manager;
mod simulated;
#[cfg(test)]
mod tests;

pub use device::{CameraDeviceInfo, CameraFacing, CameraHandle, CameraProvider};
pub use manager::CameraResourceManager;
pub use simulated::SimulatedCameraProvider;
