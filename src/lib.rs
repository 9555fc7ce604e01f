pub mod camera;
pub mod config;
pub mod detector;
pub mod error;
pub mod events;
pub mod preprocess;
pub mod replay;
pub mod sample;
pub mod sensor;
pub mod session;

pub use camera::{
    CameraDeviceInfo, CameraFacing, CameraHandle, CameraProvider, CameraResourceManager,
    SimulatedCameraProvider,
};
pub use config::{CameraConfig, FrameSignal, JumpConfig, SensorConfig, SessionConfig};
pub use detector::{
    CameraDetector, DetectorState, DetectorStats, EventDetector, HysteresisMachine, Phase,
    SensorDetector, ThresholdParams,
};
pub use error::{JumpError, Result};
pub use events::{
    CountCause, CountListener, CountUpdate, EventBus, ListenerId, SessionEvent, TriggerSource,
};
pub use preprocess::SignalPreprocessor;
pub use replay::{RecordedInput, ReplaySummary};
pub use sample::{FrameDescriptor, MotionSample, SmoothedSignal, Strategy};
pub use sensor::{SensorProvider, SensorRegistration, SimulatedSensorProvider};
pub use session::{Lifecycle, SessionController, SessionMetrics, SessionState};
