use crate::sample::Strategy;
use crate::session::Lifecycle;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JumpError {
    #[error("Resource unavailable ({resource}): {details}")]
    ResourceUnavailable { resource: String, details: String },

    #[error("No camera device available")]
    NoCameraAvailable,

    #[error("Session has already been disposed")]
    AlreadyDisposed,

    #[error("Failed to acquire camera device {device}: {details} (rolled back: {rolled_back})")]
    AcquisitionFailed {
        device: u32,
        details: String,
        rolled_back: bool,
    },

    #[error("Cannot {operation} while session is {from:?}")]
    InvalidTransition {
        from: Lifecycle,
        operation: &'static str,
    },

    #[error("Operation {operation} is not supported by the {strategy:?} strategy")]
    StrategyMismatch {
        strategy: Strategy,
        operation: &'static str,
    },

    #[error("Malformed input: {details}")]
    MalformedSample { details: String },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("System error: {message}")]
    System { message: String },
}

impl JumpError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn resource_unavailable<R: Into<String>, D: Into<String>>(resource: R, details: D) -> Self {
        Self::ResourceUnavailable {
            resource: resource.into(),
            details: details.into(),
        }
    }

    pub fn malformed<S: Into<String>>(details: S) -> Self {
        Self::MalformedSample {
            details: details.into(),
        }
    }

    /// Whether a caller may reasonably retry the failed operation.
    ///
    /// The engine never retries on its own; this only classifies device
    /// failures apart from lifecycle misuse.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            JumpError::ResourceUnavailable { .. }
                | JumpError::NoCameraAvailable
                | JumpError::AcquisitionFailed { .. }
                | JumpError::MalformedSample { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, JumpError>;
