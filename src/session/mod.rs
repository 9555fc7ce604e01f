mod controller;
mod types;

pub use controller::SessionController;
pub use types::{Lifecycle, SessionMetrics, SessionState};
