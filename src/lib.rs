pub mod config;
pub mod detect;
pub mod error;
pub mod intervention;
pub mod kernel;
pub mod safety;
pub mod services;
pub mod session;
pub mod triage;

pub use config::Settings;
pub use detect::{FusionDetector, TextSignalClassifier};
pub use error::{TriageError, TriageResult};
pub use kernel::hysteresis::HysteresisStateMachine;
pub use kernel::state::DistressState;
pub use triage::TriageService;
