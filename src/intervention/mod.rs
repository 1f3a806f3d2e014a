pub mod sequencer;
pub mod types;

pub use sequencer::*;
pub use types::*;
