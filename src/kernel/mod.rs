pub mod hysteresis;
pub mod latch;
pub mod state;
pub mod telemetry;
pub mod time;
