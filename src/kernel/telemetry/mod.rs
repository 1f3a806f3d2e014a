//! Triage telemetry.
//!
//! # SAFETY INVARIANT
//! Telemetry is a write-only side channel. Decision logic (classifier,
//! state machine, sequencer, store) must never read it back.
//!
//! # PRIVACY INVARIANT
//! Events carry states, intervention kinds and counts only. Message text,
//! generated coaching lines and chat ids never enter a telemetry event.

pub mod event;
pub mod metrics;
pub mod recorder;
