use serde::{Deserialize, Serialize};

use crate::intervention::InterventionKind;
use crate::kernel::state::DistressState;
use crate::triage::types::CheckInAnswer;

// Allowed: states, kinds, counts.
// Forbidden: message text, coaching text, chat ids.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TelemetryEvent {
    StateTransition {
        from: DistressState,
        to: DistressState,
    },

    InterventionIssued {
        kind: InterventionKind,
    },

    EscalationOffered,

    CheckIn {
        response: CheckInAnswer,
    },

    SessionStopped,

    SessionEnded,

    SessionsEvicted {
        count: usize,
    },

    CollaboratorFallback {
        collaborator: Collaborator,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collaborator {
    CoachingGenerator,
    SafetyFilter,
    SpeechSynthesizer,
}
