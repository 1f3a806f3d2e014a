use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::types::{CheckInPrompt, Intervention, InterventionKind, ScriptPosition, SequenceKind};
use crate::kernel::state::DistressState;

pub const CALM_CHECK_IN: &str = "How are you feeling right now?";
pub const REINFORCEMENT: &str = "Your body is settling. Take two slow breaths.";
pub const ESCALATION_OFFER: &str =
    "I hear you're struggling. Would you like me to contact your support person?";
pub const CHECK_IN_PROMPT: &str = "How are you feeling now?";
pub const CHECK_IN_BUTTONS: [&str; 3] = ["better", "same", "worse"];

const GROUNDING_STEPS: &[&str] = &[
    "Name five things you can see.",
    "Name four things you can touch.",
    "Name three things you can hear.",
    "Name two things you can smell.",
    "Name one thing you can taste.",
    "You're here. You're present. Take a slow breath.",
];

const PACED_BREATHING_STEPS: &[&str] = &[
    "Breathe in for four, out for four.",
    "Keep that rhythm. In for four, out for four.",
    "You're doing well. Two more breaths.",
];

const FOUR_SEVEN_EIGHT_STEPS: &[&str] = &[
    "In for four, hold for seven, out for eight.",
    "Again. In four, hold seven, out eight.",
    "One more cycle. In four, hold seven, out eight.",
];

const BOX_BREATHING_STEPS: &[&str] = &[
    "In for four, hold four, out four, hold four.",
    "Continue the box. In, hold, out, hold.",
    "You've got this. One more round.",
];

const GROUNDING_CLOSING: &str = "You're here. You're present. Take a slow breath.";
const BREATHING_CLOSING: &str = "You're doing well. One more breath.";

/// A fixed multi-step script.
#[derive(Debug, Clone, Copy)]
pub struct Script {
    pub steps: &'static [&'static str],
    pub closing: &'static str,
    pub base_duration_secs: u32,
}

impl Script {
    pub fn for_kind(kind: SequenceKind) -> Script {
        match kind {
            SequenceKind::Grounding => Script {
                steps: GROUNDING_STEPS,
                closing: GROUNDING_CLOSING,
                base_duration_secs: 75,
            },
            SequenceKind::PacedBreathing => Script {
                steps: PACED_BREATHING_STEPS,
                closing: BREATHING_CLOSING,
                base_duration_secs: 30,
            },
            SequenceKind::FourSevenEight => Script {
                steps: FOUR_SEVEN_EIGHT_STEPS,
                closing: BREATHING_CLOSING,
                base_duration_secs: 60,
            },
            SequenceKind::BoxBreathing => Script {
                steps: BOX_BREATHING_STEPS,
                closing: BREATHING_CLOSING,
                base_duration_secs: 48,
            },
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn per_step_secs(&self) -> u32 {
        self.base_duration_secs / self.steps.len().max(1) as u32
    }
}

/// What a confirmed state maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    Single {
        kind: InterventionKind,
        duration_secs: u32,
        prompt: &'static str,
    },
    Script(SequenceKind),
}

impl Plan {
    pub fn for_state(state: DistressState) -> Plan {
        match state {
            DistressState::Calm => Plan::Single {
                kind: InterventionKind::CheckIn,
                duration_secs: 0,
                prompt: CALM_CHECK_IN,
            },
            DistressState::Rising => Plan::Script(SequenceKind::PacedBreathing),
            DistressState::Panic => Plan::Script(SequenceKind::FourSevenEight),
            DistressState::Overwhelmed => Plan::Script(SequenceKind::Grounding),
            DistressState::Recovery => Plan::Single {
                kind: InterventionKind::Reinforcement,
                duration_secs: 0,
                prompt: REINFORCEMENT,
            },
            DistressState::CrisisRisk => Plan::Single {
                kind: InterventionKind::Escalation,
                duration_secs: 0,
                prompt: ESCALATION_OFFER,
            },
        }
    }
}

/// Walks per-conversation cursors through the coaching scripts.
///
/// Cursor values live in `[0, script.len()]`. Reaching the end yields the
/// closing line and wraps to 0, so ongoing distress cycles the script again.
#[derive(Debug, Default)]
pub struct InterventionSequencer {
    cursors: Mutex<HashMap<(String, SequenceKind), usize>>,
}

impl InterventionSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    fn cursors(&self) -> MutexGuard<'_, HashMap<(String, SequenceKind), usize>> {
        self.cursors.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The intervention for `state`. Scripted states advance this chat's cursor.
    pub fn next(&self, state: DistressState, chat_id: &str) -> Intervention {
        match Plan::for_state(state) {
            Plan::Single {
                kind,
                duration_secs,
                prompt,
            } => Intervention {
                kind,
                duration_secs,
                prompt,
                position: None,
            },
            Plan::Script(sequence) => self.script_step(chat_id, sequence),
        }
    }

    /// Advances the `(chat_id, sequence)` cursor by one and returns that step.
    pub fn script_step(&self, chat_id: &str, sequence: SequenceKind) -> Intervention {
        let script = Script::for_kind(sequence);
        let mut cursors = self.cursors();
        let cursor = cursors.entry((chat_id.to_string(), sequence)).or_insert(0);

        let (prompt, position) = if *cursor < script.len() {
            let index = *cursor;
            *cursor += 1;
            (
                script.steps[index],
                ScriptPosition::Step {
                    index,
                    of: script.len(),
                },
            )
        } else {
            *cursor = 0;
            (script.closing, ScriptPosition::Closing)
        };

        Intervention {
            kind: sequence.intervention(),
            duration_secs: script.per_step_secs(),
            prompt,
            position: Some(position),
        }
    }

    /// Current cursor value; 0 if the script was never started.
    pub fn cursor(&self, chat_id: &str, sequence: SequenceKind) -> usize {
        self.cursors()
            .get(&(chat_id.to_string(), sequence))
            .copied()
            .unwrap_or(0)
    }

    /// Drops every cursor for `chat_id` so scripts restart from step 0.
    pub fn reset(&self, chat_id: &str) {
        self.cursors().retain(|(id, _), _| id != chat_id);
    }

    pub fn check_in_prompt(&self) -> CheckInPrompt {
        CheckInPrompt {
            text: CHECK_IN_PROMPT,
            buttons: CHECK_IN_BUTTONS.iter().map(|b| b.to_string()).collect(),
        }
    }

    pub fn escalation_prompt(&self) -> &'static str {
        ESCALATION_OFFER
    }
}
