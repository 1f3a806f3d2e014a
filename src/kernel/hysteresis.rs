use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::state::{DistressState, StateHistory};
use super::time::Clock;
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub state: DistressState,
    pub changed: bool,
}

impl Transition {
    fn unchanged(state: DistressState) -> Self {
        Self {
            state,
            changed: false,
        }
    }
}

/// Turns fused probabilities into a confirmed state per conversation.
///
/// Precedence: stopped sessions are always CALM, then the crisis flag jumps
/// straight to CRISIS_RISK, then a confirmed CRISIS_RISK holds. Only after
/// that does the probability path run, damped by requiring the newest
/// `confirmation_window` proposals to agree.
pub struct HysteresisStateMachine {
    clock: Arc<dyn Clock>,
    confirmation_window: usize,
    escalation_after: Duration,
    histories: Mutex<HashMap<String, StateHistory>>,
}

impl HysteresisStateMachine {
    pub fn new(clock: Arc<dyn Clock>, confirmation_window: usize, escalation_after: Duration) -> Self {
        Self {
            clock,
            confirmation_window: confirmation_window.max(1),
            escalation_after,
            histories: Mutex::new(HashMap::new()),
        }
    }

    fn histories(&self) -> MutexGuard<'_, HashMap<String, StateHistory>> {
        self.histories.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn determine_state(&self, session: &Session, distress_prob: f64, is_crisis: bool) -> Transition {
        let current = session.current_state;

        if session.is_stopped() {
            return Transition::unchanged(DistressState::Calm);
        }

        if is_crisis {
            return Transition {
                state: DistressState::CrisisRisk,
                changed: current != DistressState::CrisisRisk,
            };
        }

        if current == DistressState::CrisisRisk {
            return Transition::unchanged(current);
        }

        let proposed = propose(distress_prob, current);

        let mut histories = self.histories();
        let history = histories.entry(session.chat_id.clone()).or_default();
        history.push(proposed);

        let confirmed = if history.is_unanimous(self.confirmation_window, proposed) {
            proposed
        } else {
            current
        };

        Transition {
            state: confirmed,
            changed: confirmed != current,
        }
    }

    /// Crisis always escalates; PANIC or OVERWHELMED escalate once the
    /// session has run longer than the escalation timeout.
    pub fn should_escalate(&self, session: &Session) -> bool {
        match session.current_state {
            DistressState::CrisisRisk => true,
            state if state.is_high_distress() => {
                self.clock.now().saturating_duration_since(session.session_start) > self.escalation_after
            }
            _ => false,
        }
    }

    pub fn history(&self, chat_id: &str) -> Vec<DistressState> {
        self.histories()
            .get(chat_id)
            .map(|h| h.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn forget(&self, chat_id: &str) {
        self.histories().remove(chat_id);
    }
}

/// Maps a probability to a candidate state. Order matters: the bands are
/// checked top-down and the low band looks at where the session came from.
pub fn propose(prob: f64, current: DistressState) -> DistressState {
    if prob >= 0.6 {
        return DistressState::Panic;
    }
    if prob >= 0.5 {
        return DistressState::Overwhelmed;
    }
    if prob >= 0.2 {
        return DistressState::Rising;
    }
    if current == DistressState::Recovery && prob < 0.25 {
        return DistressState::Calm;
    }
    if current.is_distressed() && (0.1..0.35).contains(&prob) {
        return DistressState::Recovery;
    }
    DistressState::Calm
}
