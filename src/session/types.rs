use std::time::Instant;
use uuid::Uuid;

use crate::intervention::InterventionKind;
use crate::kernel::latch::Latch;
use crate::kernel::state::DistressState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastIntervention {
    pub kind: InterventionKind,
    pub at: Instant,
}

/// Per-conversation record. Owned by the `SessionStore`; everything else
/// works on snapshots.
#[derive(Debug, Clone)]
pub struct Session {
    pub chat_id: String,
    /// Fresh for every (re)creation of a chat_id.
    pub session_id: Uuid,
    pub current_state: DistressState,
    pub distress_prob: f64,
    pub last_intervention: Option<LastIntervention>,
    pub intervention_count: u32,
    pub session_start: Instant,
    pub last_update: Instant,
    pub escalation_offered: Latch,
    pub stopped: Latch,
}

impl Session {
    pub fn new(chat_id: impl Into<String>, now: Instant) -> Self {
        Self {
            chat_id: chat_id.into(),
            session_id: Uuid::new_v4(),
            current_state: DistressState::Calm,
            distress_prob: 0.0,
            last_intervention: None,
            intervention_count: 0,
            session_start: now,
            last_update: now,
            escalation_offered: Latch::new(),
            stopped: Latch::new(),
        }
    }

    pub fn last_intervention_kind(&self) -> Option<InterventionKind> {
        self.last_intervention.map(|li| li.kind)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.is_armed()
    }

    pub fn escalation_offered(&self) -> bool {
        self.escalation_offered.is_armed()
    }
}

/// Partial update for a session. Unset fields are left alone; the two
/// latches can only be armed through here, never cleared.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub state: Option<DistressState>,
    pub distress_prob: Option<f64>,
    pub intervention: Option<InterventionKind>,
    pub arm_escalation: bool,
    pub arm_stop: bool,
}

impl SessionUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(mut self, state: DistressState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn distress_prob(mut self, prob: f64) -> Self {
        self.distress_prob = Some(prob);
        self
    }

    pub fn intervention(mut self, kind: InterventionKind) -> Self {
        self.intervention = Some(kind);
        self
    }

    pub fn arm_escalation(mut self) -> Self {
        self.arm_escalation = true;
        self
    }

    pub fn arm_stop(mut self) -> Self {
        self.arm_stop = true;
        self
    }

    pub(crate) fn apply(self, session: &mut Session, now: Instant) {
        if let Some(state) = self.state {
            session.current_state = state;
        }
        if let Some(prob) = self.distress_prob {
            session.distress_prob = prob.clamp(0.0, 1.0);
        }
        if let Some(kind) = self.intervention {
            session.last_intervention = Some(LastIntervention { kind, at: now });
            session.intervention_count = session.intervention_count.saturating_add(1);
        }
        if self.arm_escalation {
            session.escalation_offered.arm();
        }
        if self.arm_stop {
            session.stopped.arm();
        }
        session.last_update = now;
    }
}
