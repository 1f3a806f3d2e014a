use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// The confirmed emotional-risk category of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistressState {
    Calm,
    /// Medium intensity: worry, tension, nerves.
    Rising,
    /// Acute, high intensity: racing heart, can't breathe.
    Panic,
    /// High intensity freeze/shutdown.
    Overwhelmed,
    /// Settling down after a distressed state.
    Recovery,
    /// Crisis language detected. Sticky until an explicit stop or reset.
    CrisisRisk,
}

impl DistressState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistressState::Calm => "calm",
            DistressState::Rising => "rising",
            DistressState::Panic => "panic",
            DistressState::Overwhelmed => "overwhelmed",
            DistressState::Recovery => "recovery",
            DistressState::CrisisRisk => "crisis_risk",
        }
    }

    /// States from which a low probability reading counts as recovery.
    pub fn is_distressed(&self) -> bool {
        matches!(
            self,
            DistressState::Rising | DistressState::Panic | DistressState::Overwhelmed
        )
    }

    /// States that count toward the long-distress escalation timeout.
    pub fn is_high_distress(&self) -> bool {
        matches!(self, DistressState::Panic | DistressState::Overwhelmed)
    }
}

impl Default for DistressState {
    fn default() -> Self {
        Self::Calm
    }
}

impl fmt::Display for DistressState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const HISTORY_CAPACITY: usize = 5;

/// The last few *proposed* states for one conversation, oldest first.
#[derive(Debug, Clone, Default)]
pub struct StateHistory {
    proposed: VecDeque<DistressState>,
}

impl StateHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, state: DistressState) {
        if self.proposed.len() >= HISTORY_CAPACITY {
            self.proposed.pop_front();
        }
        self.proposed.push_back(state);
    }

    pub fn len(&self) -> usize {
        self.proposed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposed.is_empty()
    }

    /// True if the newest `window` entries exist and are all `state`.
    pub fn is_unanimous(&self, window: usize, state: DistressState) -> bool {
        self.proposed.len() >= window
            && self.proposed.iter().rev().take(window).all(|s| *s == state)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DistressState> {
        self.proposed.iter()
    }
}
