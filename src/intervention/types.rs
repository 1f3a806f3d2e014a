use serde::{Deserialize, Serialize};

/// Kinds of micro-intervention the sequencer can hand out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionKind {
    PacedBreathing,
    FourSevenEight,
    BoxBreathing,
    #[serde(rename = "grounding_54321")]
    Grounding54321,
    Reinforcement,
    Escalation,
    CheckIn,
}

impl InterventionKind {
    /// The script this kind walks through, if it is multi-step.
    pub fn sequence(&self) -> Option<SequenceKind> {
        match self {
            InterventionKind::PacedBreathing => Some(SequenceKind::PacedBreathing),
            InterventionKind::FourSevenEight => Some(SequenceKind::FourSevenEight),
            InterventionKind::BoxBreathing => Some(SequenceKind::BoxBreathing),
            InterventionKind::Grounding54321 => Some(SequenceKind::Grounding),
            InterventionKind::Reinforcement
            | InterventionKind::Escalation
            | InterventionKind::CheckIn => None,
        }
    }
}

/// Multi-step scripts. Each has its own cursor per conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceKind {
    Grounding,
    PacedBreathing,
    FourSevenEight,
    BoxBreathing,
}

impl SequenceKind {
    pub const ALL: [SequenceKind; 4] = [
        SequenceKind::Grounding,
        SequenceKind::PacedBreathing,
        SequenceKind::FourSevenEight,
        SequenceKind::BoxBreathing,
    ];

    pub fn intervention(&self) -> InterventionKind {
        match self {
            SequenceKind::Grounding => InterventionKind::Grounding54321,
            SequenceKind::PacedBreathing => InterventionKind::PacedBreathing,
            SequenceKind::FourSevenEight => InterventionKind::FourSevenEight,
            SequenceKind::BoxBreathing => InterventionKind::BoxBreathing,
        }
    }
}

/// Where a returned prompt sits inside its script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptPosition {
    Step { index: usize, of: usize },
    /// The closing line after the last step; the cursor is back at 0.
    Closing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Intervention {
    pub kind: InterventionKind,
    /// For scripts this is the per-step share of the base duration.
    pub duration_secs: u32,
    pub prompt: &'static str,
    pub position: Option<ScriptPosition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckInPrompt {
    pub text: &'static str,
    pub buttons: Vec<String>,
}
