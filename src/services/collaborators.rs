use async_trait::async_trait;
use serde::Serialize;

use crate::intervention::InterventionKind;
use crate::kernel::state::DistressState;

/// What the coaching generator gets to work with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoachingRequest {
    pub user_message: String,
    pub state: DistressState,
    pub distress_prob: f64,
    pub last_intervention: Option<InterventionKind>,
}

/// Rephrases a canned prompt into a short personalised line.
#[async_trait]
pub trait CoachingGenerator: Send + Sync {
    async fn generate(&self, request: &CoachingRequest) -> anyhow::Result<String>;
}

/// Turns reply text into audio. `Ok(None)` means "no audio for this one".
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> anyhow::Result<Option<String>>;
}
