use serde::{Deserialize, Serialize};

use crate::detect::FeatureBundle;
use crate::intervention::InterventionKind;
use crate::kernel::state::DistressState;
use crate::kernel::telemetry::metrics::TelemetrySnapshot;
use crate::services::CoachingRequest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferRequest {
    pub chat_id: String,
    pub message: String,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Secondary-channel measurements, if the client captured any.
    #[serde(default)]
    pub features: Option<FeatureBundle>,
}

impl InferRequest {
    pub fn new(chat_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            message: message.into(),
            user_id: None,
            features: None,
        }
    }

    pub fn with_features(mut self, features: FeatureBundle) -> Self {
        self.features = Some(features);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckInAnswer {
    Better,
    Same,
    Worse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInRequest {
    pub chat_id: String,
    pub response: CheckInAnswer,
}

impl CheckInRequest {
    pub fn new(chat_id: impl Into<String>, response: CheckInAnswer) -> Self {
        Self {
            chat_id: chat_id.into(),
            response,
        }
    }
}

/// What kind of reply the transport should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyIntent {
    StopAcknowledged,
    EscalationOffer,
    CoachingPrompt,
    CheckInFollowUp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplyMeta {
    pub state: DistressState,
    /// The session's distress probability.
    pub confidence: f64,
    pub intervention_type: Option<InterventionKind>,
    pub session_duration_seconds: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TriageReply {
    pub intent: ReplyIntent,
    /// Canned text. The `Responder` may replace it with generated coaching.
    pub reply_text: String,
    pub expect_followup: bool,
    pub followup_after_sec: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buttons: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    pub meta: ReplyMeta,
    /// Input for the coaching generator, when this reply may be rephrased.
    #[serde(skip)]
    pub coaching: Option<CoachingRequest>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub active_sessions: usize,
    pub audio_detection_enabled: bool,
    pub telemetry: TelemetrySnapshot,
}
