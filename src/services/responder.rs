use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};

use super::collaborators::{CoachingGenerator, SpeechSynthesizer};
use crate::config::Settings;
use crate::kernel::telemetry::event::Collaborator;
use crate::safety::SafetyFilter;
use crate::triage::types::{ReplyIntent, TriageReply};

/// A reply after the collaborators had their turn, plus which of them
/// had to be replaced by the canned fallback.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub reply: TriageReply,
    pub fallbacks: Vec<Collaborator>,
}

/// Runs the optional coaching generator and speech synthesizer over a core
/// reply. Nothing here can fail the request: errors, timeouts and unsafe
/// text all degrade to the canned prompt and no audio.
pub struct Responder {
    coach: Option<Arc<dyn CoachingGenerator>>,
    voice: Option<Arc<dyn SpeechSynthesizer>>,
    filter: SafetyFilter,
    timeout: Duration,
}

impl Responder {
    pub fn new(settings: &Settings) -> Self {
        Self {
            coach: None,
            voice: None,
            filter: SafetyFilter::new(settings.max_response_words),
            timeout: settings.collaborator_timeout(),
        }
    }

    pub fn with_coach(mut self, coach: Arc<dyn CoachingGenerator>) -> Self {
        self.coach = Some(coach);
        self
    }

    pub fn with_voice(mut self, voice: Arc<dyn SpeechSynthesizer>) -> Self {
        self.voice = Some(voice);
        self
    }

    pub async fn deliver(&self, mut reply: TriageReply) -> Delivery {
        let mut fallbacks = Vec::new();

        if let (Some(coach), Some(request)) = (&self.coach, reply.coaching.as_ref()) {
            match timeout(self.timeout, coach.generate(request)).await {
                Ok(Ok(text)) => {
                    let outcome = self.filter.filter(&text);
                    if outcome.is_safe {
                        reply.reply_text = outcome.text;
                    } else {
                        debug!("generated coaching rejected by safety filter");
                        fallbacks.push(Collaborator::SafetyFilter);
                    }
                }
                Ok(Err(err)) => {
                    warn!(error = %err, "coaching generator failed, using canned prompt");
                    fallbacks.push(Collaborator::CoachingGenerator);
                }
                Err(_) => {
                    warn!(timeout_ms = self.timeout.as_millis() as u64, "coaching generator timed out");
                    fallbacks.push(Collaborator::CoachingGenerator);
                }
            }
        }

        if reply.intent != ReplyIntent::StopAcknowledged {
            if let Some(voice) = &self.voice {
                reply.audio_url = match timeout(self.timeout, voice.synthesize(&reply.reply_text)).await {
                    Ok(Ok(url)) => url,
                    Ok(Err(err)) => {
                        warn!(error = %err, "speech synthesis failed");
                        fallbacks.push(Collaborator::SpeechSynthesizer);
                        None
                    }
                    Err(_) => {
                        warn!(timeout_ms = self.timeout.as_millis() as u64, "speech synthesis timed out");
                        fallbacks.push(Collaborator::SpeechSynthesizer);
                        None
                    }
                };
            }
        }

        Delivery { reply, fallbacks }
    }
}
