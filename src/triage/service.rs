use std::sync::Arc;

use tracing::{debug, info};

use super::locks::ChatLocks;
use super::types::{
    CheckInAnswer, CheckInRequest, HealthReport, InferRequest, ReplyIntent, ReplyMeta, TriageReply,
};
use crate::config::{ConfigError, Settings};
use crate::detect::{Detection, FusionDetector};
use crate::error::{TriageError, TriageResult};
use crate::intervention::{Intervention, InterventionKind, InterventionSequencer, REINFORCEMENT};
use crate::kernel::hysteresis::HysteresisStateMachine;
use crate::kernel::state::DistressState;
use crate::kernel::telemetry::event::{Collaborator, TelemetryEvent};
use crate::kernel::telemetry::metrics::TelemetrySnapshot;
use crate::kernel::telemetry::recorder::TelemetryRecorder;
use crate::kernel::time::{elapsed_secs, Clock, SystemClock};
use crate::safety::sanitize_user_input;
use crate::services::CoachingRequest;
use crate::session::{Session, SessionStore, SessionUpdate};

pub const STOP_ACKNOWLEDGEMENT: &str = "Understood. I'm here if you need me.";
pub const ESCALATION_BUTTONS: [&str; 2] = ["contact_support", "continue_alone"];
pub const SAME_GROUNDING: &str = "Let's try grounding. Name five things you can see.";
pub const SAME_BREATHING: &str = "In for four, hold seven, out for eight.";
pub const SAME_FOLLOWUP_SECS: u32 = 45;
const WORSE_MESSAGE: &str = "feeling worse";

/// The triage core: detection, state confirmation, intervention choice and
/// session bookkeeping behind one API.
///
/// Every operation that touches a conversation holds that conversation's
/// lock for its whole read-modify-write. Side tables for sessions evicted
/// along the way are cleaned up after the lock is released.
pub struct TriageService {
    settings: Settings,
    clock: Arc<dyn Clock>,
    detector: FusionDetector,
    machine: HysteresisStateMachine,
    sequencer: InterventionSequencer,
    store: SessionStore,
    locks: ChatLocks,
    telemetry: TelemetryRecorder,
}

impl TriageService {
    pub fn new(settings: Settings) -> Result<Self, ConfigError> {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: Settings, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        settings.validate()?;

        let detector = FusionDetector::from_settings(&settings);
        let machine = HysteresisStateMachine::new(
            clock.clone(),
            settings.confirmation_window,
            settings.escalation_timeout(),
        );
        let store = SessionStore::new(
            clock.clone(),
            settings.session_timeout(),
            settings.intervention_cooldown(),
        );

        info!(
            text_weight = settings.text_weight,
            audio_weight = settings.audio_weight,
            audio_enabled = settings.enable_audio,
            confirmation_window = settings.confirmation_window,
            "triage service ready"
        );

        Ok(Self {
            settings,
            clock,
            detector,
            machine,
            sequencer: InterventionSequencer::new(),
            store,
            locks: ChatLocks::new(),
            telemetry: TelemetryRecorder::new(),
        })
    }

    /// Swaps in a differently configured detector, e.g. one with a live
    /// secondary channel.
    pub fn with_detector(mut self, detector: FusionDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn sequencer(&self) -> &InterventionSequencer {
        &self.sequencer
    }

    pub fn state_machine(&self) -> &HysteresisStateMachine {
        &self.machine
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Classifies a message and returns the next step for its conversation.
    pub fn infer(&self, request: &InferRequest) -> TriageResult<TriageReply> {
        let chat_id = validate_chat_id(&request.chat_id)?;
        let message = sanitize_user_input(&request.message, self.settings.max_message_chars);
        if message.is_empty() {
            return Err(TriageError::EmptyMessage);
        }

        let reply = self.with_chat(chat_id, || {
            let detection = self.detector.detect(&message, request.features.as_ref());
            debug!(
                chat_id,
                final_prob = detection.final_prob,
                is_crisis = detection.is_crisis,
                is_stop = detection.is_stop,
                "message classified"
            );

            if detection.is_stop {
                return self.stop_locked(chat_id);
            }
            self.infer_locked(chat_id, &message, &detection)
        });

        self.collect_evicted();
        Ok(reply)
    }

    fn infer_locked(&self, chat_id: &str, message: &str, detection: &Detection) -> TriageReply {
        let session = self.open_locked(chat_id);
        let transition = self
            .machine
            .determine_state(&session, detection.final_prob, detection.is_crisis);

        if transition.changed {
            self.note_transition(chat_id, session.current_state, transition.state);
        }

        let session = self.store.update(
            chat_id,
            SessionUpdate::new()
                .state(transition.state)
                .distress_prob(detection.final_prob),
        );

        if session.is_stopped() {
            return self.stop_reply(&session);
        }

        if self.machine.should_escalate(&session) && !session.escalation_offered() {
            return self.escalate_locked(chat_id);
        }

        let previous = session.last_intervention_kind();
        let intervention = self.sequencer.next(transition.state, chat_id);
        let session = self
            .store
            .update(chat_id, SessionUpdate::new().intervention(intervention.kind));
        self.record(TelemetryEvent::InterventionIssued {
            kind: intervention.kind,
        });

        let coaching = CoachingRequest {
            user_message: message.to_string(),
            state: transition.state,
            distress_prob: detection.final_prob,
            last_intervention: previous,
        };
        self.coaching_reply(&session, &intervention, Some(coaching))
    }

    /// Handles a better/same/worse answer to a check-in prompt.
    pub fn check_in(&self, request: &CheckInRequest) -> TriageResult<TriageReply> {
        let chat_id = validate_chat_id(&request.chat_id)?;
        let reply = self.with_chat(chat_id, || self.check_in_locked(chat_id, request.response));
        self.collect_evicted();
        Ok(reply)
    }

    fn check_in_locked(&self, chat_id: &str, answer: CheckInAnswer) -> TriageReply {
        let session = self.open_locked(chat_id);
        self.record(TelemetryEvent::CheckIn { response: answer });
        info!(chat_id, response = ?answer, "check-in received");

        if session.is_stopped() {
            return self.stop_reply(&session);
        }

        let current = session.current_state;
        let pinned = |state: DistressState| {
            if current == DistressState::CrisisRisk {
                DistressState::CrisisRisk
            } else {
                state
            }
        };

        match answer {
            CheckInAnswer::Better => {
                let next = pinned(DistressState::Recovery);
                let session = self.move_to(chat_id, current, next);
                self.reply(
                    &session,
                    ReplyIntent::CheckInFollowUp,
                    REINFORCEMENT,
                    0,
                    None,
                )
            }
            CheckInAnswer::Same => {
                let grounding = matches!(
                    session.last_intervention_kind(),
                    None | Some(InterventionKind::FourSevenEight)
                );
                let (proposed, text) = if grounding {
                    (DistressState::Overwhelmed, SAME_GROUNDING)
                } else {
                    (DistressState::Panic, SAME_BREATHING)
                };
                let session = self.move_to(chat_id, current, pinned(proposed));
                self.reply(
                    &session,
                    ReplyIntent::CheckInFollowUp,
                    text,
                    SAME_FOLLOWUP_SECS,
                    Some(self.sequencer.check_in_prompt().buttons),
                )
            }
            CheckInAnswer::Worse => {
                let overdue = self.session_age(&session) >= self.settings.escalation_timeout_seconds
                    || current == DistressState::CrisisRisk;
                if overdue && !session.escalation_offered() {
                    return self.escalate_locked(chat_id);
                }

                let intervention = self.sequencer.next(current, chat_id);
                let coaching = CoachingRequest {
                    user_message: WORSE_MESSAGE.to_string(),
                    state: current,
                    distress_prob: session.distress_prob,
                    last_intervention: session.last_intervention_kind(),
                };
                self.coaching_reply(&session, &intervention, Some(coaching))
            }
        }
    }

    /// Stops coaching for a conversation until its session is reset.
    pub fn stop(&self, chat_id: &str) -> TriageResult<TriageReply> {
        let chat_id = validate_chat_id(chat_id)?;
        let reply = self.with_chat(chat_id, || self.stop_locked(chat_id));
        self.collect_evicted();
        Ok(reply)
    }

    fn stop_locked(&self, chat_id: &str) -> TriageReply {
        self.open_locked(chat_id);
        let session = self.store.update(chat_id, SessionUpdate::new().arm_stop());
        self.sequencer.reset(chat_id);
        self.record(TelemetryEvent::SessionStopped);
        info!(chat_id, session_id = %session.session_id, "session stopped by user");
        self.stop_reply(&session)
    }

    /// Removes the session and everything keyed by its chat_id. The next
    /// message starts a fresh session. Returns false for an unknown chat.
    pub fn end_session(&self, chat_id: &str) -> TriageResult<bool> {
        let chat_id = validate_chat_id(chat_id)?;
        let ended = self.with_chat(chat_id, || {
            let ended = self.store.end(chat_id);
            self.machine.forget(chat_id);
            self.sequencer.reset(chat_id);
            ended
        });
        self.locks.release(chat_id);

        if ended {
            self.record(TelemetryEvent::SessionEnded);
            info!(chat_id, "session ended");
        }
        Ok(ended)
    }

    /// The check-in prompt, if one is due for this conversation.
    pub fn poll_check_in(&self, chat_id: &str) -> TriageResult<Option<TriageReply>> {
        let chat_id = validate_chat_id(chat_id)?;
        let reply = self.with_chat(chat_id, || {
            self.open_locked(chat_id);
            if !self.store.should_check_in(chat_id) {
                return None;
            }
            let session = self.store.get_or_create(chat_id);
            let prompt = self.sequencer.check_in_prompt();
            debug!(chat_id, "check-in due");
            Some(TriageReply {
                intent: ReplyIntent::CheckInFollowUp,
                reply_text: prompt.text.to_string(),
                expect_followup: true,
                followup_after_sec: 0,
                buttons: Some(prompt.buttons),
                audio_url: None,
                meta: self.meta(&session),
                coaching: None,
            })
        });
        self.collect_evicted();
        Ok(reply)
    }

    /// Whether the intervention cooldown has passed for this conversation.
    pub fn can_intervene(&self, chat_id: &str) -> TriageResult<bool> {
        let chat_id = validate_chat_id(chat_id)?;
        let allowed = self.with_chat(chat_id, || {
            self.open_locked(chat_id);
            self.store.can_intervene(chat_id)
        });
        self.collect_evicted();
        Ok(allowed)
    }

    pub fn session(&self, chat_id: &str) -> Option<Session> {
        self.store.get(chat_id)
    }

    /// Evicts idle sessions and clears their side tables. Returns how many
    /// sessions were removed by this pass.
    pub fn sweep_expired(&self) -> usize {
        let removed = self.store.sweep_expired();
        self.collect_evicted();
        removed
    }

    pub fn active_sessions(&self) -> usize {
        self.store.len()
    }

    pub fn record_fallback(&self, collaborator: Collaborator) {
        self.record(TelemetryEvent::CollaboratorFallback { collaborator });
    }

    pub fn telemetry_snapshot(&self) -> TelemetrySnapshot {
        self.telemetry.snapshot()
    }

    pub fn health(&self) -> HealthReport {
        HealthReport {
            status: "healthy",
            active_sessions: self.active_sessions(),
            audio_detection_enabled: self.settings.enable_audio,
            telemetry: self.telemetry_snapshot(),
        }
    }

    fn with_chat<T>(&self, chat_id: &str, f: impl FnOnce() -> T) -> T {
        let handle = self.locks.handle(chat_id);
        let _guard = handle.lock().unwrap_or_else(|e| e.into_inner());
        f()
    }

    /// Opens the session for `chat_id`. A new session, including one that
    /// replaces an evicted one, starts without history or script cursors.
    /// Must run under the chat lock.
    fn open_locked(&self, chat_id: &str) -> Session {
        let (session, created) = self.store.open(chat_id);
        if created {
            self.machine.forget(chat_id);
            self.sequencer.reset(chat_id);
            debug!(chat_id, session_id = %session.session_id, "session opened");
        }
        session
    }

    fn collect_evicted(&self) {
        let evicted = self.store.drain_evicted();
        if evicted.is_empty() {
            return;
        }

        for chat_id in &evicted {
            self.with_chat(chat_id, || {
                // A recreated chat was already cleared by `open_locked`.
                if self.store.get(chat_id).is_none() {
                    self.machine.forget(chat_id);
                    self.sequencer.reset(chat_id);
                }
            });
            self.locks.release(chat_id);
        }

        debug!(count = evicted.len(), "idle sessions evicted");
        self.record(TelemetryEvent::SessionsEvicted {
            count: evicted.len(),
        });
    }

    fn escalate_locked(&self, chat_id: &str) -> TriageReply {
        let session = self.store.update(chat_id, SessionUpdate::new().arm_escalation());
        self.record(TelemetryEvent::EscalationOffered);
        info!(chat_id, session_id = %session.session_id, state = %session.current_state, "escalation offered");
        self.reply(
            &session,
            ReplyIntent::EscalationOffer,
            self.sequencer.escalation_prompt(),
            0,
            Some(ESCALATION_BUTTONS.iter().map(|b| b.to_string()).collect()),
        )
        .expecting_followup()
    }

    fn move_to(&self, chat_id: &str, from: DistressState, to: DistressState) -> Session {
        if from != to {
            self.note_transition(chat_id, from, to);
        }
        self.store.update(chat_id, SessionUpdate::new().state(to))
    }

    fn note_transition(&self, chat_id: &str, from: DistressState, to: DistressState) {
        info!(chat_id, %from, %to, "state transition");
        self.record(TelemetryEvent::StateTransition { from, to });
    }

    fn coaching_reply(
        &self,
        session: &Session,
        intervention: &Intervention,
        coaching: Option<CoachingRequest>,
    ) -> TriageReply {
        let state = session.current_state;
        let expect_followup = !matches!(state, DistressState::Calm | DistressState::Recovery);
        let followup_after_sec = if expect_followup {
            intervention.duration_secs
        } else {
            0
        };
        let buttons = (state.is_distressed() && intervention.duration_secs > 0)
            .then(|| self.sequencer.check_in_prompt().buttons);

        TriageReply {
            intent: ReplyIntent::CoachingPrompt,
            reply_text: intervention.prompt.to_string(),
            expect_followup,
            followup_after_sec,
            buttons,
            audio_url: None,
            meta: self.meta(session),
            coaching,
        }
    }

    fn reply(
        &self,
        session: &Session,
        intent: ReplyIntent,
        text: &str,
        followup_after_sec: u32,
        buttons: Option<Vec<String>>,
    ) -> TriageReply {
        TriageReply {
            intent,
            reply_text: text.to_string(),
            expect_followup: followup_after_sec > 0,
            followup_after_sec,
            buttons,
            audio_url: None,
            meta: self.meta(session),
            coaching: None,
        }
    }

    fn stop_reply(&self, session: &Session) -> TriageReply {
        TriageReply {
            intent: ReplyIntent::StopAcknowledged,
            reply_text: STOP_ACKNOWLEDGEMENT.to_string(),
            expect_followup: false,
            followup_after_sec: 0,
            buttons: None,
            audio_url: None,
            meta: ReplyMeta {
                state: DistressState::Calm,
                confidence: 1.0,
                intervention_type: None,
                session_duration_seconds: self.session_age(session),
            },
            coaching: None,
        }
    }

    fn meta(&self, session: &Session) -> ReplyMeta {
        ReplyMeta {
            state: session.current_state,
            confidence: session.distress_prob,
            intervention_type: session.last_intervention_kind(),
            session_duration_seconds: self.session_age(session),
        }
    }

    fn session_age(&self, session: &Session) -> u64 {
        elapsed_secs(session.session_start, self.clock.now())
    }

    fn record(&self, event: TelemetryEvent) {
        self.telemetry.record(event);
    }
}

impl TriageReply {
    fn expecting_followup(mut self) -> Self {
        self.expect_followup = true;
        self
    }
}

fn validate_chat_id(chat_id: &str) -> TriageResult<&str> {
    let trimmed = chat_id.trim();
    if trimmed.is_empty() {
        return Err(TriageError::MissingChatId);
    }
    Ok(trimmed)
}
