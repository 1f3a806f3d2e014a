use serde::Serialize;
use std::collections::BTreeMap;

use super::event::{Collaborator, TelemetryEvent};
use crate::triage::types::CheckInAnswer;

#[derive(Debug, Clone, Default, Serialize)]
pub struct TelemetrySnapshot {
    pub transitions: TransitionStats,
    pub intervention_stats: InterventionStats,
    pub check_in_stats: CheckInStats,
    pub session_stats: SessionStats,
    pub fallback_stats: FallbackStats,
    /// Events pushed out of the bounded log before this snapshot.
    pub dropped_events: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TransitionStats {
    pub total: u64,
    /// Entries into each state, keyed by its wire name.
    pub entered: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InterventionStats {
    pub issued: u64,
    pub by_kind: BTreeMap<String, u64>,
    pub escalations_offered: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckInStats {
    pub better: u64,
    pub same: u64,
    pub worse: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionStats {
    pub stopped: u64,
    pub ended: u64,
    pub evicted: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FallbackStats {
    pub coaching_generator: u64,
    pub safety_filter: u64,
    pub speech_synthesizer: u64,
}

pub fn compute_snapshot<'a>(events: impl IntoIterator<Item = &'a TelemetryEvent>) -> TelemetrySnapshot {
    let mut snap = TelemetrySnapshot::default();

    for event in events {
        match event {
            TelemetryEvent::StateTransition { to, .. } => {
                snap.transitions.total += 1;
                *snap.transitions.entered.entry(to.as_str().to_string()).or_default() += 1;
            }
            TelemetryEvent::InterventionIssued { kind } => {
                snap.intervention_stats.issued += 1;
                let name = serde_json::to_value(kind)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_else(|| format!("{:?}", kind));
                *snap.intervention_stats.by_kind.entry(name).or_default() += 1;
            }
            TelemetryEvent::EscalationOffered => snap.intervention_stats.escalations_offered += 1,
            TelemetryEvent::CheckIn { response } => match response {
                CheckInAnswer::Better => snap.check_in_stats.better += 1,
                CheckInAnswer::Same => snap.check_in_stats.same += 1,
                CheckInAnswer::Worse => snap.check_in_stats.worse += 1,
            },
            TelemetryEvent::SessionStopped => snap.session_stats.stopped += 1,
            TelemetryEvent::SessionEnded => snap.session_stats.ended += 1,
            TelemetryEvent::SessionsEvicted { count } => snap.session_stats.evicted += *count as u64,
            TelemetryEvent::CollaboratorFallback { collaborator } => match collaborator {
                Collaborator::CoachingGenerator => snap.fallback_stats.coaching_generator += 1,
                Collaborator::SafetyFilter => snap.fallback_stats.safety_filter += 1,
                Collaborator::SpeechSynthesizer => snap.fallback_stats.speech_synthesizer += 1,
            },
        }
    }

    snap
}
