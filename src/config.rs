use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::kernel::state::HISTORY_CAPACITY;

pub const ENV_PREFIX: &str = "EMPATHLENS_";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be within [0, 1], got {value}")]
    WeightOutOfRange { name: &'static str, value: f64 },
    #[error("text_weight + audio_weight must not exceed 1, got {0}")]
    WeightSumTooLarge(f64),
    #[error("{0} must be greater than zero")]
    NonPositive(&'static str),
    #[error("confirmation_window must be between 1 and {max}, got {value}")]
    ConfirmationWindow { value: usize, max: usize },
    #[error("invalid value {value:?} for {key}")]
    Unparsable { key: String, value: String },
}

/// Runtime settings. Defaults match the production service; every field can
/// be overridden with an `EMPATHLENS_<FIELD>` environment variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Detection weights
    /// Only applied when a secondary reading is fused. Without one the text
    /// probability is used as is.
    pub text_weight: f64,
    pub audio_weight: f64,
    pub enable_audio: bool,

    // Session
    pub session_timeout_minutes: u64,
    pub intervention_cooldown_seconds: u64,
    pub escalation_timeout_seconds: u64,
    pub confirmation_window: usize,

    // Safety
    pub max_response_words: usize,
    pub max_message_chars: usize,

    // Driver
    pub sweep_interval_seconds: u64,
    pub collaborator_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            text_weight: 0.6,
            audio_weight: 0.4,
            enable_audio: false,
            session_timeout_minutes: 30,
            intervention_cooldown_seconds: 30,
            escalation_timeout_seconds: 120,
            confirmation_window: 1,
            max_response_words: 18,
            max_message_chars: 500,
            sweep_interval_seconds: 60,
            collaborator_timeout_ms: 2000,
        }
    }
}

impl Settings {
    /// Defaults overlaid with the process environment, then validated.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut s = Settings::default();

        override_with(&lookup, "TEXT_WEIGHT", &mut s.text_weight)?;
        override_with(&lookup, "AUDIO_WEIGHT", &mut s.audio_weight)?;
        override_with(&lookup, "ENABLE_AUDIO", &mut s.enable_audio)?;
        override_with(&lookup, "SESSION_TIMEOUT_MINUTES", &mut s.session_timeout_minutes)?;
        override_with(&lookup, "INTERVENTION_COOLDOWN_SECONDS", &mut s.intervention_cooldown_seconds)?;
        override_with(&lookup, "ESCALATION_TIMEOUT_SECONDS", &mut s.escalation_timeout_seconds)?;
        override_with(&lookup, "CONFIRMATION_WINDOW", &mut s.confirmation_window)?;
        override_with(&lookup, "MAX_RESPONSE_WORDS", &mut s.max_response_words)?;
        override_with(&lookup, "MAX_MESSAGE_CHARS", &mut s.max_message_chars)?;
        override_with(&lookup, "SWEEP_INTERVAL_SECONDS", &mut s.sweep_interval_seconds)?;
        override_with(&lookup, "COLLABORATOR_TIMEOUT_MS", &mut s.collaborator_timeout_ms)?;

        s.validate()?;
        Ok(s)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("text_weight", self.text_weight), ("audio_weight", self.audio_weight)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::WeightOutOfRange { name, value });
            }
        }

        let sum = self.text_weight + self.audio_weight;
        if sum > 1.0 + 1e-9 {
            return Err(ConfigError::WeightSumTooLarge(sum));
        }

        let positives = [
            ("session_timeout_minutes", self.session_timeout_minutes),
            ("intervention_cooldown_seconds", self.intervention_cooldown_seconds),
            ("escalation_timeout_seconds", self.escalation_timeout_seconds),
            ("max_response_words", self.max_response_words as u64),
            ("max_message_chars", self.max_message_chars as u64),
            ("sweep_interval_seconds", self.sweep_interval_seconds),
            ("collaborator_timeout_ms", self.collaborator_timeout_ms),
        ];
        for (name, value) in positives {
            if value == 0 {
                return Err(ConfigError::NonPositive(name));
            }
        }

        if self.confirmation_window == 0 || self.confirmation_window > HISTORY_CAPACITY {
            return Err(ConfigError::ConfirmationWindow {
                value: self.confirmation_window,
                max: HISTORY_CAPACITY,
            });
        }

        Ok(())
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_minutes * 60)
    }

    pub fn intervention_cooldown(&self) -> Duration {
        Duration::from_secs(self.intervention_cooldown_seconds)
    }

    pub fn escalation_timeout(&self) -> Duration {
        Duration::from_secs(self.escalation_timeout_seconds)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }

    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_millis(self.collaborator_timeout_ms)
    }
}

fn override_with<F, T>(lookup: &F, field: &str, target: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let key = format!("{ENV_PREFIX}{field}");
    if let Some(raw) = lookup(&key) {
        *target = raw.trim().parse().map_err(|_| ConfigError::Unparsable {
            key: key.clone(),
            value: raw.clone(),
        })?;
    }
    Ok(())
}
