use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::text::{SignalCategory, TextSignal, TextSignalClassifier};
use crate::config::Settings;

/// Opaque named measurements for a secondary channel (pitch variance,
/// loudness, pause ratio and the like). The core never interprets them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureBundle(pub BTreeMap<String, f64>);

impl FeatureBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A pluggable non-text distress estimate in [0, 1].
pub trait SecondarySignal: Send + Sync {
    fn estimate(&self, features: &FeatureBundle) -> f64;
}

/// Audio prosody channel. A placeholder that reports 0 for any bundle until
/// a feature extractor scores pitch variance, loudness and speech rate.
#[derive(Debug, Clone, Default)]
pub struct ProsodyDetector {
    pub enabled: bool,
}

impl SecondarySignal for ProsodyDetector {
    fn estimate(&self, _features: &FeatureBundle) -> f64 {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub final_prob: f64,
    pub text_prob: f64,
    /// None when no secondary reading took part in the fusion.
    pub secondary_prob: Option<f64>,
    pub is_crisis: bool,
    pub is_stop: bool,
    pub match_counts: BTreeMap<SignalCategory, u32>,
}

/// Weighted fusion of the text classifier with an optional secondary signal.
/// Crisis and stop flags always come from text alone.
pub struct FusionDetector {
    text: TextSignalClassifier,
    secondary: Box<dyn SecondarySignal>,
    secondary_enabled: bool,
    text_weight: f64,
    secondary_weight: f64,
}

impl FusionDetector {
    pub fn new(text_weight: f64, secondary_weight: f64, secondary: Box<dyn SecondarySignal>) -> Self {
        Self {
            text: TextSignalClassifier::new(),
            secondary,
            secondary_enabled: true,
            text_weight,
            secondary_weight,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let mut detector = Self::new(
            settings.text_weight,
            settings.audio_weight,
            Box::new(ProsodyDetector {
                enabled: settings.enable_audio,
            }),
        );
        detector.secondary_enabled = settings.enable_audio;
        detector
    }

    pub fn classifier(&self) -> &TextSignalClassifier {
        &self.text
    }

    /// Classifies `text` and fuses in `features` when the secondary channel
    /// is enabled and a bundle was supplied. Without one, the text
    /// probability stands alone.
    pub fn detect(&self, text: &str, features: Option<&FeatureBundle>) -> Detection {
        let TextSignal {
            distress_prob: text_prob,
            is_crisis,
            is_stop,
            match_counts,
        } = self.text.classify(text);

        let secondary_prob = features
            .filter(|_| self.secondary_enabled)
            .map(|bundle| self.secondary.estimate(bundle).clamp(0.0, 1.0));

        let fused = match secondary_prob {
            Some(audio_prob) => self.text_weight * text_prob + self.secondary_weight * audio_prob,
            None => text_prob,
        };

        Detection {
            final_prob: fused.clamp(0.0, 1.0),
            text_prob,
            secondary_prob,
            is_crisis,
            is_stop,
            match_counts,
        }
    }
}
