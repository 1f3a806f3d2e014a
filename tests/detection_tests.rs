use empathlens::config::Settings;
use empathlens::detect::{
    FeatureBundle, FusionDetector, ProsodyDetector, SecondarySignal, SignalCategory, TextSignalClassifier,
};

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

struct Fixed(f64);

impl SecondarySignal for Fixed {
    fn estimate(&self, _features: &FeatureBundle) -> f64 {
        self.0
    }
}

fn features() -> FeatureBundle {
    FeatureBundle::new().with("pitch_variance", 0.7).with("loudness", 0.3)
}

#[test]
fn test_crisis_message_is_certain() {
    let classifier = TextSignalClassifier::new();
    let signal = classifier.classify("I don't want to live anymore");

    assert!(signal.is_crisis, "crisis phrase must set the flag");
    assert!(approx(signal.distress_prob, 1.0), "crisis without recovery is 1.0, got {}", signal.distress_prob);
    assert_eq!(signal.count(SignalCategory::Crisis), 1);
}

#[test]
fn test_panic_attack_scores_two_matches() {
    let classifier = TextSignalClassifier::new();
    let signal = classifier.classify("I'm having a panic attack, I can't breathe");

    assert_eq!(signal.count(SignalCategory::Panic), 2);
    assert!(approx(signal.distress_prob, 0.85), "expected 1.7 / 2, got {}", signal.distress_prob);
    assert!(!signal.is_crisis);
    assert!(!signal.is_stop);
}

#[test]
fn test_rising_words_score() {
    let classifier = TextSignalClassifier::new();
    let signal = classifier.classify("I feel anxious and stressed");

    assert_eq!(signal.count(SignalCategory::Rising), 2);
    assert!(approx(signal.distress_prob, 0.4), "got {}", signal.distress_prob);
}

#[test]
fn test_stop_word_sets_flag() {
    let classifier = TextSignalClassifier::new();

    assert!(classifier.classify("stop").is_stop);
    assert!(classifier.classify("Please just leave me alone").is_stop);
    assert!(!classifier.classify("unstoppable").is_stop, "word boundary must hold");
}

#[test]
fn test_recovery_lowers_probability() {
    let classifier = TextSignalClassifier::new();

    let one = classifier.classify("I'm feeling better now");
    assert_eq!(one.count(SignalCategory::Recovery), 1);
    assert!(approx(one.distress_prob, 0.1), "got {}", one.distress_prob);

    let two = classifier.classify("feeling better, much calmer");
    assert_eq!(two.count(SignalCategory::Recovery), 2);
    assert!(approx(two.distress_prob, 0.0), "two recovery hits floor at zero, got {}", two.distress_prob);
}

#[test]
fn test_recovery_outranks_crisis_for_probability_only() {
    // Pinned on purpose: the number follows the recovery rule while the
    // crisis flag still reaches the state machine.
    let classifier = TextSignalClassifier::new();
    let signal = classifier.classify("I'm calmer now but I still want to die");

    assert_eq!(signal.count(SignalCategory::Recovery), 1);
    assert_eq!(signal.count(SignalCategory::Crisis), 1);
    assert!(approx(signal.distress_prob, 0.1), "got {}", signal.distress_prob);
    assert!(signal.is_crisis, "crisis flag must survive the recovery rule");
}

#[test]
fn test_empty_input_is_zero_result() {
    let classifier = TextSignalClassifier::new();

    for text in ["", "   ", "\n\t"] {
        let signal = classifier.classify(text);
        assert_eq!(signal.distress_prob, 0.0);
        assert!(!signal.is_crisis);
        assert!(!signal.is_stop);
        assert!(signal.match_counts.is_empty(), "no categories for empty input");
    }
}

#[test]
fn test_all_categories_reported_for_text() {
    let classifier = TextSignalClassifier::new();
    let signal = classifier.classify("just a normal afternoon");

    assert_eq!(signal.match_counts.len(), SignalCategory::ALL.len());
    assert!(signal.match_counts.values().all(|&c| c == 0));
    assert_eq!(signal.distress_prob, 0.0);
}

#[test]
fn test_case_insensitive_and_repeated_matches() {
    let classifier = TextSignalClassifier::new();
    let signal = classifier.classify("TOO MUCH. too much. Too Much.");

    assert_eq!(signal.count(SignalCategory::Overwhelmed), 3);
    assert!(approx(signal.distress_prob, 0.95), "non-crisis score is capped, got {}", signal.distress_prob);
}

#[test]
fn test_probability_always_in_unit_interval() {
    let classifier = TextSignalClassifier::new();
    let samples = [
        "panic attack panic attack panic attack can't breathe heart racing",
        "overwhelmed overloaded shutting down frozen paralyzed collapsing",
        "anxious nervous tense scared uneasy on edge worried stressed",
        "relaxed settled calmer improved easier feeling better",
        "suicide",
        "hello",
    ];

    for text in samples {
        let p = classifier.classify(text).distress_prob;
        assert!((0.0..=1.0).contains(&p), "{text:?} produced {p}");
    }
}

#[test]
fn test_fusion_without_features_uses_text_alone() {
    let detector = FusionDetector::new(0.6, 0.4, Box::new(Fixed(1.0)));
    let detection = detector.detect("I'm having a panic attack, I can't breathe", None);

    assert!(approx(detection.final_prob, 0.85));
    assert_eq!(detection.secondary_prob, None);
}

#[test]
fn test_fusion_weights_secondary_reading() {
    let detector = FusionDetector::new(0.6, 0.4, Box::new(Fixed(1.0)));
    let detection = detector.detect("I feel anxious and stressed", Some(&features()));

    assert_eq!(detection.secondary_prob, Some(1.0));
    assert!(approx(detection.final_prob, 0.6 * 0.4 + 0.4), "got {}", detection.final_prob);
    assert!(approx(detection.text_prob, 0.4));
}

#[test]
fn test_fusion_clamps_out_of_range_inputs() {
    let detector = FusionDetector::new(1.0, 1.0, Box::new(Fixed(7.5)));
    let detection = detector.detect("I want to die", Some(&features()));

    assert_eq!(detection.secondary_prob, Some(1.0), "secondary estimate is clamped first");
    assert_eq!(detection.final_prob, 1.0, "fused value is clamped to 1");

    let negative = FusionDetector::new(0.5, 0.5, Box::new(Fixed(-3.0)));
    let detection = negative.detect("hello", Some(&features()));
    assert_eq!(detection.final_prob, 0.0);
}

#[test]
fn test_fusion_passes_flags_from_text() {
    let detector = FusionDetector::new(0.1, 0.9, Box::new(Fixed(0.0)));
    let detection = detector.detect("I can't go on, stop", Some(&features()));

    assert!(detection.is_crisis, "crisis comes from text regardless of weights");
    assert!(detection.is_stop);
    assert!(detection.final_prob < 0.2, "secondary dominated the number, got {}", detection.final_prob);
}

#[test]
fn test_disabled_audio_ignores_features() {
    let settings = Settings::default();
    assert!(!settings.enable_audio);

    let detector = FusionDetector::from_settings(&settings);
    let detection = detector.detect("I feel anxious and stressed", Some(&features()));

    assert_eq!(detection.secondary_prob, None);
    assert!(approx(detection.final_prob, 0.4));
}

#[test]
fn test_prosody_channel_reports_zero() {
    let prosody = ProsodyDetector { enabled: true };
    assert_eq!(prosody.estimate(&features()), 0.0);

    let settings = Settings {
        enable_audio: true,
        ..Settings::default()
    };
    let detector = FusionDetector::from_settings(&settings);
    let detection = detector.detect("I feel anxious and stressed", Some(&features()));

    assert_eq!(detection.secondary_prob, Some(0.0));
    assert!(approx(detection.final_prob, 0.6 * 0.4), "got {}", detection.final_prob);
}
