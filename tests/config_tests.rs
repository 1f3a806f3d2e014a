use std::collections::HashMap;
use std::time::Duration;

use empathlens::config::{ConfigError, Settings};
use empathlens::triage::TriageService;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_defaults_are_valid() {
    let settings = Settings::default();
    assert_eq!(settings.validate(), Ok(()));

    assert_eq!(settings.session_timeout(), Duration::from_secs(30 * 60));
    assert_eq!(settings.intervention_cooldown(), Duration::from_secs(30));
    assert_eq!(settings.escalation_timeout(), Duration::from_secs(120));
    assert_eq!(settings.collaborator_timeout(), Duration::from_millis(2000));
    assert_eq!(settings.max_response_words, 18);
}

#[test]
fn test_environment_overrides() {
    let settings = Settings::from_lookup(lookup(&[
        ("EMPATHLENS_TEXT_WEIGHT", "0.7"),
        ("EMPATHLENS_AUDIO_WEIGHT", "0.3"),
        ("EMPATHLENS_ENABLE_AUDIO", "true"),
        ("EMPATHLENS_CONFIRMATION_WINDOW", " 3 "),
        ("UNRELATED", "ignored"),
    ]))
    .expect("overrides are valid");

    assert_eq!(settings.text_weight, 0.7);
    assert_eq!(settings.audio_weight, 0.3);
    assert!(settings.enable_audio);
    assert_eq!(settings.confirmation_window, 3);
    assert_eq!(settings.session_timeout_minutes, 30, "untouched fields keep defaults");
}

#[test]
fn test_unparsable_value() {
    let err = Settings::from_lookup(lookup(&[("EMPATHLENS_SESSION_TIMEOUT_MINUTES", "soon")])).unwrap_err();
    assert_eq!(
        err,
        ConfigError::Unparsable {
            key: "EMPATHLENS_SESSION_TIMEOUT_MINUTES".to_string(),
            value: "soon".to_string(),
        }
    );
}

#[test]
fn test_weight_validation() {
    let err = Settings::from_lookup(lookup(&[("EMPATHLENS_TEXT_WEIGHT", "1.5")])).unwrap_err();
    assert!(matches!(err, ConfigError::WeightOutOfRange { name: "text_weight", .. }));

    let err = Settings::from_lookup(lookup(&[("EMPATHLENS_TEXT_WEIGHT", "0.9")])).unwrap_err();
    assert!(matches!(err, ConfigError::WeightSumTooLarge(_)), "0.9 + 0.4 exceeds 1");
}

#[test]
fn test_zero_durations_rejected() {
    let settings = Settings {
        intervention_cooldown_seconds: 0,
        ..Settings::default()
    };
    assert_eq!(settings.validate(), Err(ConfigError::NonPositive("intervention_cooldown_seconds")));

    let settings = Settings {
        max_response_words: 0,
        ..Settings::default()
    };
    assert_eq!(settings.validate(), Err(ConfigError::NonPositive("max_response_words")));
}

#[test]
fn test_confirmation_window_bounds() {
    for window in [0, 6] {
        let settings = Settings {
            confirmation_window: window,
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::ConfirmationWindow { value, max: 5 }) if value == window
        ));
    }
}

#[test]
fn test_service_refuses_invalid_settings() {
    let settings = Settings {
        audio_weight: -0.1,
        ..Settings::default()
    };
    let err = TriageService::new(settings).err().expect("construction must fail");
    println!("rejected with: {err}");
    assert!(matches!(err, ConfigError::WeightOutOfRange { name: "audio_weight", .. }));
}
