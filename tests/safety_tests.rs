use empathlens::safety::{sanitize_user_input, SafetyFilter, DEFAULT_MAX_MESSAGE_CHARS};

#[test]
fn test_sanitize_collapses_whitespace() {
    assert_eq!(sanitize_user_input("  I   can't\n\tbreathe  ", 500), "I can't breathe");
    assert_eq!(sanitize_user_input("   ", 500), "");
}

#[test]
fn test_sanitize_straightens_quotes() {
    let cleaned = sanitize_user_input("I don\u{2019}t want \u{201C}this\u{201D}", 500);
    assert_eq!(cleaned, "I don't want \"this\"");
}

#[test]
fn test_sanitize_truncates_by_characters() {
    let long = "é".repeat(DEFAULT_MAX_MESSAGE_CHARS + 20);
    let cleaned = sanitize_user_input(&long, DEFAULT_MAX_MESSAGE_CHARS);

    assert_eq!(cleaned.chars().count(), DEFAULT_MAX_MESSAGE_CHARS);
    assert_eq!(sanitize_user_input("short", DEFAULT_MAX_MESSAGE_CHARS), "short");
}

#[test]
fn test_filter_empty_text() {
    let outcome = SafetyFilter::new(18).filter("   ");
    assert_eq!(outcome.text, "Take a slow breath.");
    assert!(outcome.is_safe);
}

#[test]
fn test_filter_rejects_medical_advice() {
    let filter = SafetyFilter::new(18);

    for text in [
        "Maybe talk to a psychiatrist",
        "This could be a panic disorder",
        "Therapy can help",
        "Take your medication",
    ] {
        let outcome = filter.filter(text);
        assert!(!outcome.is_safe, "{text:?} should be rejected");
        assert_eq!(outcome.text, "Let's focus on your breath right now.");
    }
}

#[test]
fn test_filter_rewrites_phrases() {
    let filter = SafetyFilter::new(18);

    assert_eq!(filter.filter("shut your eyes for a moment").text, "Soften your gaze for a moment.");
    assert_eq!(filter.filter("Relax completely now").text, "Let your shoulders drop now.");
    assert_eq!(filter.filter("don't worry, breathe").text, "You're safe right now, breathe.");
}

#[test]
fn test_filter_truncates_and_punctuates() {
    let filter = SafetyFilter::new(18);
    let long: Vec<String> = (1..=25).map(|i| format!("word{i}")).collect();

    let outcome = filter.filter(&long.join(" "));
    assert!(outcome.is_safe);
    assert_eq!(outcome.text.split_whitespace().count(), 18);
    assert!(outcome.text.ends_with("word18."), "got {:?}", outcome.text);
    assert!(outcome.text.starts_with("Word1 "), "first letter is capitalised");
}

#[test]
fn test_filter_keeps_existing_punctuation() {
    let filter = SafetyFilter::new(18);

    assert_eq!(filter.filter("how does your chest feel?").text, "How does your chest feel?");
    assert!(filter.is_safe_length("one two three"));
    assert!(!SafetyFilter::new(2).is_safe_length("one two three"));
}
