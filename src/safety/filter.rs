use regex::Regex;

const EMPTY_REPLACEMENT: &str = "Take a slow breath.";
const MEDICAL_REPLACEMENT: &str = "Let's focus on your breath right now.";

const MEDICAL_TERMS: &[&str] = &[
    r"\bdiagnos(is|e|ed)\b",
    r"\bmedication\b",
    r"\bprescri(be|ption)\b",
    r"\bdisorder\b",
    r"\btherapy\b",
    r"\bcounseling\b",
    r"\bpsychiatri(st|c)\b",
    r"\btreatment\b",
    r"\bdoctor\b",
];

const PHRASE_REWRITES: &[(&str, &str)] = &[
    (r"\bclose\s+your\s+eyes\b", "soften your gaze"),
    (r"\bshut\s+your\s+eyes\b", "soften your gaze"),
    (r"\brelax\s+completely\b", "let your shoulders drop"),
    (r"\bdon'?t\s+worry\b", "you're safe right now"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOutcome {
    pub text: String,
    /// False when the input had to be discarded (medical content).
    pub is_safe: bool,
}

/// Post-processing for generated coaching lines: rejects medical content,
/// rewrites a few unhelpful phrases and keeps the line short and punctuated.
#[derive(Debug, Clone)]
pub struct SafetyFilter {
    max_words: usize,
    medical: Regex,
    rewrites: Vec<(Regex, &'static str)>,
}

impl SafetyFilter {
    pub fn new(max_words: usize) -> Self {
        let medical = Regex::new(&format!("(?i){}", MEDICAL_TERMS.join("|")))
            .expect("static medical patterns must compile");
        let rewrites = PHRASE_REWRITES
            .iter()
            .map(|(pattern, replacement)| {
                let regex = Regex::new(&format!("(?i){pattern}")).expect("static rewrite patterns must compile");
                (regex, *replacement)
            })
            .collect();
        Self {
            max_words: max_words.max(1),
            medical,
            rewrites,
        }
    }

    pub fn filter(&self, text: &str) -> FilterOutcome {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return FilterOutcome {
                text: EMPTY_REPLACEMENT.to_string(),
                is_safe: true,
            };
        }

        if self.medical.is_match(trimmed) {
            return FilterOutcome {
                text: MEDICAL_REPLACEMENT.to_string(),
                is_safe: false,
            };
        }

        let mut filtered = trimmed.to_string();
        for (regex, replacement) in &self.rewrites {
            filtered = regex.replace_all(&filtered, *replacement).into_owned();
        }

        let filtered = capitalize_first(&self.truncate(&filtered));
        FilterOutcome {
            text: ensure_terminal_punctuation(filtered),
            is_safe: true,
        }
    }

    pub fn is_safe_length(&self, text: &str) -> bool {
        text.split_whitespace().count() <= self.max_words
    }

    /// Cuts to `max_words` words, adding a period if the cut left none.
    pub fn truncate(&self, text: &str) -> String {
        if self.is_safe_length(text) {
            return text.to_string();
        }
        let cut = text
            .split_whitespace()
            .take(self.max_words)
            .collect::<Vec<_>>()
            .join(" ");
        ensure_terminal_punctuation(cut)
    }
}

fn ends_with_punctuation(text: &str) -> bool {
    text.ends_with(['.', '?', '!'])
}

fn ensure_terminal_punctuation(mut text: String) -> String {
    if !ends_with_punctuation(&text) {
        text.push('.');
    }
    text
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
