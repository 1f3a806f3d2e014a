use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Keyword families the classifier counts. Categories are independent;
/// one message can hit several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalCategory {
    Crisis,
    Panic,
    Overwhelmed,
    Rising,
    Recovery,
    Stop,
}

impl SignalCategory {
    pub const ALL: [SignalCategory; 6] = [
        SignalCategory::Crisis,
        SignalCategory::Panic,
        SignalCategory::Overwhelmed,
        SignalCategory::Rising,
        SignalCategory::Recovery,
        SignalCategory::Stop,
    ];

    fn patterns(&self) -> &'static [&'static str] {
        match self {
            SignalCategory::Crisis => &[
                r"\bhurt\s+myself\b",
                r"\bkill\s+myself\b",
                r"\bsuicide\b",
                r"\bend\s+it\s+all\b",
                r"\bdon'?t\s+want\s+to\s+live\b",
                r"\bwant\s+to\s+die\b",
                r"\bno\s+point\s+(in\s+)?living\b",
                r"\bcan'?t\s+go\s+on\b",
            ],
            SignalCategory::Panic => &[
                r"\bpanic\s+attack\b",
                r"\bcan'?t\s+breathe\b",
                r"\bheart\s+(is\s+)?racing\b",
                r"\blosing\s+control\b",
                r"\bgoing\s+to\s+die\b",
                r"\bchest\s+(is\s+)?tight\b",
                r"\bfreaking\s+out\b",
                r"\bterri(fied|ble)\b",
            ],
            SignalCategory::Overwhelmed => &[
                r"\btoo\s+much\b",
                r"\bover(whelm|load)(ed|ing)?\b",
                r"\bshut(ting)?\s+down\b",
                r"\bcan'?t\s+handle\b",
                r"\bcan'?t\s+think\b",
                r"\bparalyz(ed|ing)\b",
                r"\bfrozen\b",
                r"\bcollapsing\b",
            ],
            SignalCategory::Rising => &[
                r"\banxious\b",
                r"\bworri(ed|es)\b",
                r"\bnervous\b",
                r"\bstress(ed|ful)\b",
                r"\bscared\b",
                r"\buneasy\b",
                r"\btense\b",
                r"\bon\s+edge\b",
            ],
            SignalCategory::Recovery => &[
                r"\bfeeling\s+better\b",
                r"\bcalm(er|ing)\b",
                r"\bsettl(ing|ed)\b",
                r"\brelax(ed|ing)\b",
                r"\bimproved\b",
                r"\beasier\b",
            ],
            SignalCategory::Stop => &[
                r"\bstop\b",
                r"\bend\s+(this|session)\b",
                r"\bno\s+more\b",
                r"\bleave\s+me\s+alone\b",
            ],
        }
    }
}

// Per-match weights for the non-crisis score.
const PANIC_WEIGHT: f64 = 0.85;
const OVERWHELMED_WEIGHT: f64 = 0.80;
const RISING_WEIGHT: f64 = 0.40;
const NON_CRISIS_CAP: f64 = 0.95;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextSignal {
    pub distress_prob: f64,
    pub is_crisis: bool,
    pub is_stop: bool,
    pub match_counts: BTreeMap<SignalCategory, u32>,
}

impl TextSignal {
    pub fn count(&self, category: SignalCategory) -> u32 {
        self.match_counts.get(&category).copied().unwrap_or(0)
    }
}

/// Rule-based classifier: lowercases, counts category matches, derives a
/// distress probability. Stateless once built.
#[derive(Debug, Clone)]
pub struct TextSignalClassifier {
    matchers: Vec<(SignalCategory, Regex)>,
}

impl TextSignalClassifier {
    pub fn new() -> Self {
        let matchers = SignalCategory::ALL
            .iter()
            .map(|category| {
                let joined = format!("(?i){}", category.patterns().join("|"));
                // The pattern table is static, so a failure here is a programming error.
                let regex = Regex::new(&joined).expect("static signal patterns must compile");
                (*category, regex)
            })
            .collect();
        Self { matchers }
    }

    pub fn classify(&self, text: &str) -> TextSignal {
        let normalized = text.trim().to_lowercase();
        if normalized.is_empty() {
            return TextSignal::default();
        }

        let match_counts: BTreeMap<SignalCategory, u32> = self
            .matchers
            .iter()
            .map(|(category, regex)| (*category, regex.find_iter(&normalized).count() as u32))
            .collect();

        let count = |c: SignalCategory| match_counts.get(&c).copied().unwrap_or(0);

        TextSignal {
            distress_prob: probability(
                count(SignalCategory::Recovery),
                count(SignalCategory::Crisis),
                count(SignalCategory::Panic),
                count(SignalCategory::Overwhelmed),
                count(SignalCategory::Rising),
            ),
            is_crisis: count(SignalCategory::Crisis) > 0,
            is_stop: count(SignalCategory::Stop) > 0,
            match_counts,
        }
    }
}

impl Default for TextSignalClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// First matching rule wins: recovery, then crisis, then the weighted score.
/// Recovery outranks crisis for the number only; the crisis flag is
/// reported separately and still drives the state machine.
fn probability(recovery: u32, crisis: u32, panic: u32, overwhelmed: u32, rising: u32) -> f64 {
    if recovery > 0 {
        return (0.2 - recovery as f64 * 0.1).max(0.0);
    }
    if crisis > 0 {
        return 1.0;
    }
    let score = panic as f64 * PANIC_WEIGHT
        + overwhelmed as f64 * OVERWHELMED_WEIGHT
        + rising as f64 * RISING_WEIGHT;
    (score / 2.0).min(NON_CRISIS_CAP)
}
