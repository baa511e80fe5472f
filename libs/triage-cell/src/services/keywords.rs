use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

use shared_models::{MAX_SEVERITY, MIN_SEVERITY};

use crate::error::TriageError;
use crate::services::classifier::SymptomScorer;

/// Score used when no rule matches.
pub const BASELINE_SEVERITY: u8 = 2;

/// Rules at or above this severity count as red flags for the compounding bonus.
const RED_FLAG_SEVERITY: u8 = 7;

struct SymptomRule {
    regex: Regex,
    severity: u8,
    description: &'static str,
}

fn rule(pattern: &str, severity: u8, description: &'static str) -> SymptomRule {
    SymptomRule {
        regex: Regex::new(pattern).expect("Invalid symptom rule pattern"),
        severity,
        description,
    }
}

static SYMPTOM_RULES: LazyLock<Vec<SymptomRule>> = LazyLock::new(|| {
    vec![
        rule(r"(?i)\b(?:unconscious|unresponsive|not\s+breathing|no\s+pulse|cardiac\s+arrest)\b", 10, "loss of consciousness or circulation"),
        rule(r"(?i)\b(?:severe|heavy|uncontrolled)\s+bleeding\b|\bhemorrhag", 9, "major bleeding"),
        rule(r"(?i)\b(?:stroke|slurred\s+speech|face\s+drooping|facial\s+droop)\b", 9, "stroke signs"),
        rule(r"(?i)\bseizures?\b|\bconvuls", 9, "seizure"),
        rule(r"(?i)\banaphyla|\bthroat\s+(?:closing|swelling)\b", 9, "anaphylaxis"),
        rule(r"(?i)\bchest\s+(?:pain|pressure|tightness)\b", 8, "chest pain"),
        rule(r"(?i)\b(?:shortness\s+of\s+breath|difficulty\s+breathing|can'?t\s+breathe|breathless)", 8, "breathing difficulty"),
        rule(r"(?i)\bsuicid|\bself[-\s]harm\b", 8, "self-harm risk"),
        rule(r"(?i)\b(?:fracture|broken\s+(?:bone|arm|leg|wrist|ankle))\b", 7, "suspected fracture"),
        rule(r"(?i)\bhigh\s+fever\b", 6, "high fever"),
        rule(r"(?i)\b(?:abdominal|stomach)\s+pain\b", 5, "abdominal pain"),
        rule(r"(?i)\bfever\b", 5, "fever"),
        rule(r"(?i)\bvomit", 5, "vomiting"),
        rule(r"(?i)\bdizz", 5, "dizziness"),
        rule(r"(?i)\b(?:headache|migraine)\b", 4, "headache"),
        rule(r"(?i)\bback\s+pain\b", 4, "back pain"),
        rule(r"(?i)\bdiarrh", 4, "diarrhoea"),
        rule(r"(?i)\bcough", 3, "cough"),
        rule(r"(?i)\bsore\s+throat\b", 3, "sore throat"),
        rule(r"(?i)\brash\b|\bitch", 3, "skin irritation"),
        rule(r"(?i)\b(?:runny\s+nose|sneez|congest)", 2, "cold symptoms"),
    ]
});

static INTENSIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:severe|worst|intense|unbearable|excruciating)\b").expect("Invalid intensifier pattern")
});

static SOFTENER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:mild|slight|minor)\b").expect("Invalid softener pattern")
});

/// Deterministic rule-based scorer. Same text, same rules, same score.
#[derive(Debug, Default, Clone)]
pub struct KeywordScorer;

impl KeywordScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn score_text(&self, symptom_text: &str) -> u8 {
        let matched: Vec<&SymptomRule> = SYMPTOM_RULES
            .iter()
            .filter(|r| r.regex.is_match(symptom_text))
            .collect();

        let Some(highest) = matched.iter().map(|r| r.severity).max() else {
            return BASELINE_SEVERITY;
        };

        let mut score = i16::from(highest);

        let red_flags = matched.iter().filter(|r| r.severity >= RED_FLAG_SEVERITY).count();
        if red_flags >= 2 {
            score += 1;
        }

        if INTENSIFIER.is_match(symptom_text) {
            score += 1;
        } else if SOFTENER.is_match(symptom_text) {
            score -= 1;
        }

        score.clamp(i16::from(MIN_SEVERITY), i16::from(MAX_SEVERITY)) as u8
    }

    /// Descriptions of the rules a text triggers, for diagnostics.
    pub fn matched_rules(&self, symptom_text: &str) -> Vec<&'static str> {
        SYMPTOM_RULES
            .iter()
            .filter(|r| r.regex.is_match(symptom_text))
            .map(|r| r.description)
            .collect()
    }
}

#[async_trait]
impl SymptomScorer for KeywordScorer {
    async fn score(&self, symptom_text: &str) -> Result<i64, TriageError> {
        Ok(i64::from(self.score_text(symptom_text)))
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}
