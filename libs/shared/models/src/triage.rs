use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;
use uuid::Uuid;

use shared_config::SeverityThresholds;

pub const MIN_SEVERITY: u8 = 1;
pub const MAX_SEVERITY: u8 = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SeverityLabel {
    Low,
    Moderate,
    High,
    Critical,
}

impl fmt::Display for SeverityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeverityLabel::Low => write!(f, "Low"),
            SeverityLabel::Moderate => write!(f, "Moderate"),
            SeverityLabel::High => write!(f, "High"),
            SeverityLabel::Critical => write!(f, "Critical"),
        }
    }
}

/// The two independent priority lanes a request can be admitted into.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QueueClass {
    Emergency,
    Routine,
}

impl QueueClass {
    pub fn for_outcome(outcome: &TriageOutcome) -> Self {
        if outcome.is_emergency {
            QueueClass::Emergency
        } else {
            QueueClass::Routine
        }
    }

    /// Lanes in the order doctors drain them.
    pub fn drain_order() -> [QueueClass; 2] {
        [QueueClass::Emergency, QueueClass::Routine]
    }
}

impl fmt::Display for QueueClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueClass::Emergency => write!(f, "emergency"),
            QueueClass::Routine => write!(f, "routine"),
        }
    }
}

/// Maps a severity score onto its label and emergency routing.
///
/// Built from configured thresholds; an inconsistent threshold set is replaced
/// by the default policy so labels stay monotonic in the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeverityPolicy {
    thresholds: SeverityThresholds,
}

impl Default for SeverityPolicy {
    fn default() -> Self {
        Self {
            thresholds: SeverityThresholds::default(),
        }
    }
}

impl SeverityPolicy {
    pub fn new(thresholds: SeverityThresholds) -> Self {
        if thresholds.is_valid() {
            Self { thresholds }
        } else {
            warn!("Rejecting severity thresholds {:?}, falling back to defaults", thresholds);
            Self::default()
        }
    }

    pub fn thresholds(&self) -> SeverityThresholds {
        self.thresholds
    }

    pub fn label_for(&self, score: u8) -> SeverityLabel {
        if score <= self.thresholds.low_max {
            SeverityLabel::Low
        } else if score <= self.thresholds.moderate_max {
            SeverityLabel::Moderate
        } else if score <= self.thresholds.high_max {
            SeverityLabel::High
        } else {
            SeverityLabel::Critical
        }
    }

    pub fn is_emergency(&self, score: u8) -> bool {
        score >= self.thresholds.emergency_threshold
    }

    /// Checks that an outcome built elsewhere agrees with this policy: the
    /// label and emergency flag must be the ones its score maps to.
    /// The score range itself is left to admission.
    pub fn verify(&self, outcome: &TriageOutcome) -> Result<(), String> {
        let expected_label = self.label_for(outcome.severity_score);
        if outcome.severity_label != expected_label {
            return Err(format!(
                "severity label {} does not match score {} (expected {})",
                outcome.severity_label, outcome.severity_score, expected_label
            ));
        }

        let expected_emergency = self.is_emergency(outcome.severity_score);
        if outcome.is_emergency != expected_emergency {
            return Err(format!(
                "emergency flag {} does not match score {}",
                outcome.is_emergency, outcome.severity_score
            ));
        }

        Ok(())
    }

    /// Builds an immutable outcome. Returns `None` when the score is outside 1..=10.
    pub fn outcome(&self, symptom_text: impl Into<String>, score: u8) -> Option<TriageOutcome> {
        if !(MIN_SEVERITY..=MAX_SEVERITY).contains(&score) {
            return None;
        }

        Some(TriageOutcome {
            outcome_id: Uuid::new_v4(),
            symptom_text: symptom_text.into(),
            severity_score: score,
            severity_label: self.label_for(score),
            is_emergency: self.is_emergency(score),
            assessed_at: Utc::now(),
        })
    }
}

/// Result of one intake classification. Re-triage produces a new outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriageOutcome {
    pub outcome_id: Uuid,
    pub symptom_text: String,
    pub severity_score: u8,
    pub severity_label: SeverityLabel,
    pub is_emergency: bool,
    pub assessed_at: DateTime<Utc>,
}

impl TriageOutcome {
    pub fn queue_class(&self) -> QueueClass {
        QueueClass::for_outcome(self)
    }
}
