use std::cmp::Ordering;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::TriageOutcome;

use crate::models::{DoctorAvailability, DoctorRecommendation, SpecialtyNeed};
use crate::services::roster::RosterProvider;

const KEYWORD_WEIGHT: u32 = 2;
const EMERGENCY_WEIGHT: u32 = 2;
const FALLBACK_WEIGHT: u32 = 1;

pub const EMERGENCY_MEDICINE: &str = "Emergency Medicine";
pub const GENERAL_MEDICINE: &str = "General Medicine";

/// Symptom patterns and the specialty they point to. Keywords must start a
/// word, so "kitchen" never reads as "itch".
const SPECIALTY_PATTERNS: &[(&str, &str)] = &[
    (r"(?i)\b(?:chest|heart(?:beat)?s?|palpitat\w*)\b", "Cardiology"),
    (r"(?i)\b(?:breath\w*|cough\w*|asthma\w*|wheez\w*)\b", "Pulmonology"),
    (r"(?i)\b(?:rash\w*|skin|itch\w*)\b", "Dermatology"),
    (r"(?i)\b(?:headaches?|seizures?|numb\w*|dizz\w*)\b", "Neurology"),
    (r"(?i)\b(?:child\w*|infants?|bab(?:y|ies))\b", "Pediatrics"),
    (r"(?i)\b(?:anxi\w*|depress\w*|panic\w*)\b", "Psychiatry"),
    (r"(?i)\b(?:bones?|fractur\w*|joints?|sprain\w*)\b", "Orthopedics"),
];

static SPECIALTY_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    SPECIALTY_PATTERNS
        .iter()
        .map(|&(pattern, specialty)| {
            (Regex::new(pattern).expect("Invalid specialty pattern"), specialty)
        })
        .collect()
});

/// Specialties an outcome calls for, strongest first.
pub fn implied_specialties(outcome: &TriageOutcome) -> Vec<SpecialtyNeed> {
    let text = outcome.symptom_text.as_str();
    let mut needs: Vec<SpecialtyNeed> = Vec::new();

    if outcome.is_emergency {
        needs.push(SpecialtyNeed {
            specialty: EMERGENCY_MEDICINE,
            weight: EMERGENCY_WEIGHT,
        });
    }

    for (regex, specialty) in SPECIALTY_RULES.iter() {
        if regex.is_match(text) {
            needs.push(SpecialtyNeed {
                specialty: *specialty,
                weight: KEYWORD_WEIGHT,
            });
        }
    }

    needs.push(SpecialtyNeed {
        specialty: GENERAL_MEDICINE,
        weight: FALLBACK_WEIGHT,
    });

    needs
}

/// Ranks available doctors for a triage outcome.
pub struct DoctorMatcher {
    roster: Arc<dyn RosterProvider>,
    roster_timeout: Duration,
}

impl DoctorMatcher {
    pub fn new(roster: Arc<dyn RosterProvider>, roster_timeout: Duration) -> Self {
        Self {
            roster,
            roster_timeout,
        }
    }

    pub fn from_config(roster: Arc<dyn RosterProvider>, config: &AppConfig) -> Self {
        Self::new(roster, Duration::from_millis(config.roster_timeout_ms))
    }

    /// Ordered doctor ids, at most `limit`. An empty roster or no available
    /// doctor yields an empty list.
    pub fn recommend(
        &self,
        outcome: &TriageOutcome,
        roster: &[DoctorAvailability],
        limit: usize,
    ) -> Vec<Uuid> {
        self.recommend_detailed(outcome, roster, limit)
            .into_iter()
            .map(|r| r.doctor_id)
            .collect()
    }

    pub fn recommend_detailed(
        &self,
        outcome: &TriageOutcome,
        roster: &[DoctorAvailability],
        limit: usize,
    ) -> Vec<DoctorRecommendation> {
        let needs = implied_specialties(outcome);

        let mut ranked: Vec<DoctorRecommendation> = roster
            .iter()
            .filter(|doctor| doctor.is_available)
            .map(|doctor| DoctorRecommendation {
                doctor_id: doctor.doctor_id,
                display_name: doctor.display_name.clone(),
                specialty_match: match_score(doctor, &needs),
                current_load: doctor.current_load,
                rating: doctor.rating,
            })
            .collect();

        ranked.sort_by(compare_recommendations);
        ranked.truncate(limit);

        debug!(
            "Ranked {} of {} roster entries for severity {}",
            ranked.len(),
            roster.len(),
            outcome.severity_score
        );

        ranked
    }

    /// Reads the roster from the provider, bounded by the configured timeout.
    /// A slow or failing provider counts as an empty roster.
    #[instrument(skip(self, outcome), fields(severity = outcome.severity_score))]
    pub async fn recommend_from_provider(
        &self,
        outcome: &TriageOutcome,
        limit: usize,
    ) -> Vec<DoctorRecommendation> {
        let roster = match tokio::time::timeout(self.roster_timeout, self.roster.snapshot()).await {
            Ok(Ok(roster)) => roster,
            Ok(Err(e)) => {
                warn!("Roster provider failed, treating roster as empty: {}", e);
                Vec::new()
            }
            Err(_) => {
                warn!("Roster read timed out after {:?}, treating roster as empty", self.roster_timeout);
                Vec::new()
            }
        };

        let recommendations = self.recommend_detailed(outcome, &roster, limit);
        info!("Recommended {} doctors", recommendations.len());
        recommendations
    }
}

fn match_score(doctor: &DoctorAvailability, needs: &[SpecialtyNeed]) -> u32 {
    needs
        .iter()
        .filter(|need| doctor.has_specialty(need.specialty))
        .map(|need| need.weight)
        .sum()
}

// Match desc, load asc, rating desc with unrated last, then id for determinism.
fn compare_recommendations(a: &DoctorRecommendation, b: &DoctorRecommendation) -> Ordering {
    b.specialty_match
        .cmp(&a.specialty_match)
        .then(a.current_load.cmp(&b.current_load))
        .then_with(|| match (a.rating, b.rating) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then(a.doctor_id.cmp(&b.doctor_id))
}
