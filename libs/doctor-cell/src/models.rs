use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::error::AppError;
use shared_models::TriageOutcome;

/// Roster snapshot for one doctor, supplied by an external provider.
/// The engine reads it and never writes it back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoctorAvailability {
    pub doctor_id: Uuid,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub specialties: Vec<String>,
    pub is_available: bool,
    #[serde(default)]
    pub current_load: u32,
    #[serde(default)]
    pub rating: Option<f32>,
}

impl DoctorAvailability {
    pub fn has_specialty(&self, specialty: &str) -> bool {
        self.specialties
            .iter()
            .any(|s| s.trim().eq_ignore_ascii_case(specialty))
    }
}

/// A specialty the outcome calls for, with how much a match counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialtyNeed {
    pub specialty: &'static str,
    pub weight: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoctorRecommendation {
    pub doctor_id: Uuid,
    pub display_name: String,
    pub specialty_match: u32,
    pub current_load: u32,
    pub rating: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendRequest {
    pub outcome: TriageOutcome,
    pub limit: Option<usize>,
}

pub const DEFAULT_RECOMMENDATION_LIMIT: usize = 3;
pub const MAX_RECOMMENDATION_LIMIT: usize = 50;

// Error types specific to doctor operations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum DoctorError {
    RosterUnavailable(String),
    ValidationError(String),
}

impl std::fmt::Display for DoctorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DoctorError::RosterUnavailable(msg) => write!(f, "Doctor roster unavailable: {}", msg),
            DoctorError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for DoctorError {}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::RosterUnavailable(_) => AppError::Unavailable(err.to_string()),
            DoctorError::ValidationError(msg) => AppError::ValidationError(msg),
        }
    }
}
