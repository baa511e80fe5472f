use std::sync::Arc;
use axum::{
    extract::State,
    response::Json,
};
use tracing::{info, warn};

use shared_models::{error::AppError, TriageOutcome};

use crate::{ClassifyRequest, SeverityClassifier};

/// Classify free-text symptoms into a triage outcome.
pub async fn classify_symptoms(
    State(classifier): State<Arc<SeverityClassifier>>,
    Json(request): Json<ClassifyRequest>,
) -> Result<Json<TriageOutcome>, AppError> {
    let outcome = classifier.classify(&request.symptoms).await.map_err(|e| {
        warn!("Triage request rejected: {}", e);
        AppError::from(e)
    })?;

    info!(
        "Triage outcome {}: {} ({}/10)",
        outcome.outcome_id, outcome.severity_label, outcome.severity_score
    );

    Ok(Json(outcome))
}
