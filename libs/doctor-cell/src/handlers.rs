use std::sync::Arc;

use axum::{
    extract::State,
    Json,
};
use serde_json::{json, Value};
use tracing::debug;

use shared_models::error::AppError;

use crate::models::{
    DoctorError, RecommendRequest, DEFAULT_RECOMMENDATION_LIMIT, MAX_RECOMMENDATION_LIMIT,
};
use crate::services::matching::DoctorMatcher;

#[axum::debug_handler]
pub async fn recommend_doctors(
    State(matcher): State<Arc<DoctorMatcher>>,
    Json(request): Json<RecommendRequest>,
) -> Result<Json<Value>, AppError> {
    let limit = request.limit.unwrap_or(DEFAULT_RECOMMENDATION_LIMIT);
    if limit == 0 || limit > MAX_RECOMMENDATION_LIMIT {
        return Err(DoctorError::ValidationError(format!(
            "limit must be between 1 and {}",
            MAX_RECOMMENDATION_LIMIT
        ))
        .into());
    }

    debug!("Recommending up to {} doctors for outcome {}", limit, request.outcome.outcome_id);

    let doctors = matcher.recommend_from_provider(&request.outcome, limit).await;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}
