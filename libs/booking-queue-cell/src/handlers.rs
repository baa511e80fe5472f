use std::sync::Arc;
use axum::{
    extract::State,
    response::Json,
};
use serde_json::{json, Value};
use tracing::debug;

use shared_models::error::AppError;

use crate::{QueueSnapshot, QueueStats, Scheduler};

/// Both lanes in rank order, for the doctor dashboard.
pub async fn get_queue_snapshot(
    State(scheduler): State<Arc<Scheduler>>,
) -> Result<Json<QueueSnapshot>, AppError> {
    let snapshot = scheduler.snapshot();
    debug!(
        "Queue snapshot: {} emergency, {} routine",
        snapshot.emergency.len(),
        snapshot.routine.len()
    );
    Ok(Json(snapshot))
}

pub async fn get_queue_stats(
    State(scheduler): State<Arc<Scheduler>>,
) -> Result<Json<QueueStats>, AppError> {
    Ok(Json(scheduler.stats()))
}

/// Peek at the entry the next free doctor should take.
pub async fn get_next_for_assignment(
    State(scheduler): State<Arc<Scheduler>>,
) -> Result<Json<Value>, AppError> {
    match scheduler.next_for_assignment() {
        Some(next) => Ok(Json(json!({
            "available": true,
            "entry": next.entry,
            "position": next.position
        }))),
        None => Ok(Json(json!({
            "available": false,
            "entry": null
        }))),
    }
}
