use std::sync::Arc;
use axum::{
    Router,
    routing::get,
};

use crate::handlers::{
    get_queue_snapshot,
    get_queue_stats,
    get_next_for_assignment,
};
use crate::Scheduler;

pub fn create_booking_queue_router(scheduler: Arc<Scheduler>) -> Router {
    Router::new()
        .route("/snapshot", get(get_queue_snapshot))
        .route("/stats", get(get_queue_stats))
        .route("/next", get(get_next_for_assignment))
        .with_state(scheduler)
}
