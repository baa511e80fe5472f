use std::sync::Arc;

use axum::{
    Router,
    routing::post,
};

use crate::handlers;
use crate::services::matching::DoctorMatcher;

pub fn doctor_routes(matcher: Arc<DoctorMatcher>) -> Router {
    Router::new()
        .route("/recommend", post(handlers::recommend_doctors))
        .with_state(matcher)
}
