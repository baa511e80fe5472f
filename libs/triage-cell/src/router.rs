use std::sync::Arc;
use axum::{
    Router,
    routing::post,
};

use crate::handlers::classify_symptoms;
use crate::SeverityClassifier;

pub fn triage_routes(classifier: Arc<SeverityClassifier>) -> Router {
    Router::new()
        .route("/", post(classify_symptoms))
        .with_state(classifier)
}
