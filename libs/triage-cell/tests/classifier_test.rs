use std::sync::Arc;
use std::time::Duration;
use assert_matches::assert_matches;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_config::AppConfig;
use shared_models::{QueueClass, SeverityLabel, SeverityPolicy};
use triage_cell::*;

/// Backend stub returning a fixed score after an optional delay.
struct FixedScorer {
    score: i64,
    delay: Duration,
}

#[async_trait]
impl SymptomScorer for FixedScorer {
    async fn score(&self, _symptom_text: &str) -> Result<i64, TriageError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.score)
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

fn classifier_with(scorer: Arc<dyn SymptomScorer>) -> SeverityClassifier {
    SeverityClassifier::new(scorer, SeverityPolicy::default(), 200, Duration::from_millis(100))
}

fn keyword_classifier() -> SeverityClassifier {
    classifier_with(Arc::new(KeywordScorer::new()))
}

#[tokio::test]
async fn test_chest_pain_is_emergency() {
    let outcome = keyword_classifier()
        .classify("chest pain, shortness of breath")
        .await
        .expect("classification should succeed");

    assert_eq!(outcome.severity_score, 9);
    assert_eq!(outcome.severity_label, SeverityLabel::Critical);
    assert!(outcome.is_emergency);
    assert_eq!(outcome.queue_class(), QueueClass::Emergency);
    assert_eq!(outcome.symptom_text, "chest pain, shortness of breath");
}

#[tokio::test]
async fn test_routine_symptoms_stay_routine() {
    let outcome = keyword_classifier().classify("sore throat and a cough").await.unwrap();

    assert_eq!(outcome.severity_label, SeverityLabel::Low);
    assert!(!outcome.is_emergency);
}

#[tokio::test]
async fn test_identical_input_is_deterministic() {
    let classifier = keyword_classifier();
    let first = classifier.classify("fever and vomiting").await.unwrap();
    let second = classifier.classify("fever and vomiting").await.unwrap();

    assert_eq!(first.severity_score, second.severity_score);
    assert_eq!(first.severity_label, second.severity_label);
    assert_ne!(first.outcome_id, second.outcome_id, "each intake is a new outcome");
}

#[tokio::test]
async fn test_empty_input_is_rejected() {
    let result = keyword_classifier().classify("   ").await;
    assert_matches!(result, Err(TriageError::InvalidInput(_)));
}

#[tokio::test]
async fn test_overlong_input_is_rejected() {
    let text = "a".repeat(201);
    let result = keyword_classifier().classify(&text).await;
    assert_matches!(result, Err(TriageError::InvalidInput(_)));
}

#[tokio::test]
async fn test_backend_timeout_is_unavailable() {
    let classifier = classifier_with(Arc::new(FixedScorer {
        score: 5,
        delay: Duration::from_millis(500),
    }));

    let result = classifier.classify("headache").await;
    let err = result.unwrap_err();
    assert_matches!(err, TriageError::ClassificationUnavailable(_));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_out_of_range_backend_score_is_unavailable() {
    for bad in [0, 11, -3] {
        let classifier = classifier_with(Arc::new(FixedScorer {
            score: bad,
            delay: Duration::ZERO,
        }));
        let result = classifier.classify("headache").await;
        assert_matches!(result, Err(TriageError::ClassificationUnavailable(_)), "score {}", bad);
    }
}

#[tokio::test]
async fn test_remote_backend_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/classify"))
        .and(body_json(json!({ "symptoms": "twisted ankle" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "severity": 6 })))
        .expect(1)
        .mount(&server)
        .await;

    let classifier = classifier_with(Arc::new(RemoteScorer::new(&server.uri())));
    let outcome = classifier.classify("  twisted ankle ").await.unwrap();

    assert_eq!(outcome.severity_score, 6);
    assert_eq!(outcome.severity_label, SeverityLabel::Moderate);
    assert!(!outcome.is_emergency);
}

#[tokio::test]
async fn test_remote_backend_error_is_never_defaulted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/classify"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let classifier = classifier_with(Arc::new(RemoteScorer::new(&server.uri())));
    let result = classifier.classify("headache").await;

    assert_matches!(result, Err(TriageError::ClassificationUnavailable(_)));
}

#[tokio::test]
async fn test_remote_backend_slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/classify"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "severity": 3 }))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let classifier = classifier_with(Arc::new(RemoteScorer::new(&server.uri())));
    let result = classifier.classify("headache").await;

    assert_matches!(result, Err(TriageError::ClassificationUnavailable(_)));
}

#[tokio::test]
async fn test_remote_backend_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/classify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "label": "bad" })))
        .mount(&server)
        .await;

    let classifier = classifier_with(Arc::new(RemoteScorer::new(&server.uri())));
    let result = classifier.classify("headache").await;

    assert_matches!(result, Err(TriageError::ClassificationUnavailable(_)));
}

#[tokio::test]
async fn test_from_config_defaults_to_keyword_rules() {
    let classifier = SeverityClassifier::from_config(&AppConfig::default());
    let outcome = classifier.classify("chest pain").await.unwrap();
    assert_eq!(outcome.severity_score, 8);
    assert!(outcome.is_emergency);
}

#[tokio::test]
async fn test_triage_route_returns_outcome() {
    let app = triage_routes(Arc::new(keyword_classifier()));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "symptoms": "chest pain, shortness of breath" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["severity_score"], 9);
    assert_eq!(json["severity_label"], "Critical");
    assert_eq!(json["is_emergency"], true);
}

#[tokio::test]
async fn test_triage_route_rejects_empty_symptoms() {
    let app = triage_routes(Arc::new(keyword_classifier()));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "symptoms": "" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
