use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use shared_config::AppConfig;
use shared_models::{SeverityPolicy, TriageOutcome, MAX_SEVERITY, MIN_SEVERITY};

use crate::error::TriageError;
use crate::services::keywords::KeywordScorer;
use crate::services::remote::RemoteScorer;

/// Pluggable scoring backend: a rule engine, a model service, or anything else
/// that turns symptom text into an integer severity.
#[async_trait]
pub trait SymptomScorer: Send + Sync {
    /// Raw severity as reported by the backend. Range checking happens in the classifier.
    async fn score(&self, symptom_text: &str) -> Result<i64, TriageError>;

    fn name(&self) -> &'static str;
}

pub struct SeverityClassifier {
    scorer: Arc<dyn SymptomScorer>,
    policy: SeverityPolicy,
    max_symptom_length: usize,
    timeout: Duration,
}

impl SeverityClassifier {
    pub fn new(
        scorer: Arc<dyn SymptomScorer>,
        policy: SeverityPolicy,
        max_symptom_length: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            scorer,
            policy,
            max_symptom_length,
            timeout,
        }
    }

    /// Picks the remote backend when `CLASSIFIER_URL` is configured, the keyword rules otherwise.
    pub fn from_config(config: &AppConfig) -> Self {
        let scorer: Arc<dyn SymptomScorer> = match config.classifier_url.as_deref() {
            Some(url) => Arc::new(RemoteScorer::new(url)),
            None => Arc::new(KeywordScorer::new()),
        };

        info!("Severity classifier using {} backend", scorer.name());

        Self::new(
            scorer,
            SeverityPolicy::new(config.severity),
            config.max_symptom_length,
            Duration::from_millis(config.classifier_timeout_ms),
        )
    }

    pub fn policy(&self) -> SeverityPolicy {
        self.policy
    }

    #[instrument(skip(self, symptom_text), fields(backend = self.scorer.name()))]
    pub async fn classify(&self, symptom_text: &str) -> Result<TriageOutcome, TriageError> {
        let text = self.validate_input(symptom_text)?;

        let raw = match tokio::time::timeout(self.timeout, self.scorer.score(text)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("Classification backend timed out after {:?}", self.timeout);
                return Err(TriageError::ClassificationUnavailable(format!(
                    "classification timed out after {} ms",
                    self.timeout.as_millis()
                )));
            }
        };

        let score = u8::try_from(raw)
            .ok()
            .filter(|s| (MIN_SEVERITY..=MAX_SEVERITY).contains(s))
            .ok_or_else(|| {
                warn!("Classification backend returned out-of-range severity {}", raw);
                TriageError::ClassificationUnavailable(format!(
                    "backend returned severity {} outside {}..={}",
                    raw, MIN_SEVERITY, MAX_SEVERITY
                ))
            })?;

        let outcome = self.policy.outcome(text, score).ok_or_else(|| {
            TriageError::ClassificationUnavailable(format!("severity {} rejected by policy", score))
        })?;

        debug!(
            "Classified symptoms as {} ({}/10), emergency: {}",
            outcome.severity_label, outcome.severity_score, outcome.is_emergency
        );

        Ok(outcome)
    }

    fn validate_input<'a>(&self, symptom_text: &'a str) -> Result<&'a str, TriageError> {
        let text = symptom_text.trim();

        if text.is_empty() {
            return Err(TriageError::InvalidInput("symptom text is empty".to_string()));
        }

        let length = text.chars().count();
        if length > self.max_symptom_length {
            return Err(TriageError::InvalidInput(format!(
                "symptom text is {} characters, maximum is {}",
                length, self.max_symptom_length
            )));
        }

        Ok(text)
    }
}
