use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error};

use crate::error::TriageError;
use crate::models::{RemoteClassifyRequest, RemoteClassifyResponse};
use crate::services::classifier::SymptomScorer;

/// Model-service backend reached over HTTP at `{base_url}/classify`.
pub struct RemoteScorer {
    client: Client,
    base_url: String,
}

impl RemoteScorer {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SymptomScorer for RemoteScorer {
    async fn score(&self, symptom_text: &str) -> Result<i64, TriageError> {
        let url = format!("{}/classify", self.base_url);
        debug!("Requesting remote classification from {}", url);

        let response = self.client
            .post(&url)
            .json(&RemoteClassifyRequest { symptoms: symptom_text.to_string() })
            .send()
            .await
            .map_err(|e| {
                error!("Classification backend unreachable: {}", e);
                TriageError::ClassificationUnavailable(format!("backend unreachable: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Classification backend error ({}): {}", status, body);
            return Err(TriageError::ClassificationUnavailable(format!(
                "backend returned {}",
                status
            )));
        }

        let body: RemoteClassifyResponse = response.json().await.map_err(|e| {
            error!("Malformed classification response: {}", e);
            TriageError::ClassificationUnavailable(format!("malformed backend response: {}", e))
        })?;

        Ok(body.severity)
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}
