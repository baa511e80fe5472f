use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyRequest {
    pub symptoms: String,
}

/// Wire shape of the remote classification backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteClassifyRequest {
    pub symptoms: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteClassifyResponse {
    pub severity: i64,
}
