use async_trait::async_trait;
use reqwest::Method;
use tokio::sync::RwLock;
use tracing::{debug, error, instrument};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{DoctorAvailability, DoctorError};

/// Source of doctor availability snapshots.
#[async_trait]
pub trait RosterProvider: Send + Sync {
    async fn snapshot(&self) -> Result<Vec<DoctorAvailability>, DoctorError>;
}

/// In-memory roster, replaced wholesale when the upstream roster changes.
#[derive(Debug, Default)]
pub struct StaticRoster {
    doctors: RwLock<Vec<DoctorAvailability>>,
}

impl StaticRoster {
    pub fn new(doctors: Vec<DoctorAvailability>) -> Self {
        Self {
            doctors: RwLock::new(doctors),
        }
    }

    pub async fn replace(&self, doctors: Vec<DoctorAvailability>) {
        debug!("Replacing static roster with {} doctors", doctors.len());
        *self.doctors.write().await = doctors;
    }
}

#[async_trait]
impl RosterProvider for StaticRoster {
    async fn snapshot(&self) -> Result<Vec<DoctorAvailability>, DoctorError> {
        Ok(self.doctors.read().await.clone())
    }
}

/// Reads the `doctor_availability` table through PostgREST.
pub struct SupabaseRoster {
    supabase: SupabaseClient,
}

impl SupabaseRoster {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

#[async_trait]
impl RosterProvider for SupabaseRoster {
    #[instrument(skip(self))]
    async fn snapshot(&self) -> Result<Vec<DoctorAvailability>, DoctorError> {
        let doctors: Vec<DoctorAvailability> = self
            .supabase
            .request(Method::GET, "/rest/v1/doctor_availability?select=*", None)
            .await
            .map_err(|e| {
                error!("Failed to fetch doctor roster: {}", e);
                DoctorError::RosterUnavailable(e.to_string())
            })?;

        debug!("Fetched {} roster rows", doctors.len());
        Ok(doctors)
    }
}
