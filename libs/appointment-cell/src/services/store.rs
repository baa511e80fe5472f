use std::collections::HashMap;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

use booking_queue_cell::QueueEntry;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Appointment, AppointmentError};

/// What happened to the appointment's queue entry alongside a state change.
/// Removed entries are carried whole so a failed write can put them back.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryChange {
    None,
    Upsert(QueueEntry),
    Remove(QueueEntry),
    Replace { removed: QueueEntry, inserted: QueueEntry },
}

impl EntryChange {
    /// The change that takes the entry table back to where it was.
    pub fn inverse(&self) -> EntryChange {
        match self {
            EntryChange::None => EntryChange::None,
            EntryChange::Upsert(entry) => EntryChange::Remove(entry.clone()),
            EntryChange::Remove(entry) => EntryChange::Upsert(entry.clone()),
            EntryChange::Replace { removed, inserted } => EntryChange::Replace {
                removed: inserted.clone(),
                inserted: removed.clone(),
            },
        }
    }
}

/// Durable home of appointments and their active queue entries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn get(&self, appointment_id: Uuid) -> Result<Option<Appointment>, AppointmentError>;

    async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, AppointmentError>;

    /// Writes the appointment and applies the entry change together.
    async fn persist(&self, appointment: &Appointment, change: EntryChange) -> Result<(), AppointmentError>;

    /// Every queue entry still waiting, used to rebuild the scheduler after a restart.
    async fn load_active_entries(&self) -> Result<Vec<QueueEntry>, AppointmentError>;
}

#[derive(Debug, Default)]
struct InMemoryTables {
    appointments: HashMap<Uuid, Appointment>,
    entries: HashMap<Uuid, QueueEntry>,
}

/// Process-local store used when no database is configured.
#[derive(Debug, Default)]
pub struct InMemoryAppointmentStore {
    tables: RwLock<InMemoryTables>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn get(&self, appointment_id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        Ok(self.tables.read().await.appointments.get(&appointment_id).cloned())
    }

    async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        let tables = self.tables.read().await;
        let mut appointments: Vec<Appointment> = tables
            .appointments
            .values()
            .filter(|a| a.patient_id == patient_id)
            .cloned()
            .collect();
        appointments.sort_by_key(|a| a.created_at);
        Ok(appointments)
    }

    async fn persist(&self, appointment: &Appointment, change: EntryChange) -> Result<(), AppointmentError> {
        let mut tables = self.tables.write().await;

        match change {
            EntryChange::None => {}
            EntryChange::Upsert(entry) => {
                tables.entries.insert(entry.entry_id, entry);
            }
            EntryChange::Remove(entry) => {
                tables.entries.remove(&entry.entry_id);
            }
            EntryChange::Replace { removed, inserted } => {
                tables.entries.remove(&removed.entry_id);
                tables.entries.insert(inserted.entry_id, inserted);
            }
        }

        tables.appointments.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn load_active_entries(&self) -> Result<Vec<QueueEntry>, AppointmentError> {
        let tables = self.tables.read().await;
        let mut entries: Vec<QueueEntry> = tables.entries.values().cloned().collect();
        entries.sort_by_key(|e| e.enqueued_at);
        Ok(entries)
    }
}

/// PostgREST-backed store over the `appointments` and `queue_entries` tables.
pub struct SupabaseAppointmentStore {
    supabase: SupabaseClient,
}

impl SupabaseAppointmentStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    fn store_error(context: &str, err: anyhow::Error) -> AppointmentError {
        error!("{}: {}", context, err);
        AppointmentError::Store(format!("{}: {}", context, err))
    }

    async fn delete_entry(&self, entry_id: Uuid) -> Result<(), AppointmentError> {
        let path = format!("/rest/v1/queue_entries?entry_id=eq.{}", entry_id);
        self.supabase
            .execute(Method::DELETE, &path, None, None)
            .await
            .map_err(|e| Self::store_error("Failed to delete queue entry", e))
    }

    async fn upsert_entry(&self, entry: &QueueEntry) -> Result<(), AppointmentError> {
        self.supabase
            .upsert("queue_entries", json!([entry]))
            .await
            .map_err(|e| Self::store_error("Failed to write queue entry", e))
    }

    /// New entry is written before the old one is dropped so the appointment
    /// always has one on disk. A half-applied replace is rolled back here.
    async fn apply(&self, change: &EntryChange) -> Result<(), AppointmentError> {
        match change {
            EntryChange::None => Ok(()),
            EntryChange::Upsert(entry) => self.upsert_entry(entry).await,
            EntryChange::Remove(entry) => self.delete_entry(entry.entry_id).await,
            EntryChange::Replace { removed, inserted } => {
                self.upsert_entry(inserted).await?;
                if let Err(e) = self.delete_entry(removed.entry_id).await {
                    if let Err(undo) = self.delete_entry(inserted.entry_id).await {
                        error!("Could not drop replacement entry {}: {}", inserted.entry_id, undo);
                    }
                    return Err(e);
                }
                Ok(())
            }
        }
    }

    async fn revert(&self, change: &EntryChange) {
        match self.apply(&change.inverse()).await {
            Ok(()) => warn!("Rolled back queue entry change after a failed write"),
            Err(e) => error!("Queue entry rollback failed, recovery will reconcile: {}", e),
        }
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    #[instrument(skip(self))]
    async fn get(&self, appointment_id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}&select=*", appointment_id);
        let rows: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| Self::store_error("Failed to fetch appointment", e))?;

        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self))]
    async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?patient_id=eq.{}&select=*&order=created_at.asc",
            patient_id
        );
        self.supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| Self::store_error("Failed to list patient appointments", e))
    }

    #[instrument(skip(self, appointment, change), fields(appointment_id = %appointment.id))]
    async fn persist(&self, appointment: &Appointment, change: EntryChange) -> Result<(), AppointmentError> {
        self.apply(&change).await?;

        if let Err(e) = self.supabase.upsert("appointments", json!([appointment])).await {
            let err = Self::store_error("Failed to write appointment", e);
            self.revert(&change).await;
            return Err(err);
        }

        debug!("Persisted appointment {} ({})", appointment.id, appointment.status);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn load_active_entries(&self) -> Result<Vec<QueueEntry>, AppointmentError> {
        self.supabase
            .request(
                Method::GET,
                "/rest/v1/queue_entries?select=*&order=enqueued_at.asc",
                None,
            )
            .await
            .map_err(|e| Self::store_error("Failed to load queue entries", e))
    }
}
