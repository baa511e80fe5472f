use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use booking_queue_cell::{QueueEntry, QueueError, Scheduler};
use shared_config::AppConfig;
use shared_models::{SeverityPolicy, TriageOutcome};

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, CreateAppointmentRequest, LifecycleAction,
};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::store::{AppointmentStore, EntryChange};

type LockTable = Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>;

/// Exclusive hold on one appointment. The table slot is dropped once nobody
/// else is waiting for it.
struct AppointmentGuard<'a> {
    table: &'a LockTable,
    appointment_id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for AppointmentGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(lock) = table.get(&self.appointment_id) {
            if Arc::strong_count(lock) == 1 {
                table.remove(&self.appointment_id);
            }
        }
    }
}

/// Drives appointments through their lifecycle and keeps the scheduler's
/// queue entries in step with what is persisted.
///
/// Every operation runs under a per-appointment lock. A queue change whose
/// persistence fails is undone before the error is returned.
pub struct AppointmentLifecycleManager {
    scheduler: Arc<Scheduler>,
    store: Arc<dyn AppointmentStore>,
    lifecycle: AppointmentLifecycleService,
    policy: SeverityPolicy,
    locks: LockTable,
}

impl AppointmentLifecycleManager {
    pub fn new(scheduler: Arc<Scheduler>, store: Arc<dyn AppointmentStore>) -> Self {
        Self {
            scheduler,
            store,
            lifecycle: AppointmentLifecycleService::new(),
            policy: SeverityPolicy::default(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(scheduler: Arc<Scheduler>, store: Arc<dyn AppointmentStore>, config: &AppConfig) -> Self {
        Self::new(scheduler, store).with_policy(SeverityPolicy::new(config.severity))
    }

    /// Policy that submitted triage outcomes must agree with.
    pub fn with_policy(mut self, policy: SeverityPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn verify_outcome(&self, outcome: &TriageOutcome) -> Result<(), AppointmentError> {
        self.policy.verify(outcome).map_err(|reason| {
            warn!("Rejected triage outcome {}: {}", outcome.outcome_id, reason);
            AppointmentError::ValidationError(reason)
        })
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    async fn lock(&self, appointment_id: Uuid) -> AppointmentGuard<'_> {
        let lock = {
            let mut table = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            table.entry(appointment_id).or_default().clone()
        };

        AppointmentGuard {
            table: &self.locks,
            appointment_id,
            guard: Some(lock.lock_owned().await),
        }
    }

    async fn load(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.store
            .get(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound(appointment_id))
    }

    fn queued_entry(appointment: &Appointment) -> Result<Uuid, AppointmentError> {
        appointment
            .queue_entry_id
            .ok_or(AppointmentError::Queue(QueueError::NotFound(appointment.id)))
    }

    /// Creates the appointment and admits it to the queue. If admission
    /// fails the appointment stays `Requested` with the failure recorded.
    #[instrument(skip(self, request), fields(patient_id = %request.patient_id))]
    pub async fn create(&self, request: CreateAppointmentRequest) -> Result<Appointment, AppointmentError> {
        self.verify_outcome(&request.triage_outcome)?;

        let now = Utc::now();
        let mut appointment = Appointment::new(&request, now);

        match self.scheduler.admit(
            appointment.id,
            &appointment.triage_outcome,
            appointment.preferred_doctor_id,
        ) {
            Ok(ranked) => {
                appointment.status = self
                    .lifecycle
                    .transition(appointment.status, LifecycleAction::Admit)?;
                appointment.queue_entry_id = Some(ranked.entry.entry_id);

                let entry_id = ranked.entry.entry_id;
                if let Err(e) = self
                    .store
                    .persist(&appointment, EntryChange::Upsert(ranked.entry))
                    .await
                {
                    self.undo_admit(entry_id);
                    return Err(e);
                }

                info!(
                    "Appointment {} queued at position {}",
                    appointment.id, ranked.position
                );
            }
            Err(e) => {
                warn!("Admission failed for appointment {}: {}", appointment.id, e);
                appointment.last_error = Some(e.to_string());
                self.store.persist(&appointment, EntryChange::None).await?;
            }
        }

        Ok(appointment)
    }

    #[instrument(skip(self))]
    pub async fn begin_consultation(
        &self,
        appointment_id: Uuid,
        doctor_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        let _guard = self.lock(appointment_id).await;
        let mut appointment = self.load(appointment_id).await?;

        let next = self
            .lifecycle
            .transition(appointment.status, LifecycleAction::BeginConsultation)?;
        let entry_id = Self::queued_entry(&appointment)?;

        let taken = self.scheduler.assign(entry_id, doctor_id)?;

        let now = Utc::now();
        appointment.status = next;
        appointment.doctor_id = Some(doctor_id);
        appointment.queue_entry_id = None;
        appointment.started_at = Some(now);
        appointment.consultation_room = Some(format!("room-{}", Uuid::new_v4().simple()));
        appointment.updated_at = now;

        if let Err(e) = self.store.persist(&appointment, EntryChange::Remove(taken.clone())).await {
            self.undo_removal(taken);
            return Err(e);
        }

        info!("Doctor {} started consultation for appointment {}", doctor_id, appointment_id);
        Ok(appointment)
    }

    #[instrument(skip(self))]
    pub async fn complete(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let _guard = self.lock(appointment_id).await;
        let mut appointment = self.load(appointment_id).await?;

        let next = self
            .lifecycle
            .transition(appointment.status, LifecycleAction::Complete)?;

        let now = Utc::now();
        Self::close(&mut appointment, next, now);
        self.store.persist(&appointment, EntryChange::None).await?;

        info!("Appointment {} completed", appointment_id);
        Ok(appointment)
    }

    #[instrument(skip(self, reason))]
    pub async fn abort(
        &self,
        appointment_id: Uuid,
        reason: Option<String>,
    ) -> Result<Appointment, AppointmentError> {
        let _guard = self.lock(appointment_id).await;
        let mut appointment = self.load(appointment_id).await?;

        let next = self
            .lifecycle
            .transition(appointment.status, LifecycleAction::Abort)?;

        let now = Utc::now();
        Self::close(&mut appointment, next, now);
        appointment.abort_reason = reason;
        self.store.persist(&appointment, EntryChange::None).await?;

        warn!("Consultation for appointment {} aborted", appointment_id);
        Ok(appointment)
    }

    #[instrument(skip(self))]
    pub async fn cancel(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let _guard = self.lock(appointment_id).await;
        let mut appointment = self.load(appointment_id).await?;

        let next = self
            .lifecycle
            .transition(appointment.status, LifecycleAction::Cancel)?;

        let removed = match appointment.status {
            AppointmentStatus::Queued => {
                let entry_id = Self::queued_entry(&appointment)?;
                Some(self.scheduler.cancel(entry_id)?)
            }
            _ => None,
        };

        let now = Utc::now();
        appointment.queue_entry_id = None;
        appointment.status = next;
        appointment.archived_at = Some(now);
        appointment.updated_at = now;

        let change = match &removed {
            Some(entry) => EntryChange::Remove(entry.clone()),
            None => EntryChange::None,
        };

        if let Err(e) = self.store.persist(&appointment, change).await {
            if let Some(entry) = removed {
                self.undo_removal(entry);
            }
            return Err(e);
        }

        info!("Appointment {} cancelled", appointment_id);
        Ok(appointment)
    }

    /// Marks the appointment as waiting for a new slot. Its entry keeps its
    /// place until the reschedule is confirmed.
    #[instrument(skip(self))]
    pub async fn request_reschedule(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.simple_transition(appointment_id, LifecycleAction::RequestReschedule)
            .await
    }

    /// Gives up a pending reschedule; the original entry and seniority remain.
    #[instrument(skip(self))]
    pub async fn withdraw_reschedule(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.simple_transition(appointment_id, LifecycleAction::WithdrawReschedule)
            .await
    }

    /// Requeues the appointment for its new slot as a fresh arrival,
    /// optionally under a new triage outcome.
    #[instrument(skip(self, new_outcome))]
    pub async fn confirm_reschedule(
        &self,
        appointment_id: Uuid,
        new_slot: DateTime<Utc>,
        new_outcome: Option<TriageOutcome>,
    ) -> Result<Appointment, AppointmentError> {
        let _guard = self.lock(appointment_id).await;
        let mut appointment = self.load(appointment_id).await?;

        let next = self
            .lifecycle
            .transition(appointment.status, LifecycleAction::ConfirmReschedule)?;

        let now = Utc::now();
        if new_slot <= now {
            return Err(AppointmentError::ValidationError(
                "rescheduled slot must be in the future".to_string(),
            ));
        }

        if let Some(outcome) = &new_outcome {
            self.verify_outcome(outcome)?;
        }

        let entry_id = Self::queued_entry(&appointment)?;
        let outcome = new_outcome.unwrap_or_else(|| appointment.triage_outcome.clone());
        let requeued = self.scheduler.requeue(entry_id, &outcome)?;

        let inserted_id = requeued.inserted.entry.entry_id;
        appointment.status = next;
        appointment.triage_outcome = outcome;
        appointment.queue_entry_id = Some(inserted_id);
        appointment.scheduled_slot = Some(new_slot);
        appointment.reschedule_count += 1;
        appointment.updated_at = now;

        let change = EntryChange::Replace {
            removed: requeued.removed.clone(),
            inserted: requeued.inserted.entry.clone(),
        };

        if let Err(e) = self.store.persist(&appointment, change).await {
            self.undo_admit(inserted_id);
            self.undo_removal(requeued.removed);
            return Err(e);
        }

        info!(
            "Appointment {} rescheduled, now at position {} in {} queue",
            appointment_id, requeued.inserted.position, requeued.inserted.entry.queue_class
        );
        Ok(appointment)
    }

    pub async fn get(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.load(appointment_id).await
    }

    pub async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        self.store.list_for_patient(patient_id).await
    }

    /// Rebuilds the scheduler's lanes from persisted entries after a restart.
    ///
    /// Entries are only restored when their appointment still points at
    /// them and is waiting in the queue; anything else is left over from an
    /// interrupted write and is skipped.
    #[instrument(skip(self))]
    pub async fn recover(&self) -> Result<usize, AppointmentError> {
        let entries = self.store.load_active_entries().await?;
        let found = entries.len();

        let mut live = Vec::with_capacity(found);
        for entry in entries {
            match self.store.get(entry.appointment_id).await? {
                Some(appointment) if Self::owns_entry(&appointment, entry.entry_id) => live.push(entry),
                Some(appointment) => warn!(
                    "Skipping queue entry {}: appointment {} is {} and holds {:?}",
                    entry.entry_id, appointment.id, appointment.status, appointment.queue_entry_id
                ),
                None => warn!(
                    "Skipping queue entry {}: appointment {} does not exist",
                    entry.entry_id, entry.appointment_id
                ),
            }
        }

        let restored = self.scheduler.restore(live);

        if restored < found {
            warn!("Recovered {} of {} persisted queue entries", restored, found);
        } else {
            info!("Recovered {} queue entries", restored);
        }
        Ok(restored)
    }

    async fn simple_transition(
        &self,
        appointment_id: Uuid,
        action: LifecycleAction,
    ) -> Result<Appointment, AppointmentError> {
        let _guard = self.lock(appointment_id).await;
        let mut appointment = self.load(appointment_id).await?;

        appointment.status = self.lifecycle.transition(appointment.status, action)?;
        appointment.updated_at = Utc::now();
        self.store.persist(&appointment, EntryChange::None).await?;

        info!("Appointment {} is now {}", appointment_id, appointment.status);
        Ok(appointment)
    }

    fn owns_entry(appointment: &Appointment, entry_id: Uuid) -> bool {
        matches!(
            appointment.status,
            AppointmentStatus::Queued | AppointmentStatus::ReschedulePending
        ) && appointment.queue_entry_id == Some(entry_id)
    }

    fn close(appointment: &mut Appointment, status: AppointmentStatus, now: DateTime<Utc>) {
        appointment.status = status;
        appointment.ended_at = Some(now);
        appointment.archived_at = Some(now);
        appointment.updated_at = now;
    }

    fn undo_admit(&self, entry_id: Uuid) {
        match self.scheduler.cancel(entry_id) {
            Ok(_) => warn!("Withdrew queue entry {} after a failed write", entry_id),
            Err(e) => error!("Could not withdraw queue entry {}: {}", entry_id, e),
        }
    }

    fn undo_removal(&self, entry: QueueEntry) {
        let entry_id = entry.entry_id;
        if let Err(e) = self.scheduler.reinstate(entry) {
            error!("Could not reinstate queue entry {}: {}", entry_id, e);
        }
    }
}
