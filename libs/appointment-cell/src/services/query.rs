use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use booking_queue_cell::{QueueError, RankedEntry, Scheduler};
use shared_config::AppConfig;
use shared_models::QueueClass;

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, NextPatient, QueuePosition, WaitEstimate,
};
use crate::services::store::AppointmentStore;

/// Read-only views over the queues for patients and doctors.
pub struct AppointmentQueryService {
    scheduler: Arc<Scheduler>,
    store: Arc<dyn AppointmentStore>,
    average_consultation_minutes: u32,
}

impl AppointmentQueryService {
    pub fn new(
        scheduler: Arc<Scheduler>,
        store: Arc<dyn AppointmentStore>,
        average_consultation_minutes: u32,
    ) -> Self {
        Self {
            scheduler,
            store,
            average_consultation_minutes,
        }
    }

    pub fn from_config(scheduler: Arc<Scheduler>, store: Arc<dyn AppointmentStore>, config: &AppConfig) -> Self {
        Self::new(scheduler, store, config.average_consultation_minutes)
    }

    async fn queued_entry(&self, appointment_id: Uuid) -> Result<RankedEntry, AppointmentError> {
        self.store
            .get(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound(appointment_id))?;

        self.scheduler
            .find_by_appointment(appointment_id)
            .ok_or(AppointmentError::Queue(QueueError::NotFound(appointment_id)))
    }

    pub async fn get_position(&self, appointment_id: Uuid) -> Result<QueuePosition, AppointmentError> {
        let ranked = self.queued_entry(appointment_id).await?;

        Ok(QueuePosition {
            appointment_id,
            entry_id: ranked.entry.entry_id,
            queue_class: ranked.entry.queue_class,
            position: ranked.position,
            queue_length: self.scheduler.lane_len(ranked.entry.queue_class),
        })
    }

    /// Routine patients wait behind the whole emergency lane as well as
    /// everyone ahead of them in their own lane.
    pub async fn estimate_wait_time(&self, appointment_id: Uuid) -> Result<WaitEstimate, AppointmentError> {
        let ranked = self.queued_entry(appointment_id).await?;
        let queue_class = ranked.entry.queue_class;

        let effective_position = match queue_class {
            QueueClass::Emergency => ranked.position,
            QueueClass::Routine => self.scheduler.lane_len(QueueClass::Emergency) + ranked.position,
        };

        Ok(WaitEstimate {
            appointment_id,
            queue_class,
            position: ranked.position,
            effective_position,
            average_consultation_minutes: self.average_consultation_minutes,
            estimated_wait_minutes: effective_position as u64 * u64::from(self.average_consultation_minutes),
            is_approximation: true,
        })
    }

    /// Next patient this doctor may take: emergency lane first, skipping
    /// entries pinned to someone else and appointments awaiting a new slot.
    pub async fn get_next_patient(&self, doctor_id: Uuid) -> Result<Option<NextPatient>, AppointmentError> {
        for candidate in self.scheduler.candidates_for(doctor_id) {
            let Some(appointment) = self.store.get(candidate.entry.appointment_id).await? else {
                continue;
            };

            if appointment.status == AppointmentStatus::Queued {
                return Ok(Some(NextPatient {
                    appointment,
                    queue_entry: candidate,
                }));
            }

            debug!(
                "Skipping appointment {} in state {}",
                appointment.id, appointment.status
            );
        }

        Ok(None)
    }

    pub async fn list_patient_appointments(&self, patient_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        self.store.list_for_patient(patient_id).await
    }
}
