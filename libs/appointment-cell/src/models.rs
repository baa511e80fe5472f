use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

use booking_queue_cell::{QueueError, RankedEntry};
use shared_models::error::AppError;
use shared_models::{QueueClass, TriageOutcome};

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// Long-lived aggregate for one patient request. Owns at most one queue
/// entry at a time and is archived, never deleted, once terminal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub preferred_doctor_id: Option<Uuid>,
    pub triage_outcome: TriageOutcome,
    pub queue_entry_id: Option<Uuid>,
    pub status: AppointmentStatus,
    pub scheduled_slot: Option<DateTime<Utc>>,
    pub consultation_room: Option<String>,
    pub last_error: Option<String>,
    pub abort_reason: Option<String>,
    pub reschedule_count: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn new(request: &CreateAppointmentRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id: request.patient_id,
            doctor_id: None,
            preferred_doctor_id: request.preferred_doctor_id,
            triage_outcome: request.triage_outcome.clone(),
            queue_entry_id: None,
            status: AppointmentStatus::Requested,
            scheduled_slot: request.scheduled_slot,
            consultation_room: None,
            last_error: None,
            abort_reason: None,
            reschedule_count: 0,
            started_at: None,
            ended_at: None,
            archived_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Requested,
    Queued,
    ReschedulePending,
    InConsultation,
    Completed,
    Cancelled,
    Aborted,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::Aborted
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Requested => write!(f, "requested"),
            AppointmentStatus::Queued => write!(f, "queued"),
            AppointmentStatus::ReschedulePending => write!(f, "reschedule_pending"),
            AppointmentStatus::InConsultation => write!(f, "in_consultation"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Aborted => write!(f, "aborted"),
        }
    }
}

/// Operations that move an appointment between states.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    Admit,
    BeginConsultation,
    Complete,
    Abort,
    Cancel,
    RequestReschedule,
    ConfirmReschedule,
    WithdrawReschedule,
}

impl LifecycleAction {
    pub const ALL: [LifecycleAction; 8] = [
        LifecycleAction::Admit,
        LifecycleAction::BeginConsultation,
        LifecycleAction::Complete,
        LifecycleAction::Abort,
        LifecycleAction::Cancel,
        LifecycleAction::RequestReschedule,
        LifecycleAction::ConfirmReschedule,
        LifecycleAction::WithdrawReschedule,
    ];
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleAction::Admit => write!(f, "admit"),
            LifecycleAction::BeginConsultation => write!(f, "begin consultation"),
            LifecycleAction::Complete => write!(f, "complete"),
            LifecycleAction::Abort => write!(f, "abort"),
            LifecycleAction::Cancel => write!(f, "cancel"),
            LifecycleAction::RequestReschedule => write!(f, "request reschedule"),
            LifecycleAction::ConfirmReschedule => write!(f, "confirm reschedule"),
            LifecycleAction::WithdrawReschedule => write!(f, "withdraw reschedule"),
        }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_id: Uuid,
    pub triage_outcome: TriageOutcome,
    pub preferred_doctor_id: Option<Uuid>,
    pub scheduled_slot: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeginConsultationRequest {
    pub doctor_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AbortConsultationRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmRescheduleRequest {
    pub scheduled_slot: DateTime<Utc>,
    /// Re-triage result; the current outcome is reused when absent.
    pub triage_outcome: Option<TriageOutcome>,
}

// ==============================================================================
// QUERY MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueuePosition {
    pub appointment_id: Uuid,
    pub entry_id: Uuid,
    pub queue_class: QueueClass,
    pub position: usize,
    pub queue_length: usize,
}

/// Position-based wait estimate. An approximation, never a promise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WaitEstimate {
    pub appointment_id: Uuid,
    pub queue_class: QueueClass,
    pub position: usize,
    pub effective_position: usize,
    pub average_consultation_minutes: u32,
    pub estimated_wait_minutes: u64,
    pub is_approximation: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NextPatient {
    pub appointment: Appointment,
    pub queue_entry: RankedEntry,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppointmentError {
    #[error("Appointment not found: {0}")]
    NotFound(Uuid),

    #[error("Cannot {action} an appointment in state {from}")]
    InvalidTransition {
        from: AppointmentStatus,
        action: LifecycleAction,
    },

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("Appointment store error: {0}")]
    Store(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound(_) => AppError::NotFound(err.to_string()),
            AppointmentError::InvalidTransition { .. } => AppError::InvalidTransition(err.to_string()),
            AppointmentError::Queue(queue_err) => queue_err.into(),
            AppointmentError::Store(_) => AppError::Database(err.to_string()),
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
        }
    }
}
