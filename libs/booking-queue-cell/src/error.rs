use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueueError {
    #[error("Appointment {0} already has an entry in this queue")]
    DuplicateEntry(Uuid),

    #[error("Appointment {0} is already queued")]
    AlreadyQueued(Uuid),

    #[error("Queue entry not found: {0}")]
    NotFound(Uuid),

    #[error("Queue entry {entry_id} was already assigned to doctor {doctor_id}")]
    AlreadyAssigned { entry_id: Uuid, doctor_id: Uuid },

    #[error("Invalid queue entry: {0}")]
    InvalidEntry(String),
}

impl From<QueueError> for AppError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::NotFound(_) => AppError::NotFound(err.to_string()),
            QueueError::InvalidEntry(_) => AppError::ValidationError(err.to_string()),
            QueueError::DuplicateEntry(_)
            | QueueError::AlreadyQueued(_)
            | QueueError::AlreadyAssigned { .. } => AppError::Conflict(err.to_string()),
        }
    }
}
