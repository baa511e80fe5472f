use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{
    AbortConsultationRequest, Appointment, BeginConsultationRequest, ConfirmRescheduleRequest,
    CreateAppointmentRequest, QueuePosition, WaitEstimate,
};
use crate::router::AppointmentState;

// ==============================================================================
// LIFECYCLE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppointmentState>>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<Appointment>, AppError> {
    info!("Creating appointment for patient {}", request.patient_id);

    let appointment = state.manager.create(request).await?;
    Ok(Json(appointment))
}

pub async fn get_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    Ok(Json(state.manager.get(appointment_id).await?))
}

pub async fn cancel_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    Ok(Json(state.manager.cancel(appointment_id).await?))
}

pub async fn request_reschedule(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    Ok(Json(state.manager.request_reschedule(appointment_id).await?))
}

pub async fn confirm_reschedule(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<ConfirmRescheduleRequest>,
) -> Result<Json<Appointment>, AppError> {
    let appointment = state
        .manager
        .confirm_reschedule(appointment_id, request.scheduled_slot, request.triage_outcome)
        .await?;
    Ok(Json(appointment))
}

pub async fn withdraw_reschedule(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    Ok(Json(state.manager.withdraw_reschedule(appointment_id).await?))
}

pub async fn begin_consultation(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<BeginConsultationRequest>,
) -> Result<Json<Appointment>, AppError> {
    let appointment = state
        .manager
        .begin_consultation(appointment_id, request.doctor_id)
        .await?;
    Ok(Json(appointment))
}

pub async fn complete_consultation(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    Ok(Json(state.manager.complete(appointment_id).await?))
}

pub async fn abort_consultation(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<AbortConsultationRequest>,
) -> Result<Json<Appointment>, AppError> {
    Ok(Json(state.manager.abort(appointment_id, request.reason).await?))
}

// ==============================================================================
// QUEUE VIEWS
// ==============================================================================

pub async fn get_queue_position(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<QueuePosition>, AppError> {
    Ok(Json(state.query.get_position(appointment_id).await?))
}

pub async fn get_wait_time(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<WaitEstimate>, AppError> {
    Ok(Json(state.query.estimate_wait_time(appointment_id).await?))
}

pub async fn get_next_patient(
    State(state): State<Arc<AppointmentState>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    debug!("Looking up next patient for doctor {}", doctor_id);

    match state.query.get_next_patient(doctor_id).await? {
        Some(next) => Ok(Json(json!({
            "available": true,
            "appointment": next.appointment,
            "queue_entry": next.queue_entry
        }))),
        None => Ok(Json(json!({
            "available": false,
            "appointment": null
        }))),
    }
}

pub async fn get_patient_appointments(
    State(state): State<Arc<AppointmentState>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointments = state.query.list_patient_appointments(patient_id).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}
