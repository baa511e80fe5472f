use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::handlers;
use crate::services::{AppointmentLifecycleManager, AppointmentQueryService};

/// Services the appointment routes share.
pub struct AppointmentState {
    pub manager: Arc<AppointmentLifecycleManager>,
    pub query: Arc<AppointmentQueryService>,
}

pub fn appointment_routes(state: Arc<AppointmentState>) -> Router {
    Router::new()
        .route("/", post(handlers::create_appointment))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/{appointment_id}/reschedule", post(handlers::request_reschedule))
        .route("/{appointment_id}/reschedule/confirm", post(handlers::confirm_reschedule))
        .route("/{appointment_id}/reschedule/withdraw", post(handlers::withdraw_reschedule))
        .route("/{appointment_id}/begin", post(handlers::begin_consultation))
        .route("/{appointment_id}/complete", post(handlers::complete_consultation))
        .route("/{appointment_id}/abort", post(handlers::abort_consultation))

        // Queue views
        .route("/{appointment_id}/position", get(handlers::get_queue_position))
        .route("/{appointment_id}/wait-time", get(handlers::get_wait_time))
        .route("/doctors/{doctor_id}/next-patient", get(handlers::get_next_patient))

        // Appointment listings
        .route("/patients/{patient_id}", get(handlers::get_patient_appointments))
        .with_state(state)
}
