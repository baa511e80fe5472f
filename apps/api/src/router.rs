use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};
use tracing::info;

use appointment_cell::{
    appointment_routes, AppointmentLifecycleManager, AppointmentQueryService, AppointmentState,
    AppointmentStore, InMemoryAppointmentStore, SupabaseAppointmentStore,
};
use booking_queue_cell::{create_booking_queue_router, Scheduler};
use doctor_cell::{doctor_routes, DoctorMatcher, RosterProvider, StaticRoster, SupabaseRoster};
use shared_config::AppConfig;
use triage_cell::{triage_routes, SeverityClassifier};

/// Everything the routers share, wired once at startup.
pub struct Services {
    pub classifier: Arc<SeverityClassifier>,
    pub matcher: Arc<DoctorMatcher>,
    pub scheduler: Arc<Scheduler>,
    pub appointments: Arc<AppointmentState>,
}

impl Services {
    pub fn from_config(config: &AppConfig) -> Self {
        let (store, roster): (Arc<dyn AppointmentStore>, Arc<dyn RosterProvider>) =
            if config.is_persistence_configured() {
                info!("Using Supabase for appointments and doctor roster");
                (
                    Arc::new(SupabaseAppointmentStore::new(config)),
                    Arc::new(SupabaseRoster::new(config)),
                )
            } else {
                info!("Using in-memory appointments and an empty doctor roster");
                (
                    Arc::new(InMemoryAppointmentStore::new()),
                    Arc::new(StaticRoster::new(Vec::new())),
                )
            };

        let scheduler = Arc::new(Scheduler::default());
        let manager = Arc::new(AppointmentLifecycleManager::from_config(scheduler.clone(), store.clone(), config));
        let query = Arc::new(AppointmentQueryService::from_config(scheduler.clone(), store, config));

        Self {
            classifier: Arc::new(SeverityClassifier::from_config(config)),
            matcher: Arc::new(DoctorMatcher::from_config(roster, config)),
            scheduler,
            appointments: Arc::new(AppointmentState { manager, query }),
        }
    }
}

pub fn create_router(services: &Services) -> Router {
    Router::new()
        .route("/", get(|| async { "Triage Queue API is running!" }))
        .nest("/triage", triage_routes(services.classifier.clone()))
        .nest("/doctors", doctor_routes(services.matcher.clone()))
        .nest("/appointments", appointment_routes(services.appointments.clone()))
        .nest("/queue", create_booking_queue_router(services.scheduler.clone()))
}
