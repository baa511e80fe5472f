use tracing::{debug, warn};

use crate::models::{AppointmentError, AppointmentStatus, LifecycleAction};

/// The appointment state machine. Pure: it only answers whether an action is
/// allowed and where it leads.
#[derive(Debug, Default, Clone, Copy)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Target state for `action` from `current`, or `InvalidTransition`.
    pub fn transition(
        &self,
        current: AppointmentStatus,
        action: LifecycleAction,
    ) -> Result<AppointmentStatus, AppointmentError> {
        match Self::target(current, action) {
            Some(next) => {
                debug!("Transition {} --{}--> {}", current, action, next);
                Ok(next)
            }
            None => {
                warn!("Invalid transition attempted: {} from {}", action, current);
                Err(AppointmentError::InvalidTransition {
                    from: current,
                    action,
                })
            }
        }
    }

    /// Actions accepted in the given state.
    pub fn available_actions(&self, current: AppointmentStatus) -> Vec<LifecycleAction> {
        LifecycleAction::ALL
            .into_iter()
            .filter(|action| Self::target(current, *action).is_some())
            .collect()
    }

    fn target(current: AppointmentStatus, action: LifecycleAction) -> Option<AppointmentStatus> {
        use AppointmentStatus::*;
        use LifecycleAction::*;

        match (current, action) {
            (Requested, Admit) => Some(Queued),
            (Requested, Cancel) => Some(Cancelled),
            (Queued, BeginConsultation) => Some(InConsultation),
            (Queued, Cancel) => Some(Cancelled),
            (Queued, RequestReschedule) => Some(ReschedulePending),
            (ReschedulePending, ConfirmReschedule) => Some(Queued),
            (ReschedulePending, WithdrawReschedule) => Some(Queued),
            (InConsultation, Complete) => Some(Completed),
            (InConsultation, Abort) => Some(Aborted),
            // Terminal states accept nothing
            _ => None,
        }
    }
}
