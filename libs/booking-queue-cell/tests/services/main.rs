use std::sync::Arc;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use booking_queue_cell::*;
use shared_models::{SeverityPolicy, TriageOutcome};

/// Test utilities for driving a scheduler on a controllable clock
pub struct SchedulerTestUtils {
    pub scheduler: Arc<Scheduler>,
    pub clock: Arc<ManualClock>,
}

impl SchedulerTestUtils {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new(Self::start_time()));
        let scheduler = Arc::new(Scheduler::new(clock.clone()));
        Self { scheduler, clock }
    }

    pub fn start_time() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    /// Triage outcome under the default severity policy
    pub fn outcome(score: u8) -> TriageOutcome {
        SeverityPolicy::default()
            .outcome("test symptoms", score)
            .expect("score within 1..=10")
    }

    /// Admit a fresh appointment after moving the clock forward one second
    pub fn admit(&self, score: u8) -> RankedEntry {
        self.clock.advance(Duration::seconds(1));
        self.scheduler
            .admit(Uuid::new_v4(), &Self::outcome(score), None)
            .expect("admit should succeed")
    }

    pub fn persisted_entry(score: u8, offset_secs: i64) -> QueueEntry {
        let outcome = Self::outcome(score);
        QueueEntry {
            entry_id: Uuid::new_v4(),
            appointment_id: Uuid::new_v4(),
            queue_class: outcome.queue_class(),
            severity_score: score,
            enqueued_at: Self::start_time() + Duration::seconds(offset_secs),
            doctor_id: None,
        }
    }
}

// Test modules
mod queue_test;
mod scheduler_test;
mod concurrency_test;
mod router_test;
