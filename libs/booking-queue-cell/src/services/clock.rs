use chrono::{DateTime, Duration, SubsecRound, Utc};
use std::sync::Mutex;

/// Time source for queue timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Issues strictly increasing arrival stamps at microsecond precision, the
/// precision the persistence layer keeps, so arrival order survives a restart.
pub(crate) struct ArrivalStamper {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl ArrivalStamper {
    pub(crate) fn new() -> Self {
        Self { last: Mutex::new(None) }
    }

    pub(crate) fn stamp(&self, clock: &dyn Clock) -> DateTime<Utc> {
        let now = clock.now().trunc_subsecs(6);
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());

        let next = match *last {
            Some(previous) if now <= previous => previous + Duration::microseconds(1),
            _ => now,
        };

        *last = Some(next);
        next
    }

    /// Make sure future stamps land after an already-issued timestamp.
    pub(crate) fn observe(&self, seen: DateTime<Utc>) {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if last.map_or(true, |previous| seen > previous) {
            *last = Some(seen);
        }
    }
}
