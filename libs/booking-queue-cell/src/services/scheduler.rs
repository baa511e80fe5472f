use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_models::{QueueClass, TriageOutcome, MAX_SEVERITY, MIN_SEVERITY};

use crate::services::clock::{ArrivalStamper, Clock, SystemClock};
use crate::services::queue::QueueStore;
use crate::{QueueEntry, QueueError, QueueSnapshot, QueueStats, RankedEntry, RequeueOutcome};

/// How many recent assignments are remembered for `AlreadyAssigned` replies.
pub const DEFAULT_ASSIGNED_HISTORY: usize = 4096;

/// Recently assigned entries and the doctor who took each one. Oldest
/// records are evicted once `capacity` is reached.
#[derive(Debug)]
struct AssignedHistory {
    doctors: HashMap<Uuid, Uuid>,
    order: VecDeque<Uuid>,
    capacity: usize,
}

impl AssignedHistory {
    fn new(capacity: usize) -> Self {
        Self {
            doctors: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn record(&mut self, entry_id: Uuid, doctor_id: Uuid) {
        while self.doctors.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.doctors.remove(&oldest);
                }
                None => break,
            }
        }
        self.doctors.insert(entry_id, doctor_id);
        self.order.push_back(entry_id);
    }

    fn forget(&mut self, entry_id: Uuid) {
        if self.doctors.remove(&entry_id).is_some() {
            self.order.retain(|id| *id != entry_id);
        }
    }

    fn get(&self, entry_id: Uuid) -> Option<Uuid> {
        self.doctors.get(&entry_id).copied()
    }

    fn len(&self) -> usize {
        self.doctors.len()
    }
}

/// Cross-lane bookkeeping: which lane an entry lives in, which entry an
/// appointment owns, and which doctor took an entry once it left the queue.
#[derive(Debug)]
struct Directory {
    by_appointment: HashMap<Uuid, Uuid>,
    classes: HashMap<Uuid, QueueClass>,
    assigned: AssignedHistory,
}

impl Directory {
    fn new(assigned_capacity: usize) -> Self {
        Self {
            by_appointment: HashMap::new(),
            classes: HashMap::new(),
            assigned: AssignedHistory::new(assigned_capacity),
        }
    }

    fn track(&mut self, entry: &QueueEntry) {
        self.by_appointment.insert(entry.appointment_id, entry.entry_id);
        self.classes.insert(entry.entry_id, entry.queue_class);
    }

    fn forget(&mut self, entry: &QueueEntry) {
        self.classes.remove(&entry.entry_id);
        if self.by_appointment.get(&entry.appointment_id) == Some(&entry.entry_id) {
            self.by_appointment.remove(&entry.appointment_id);
        }
    }

    fn missing(&self, entry_id: Uuid) -> QueueError {
        match self.assigned.get(entry_id) {
            Some(doctor_id) => QueueError::AlreadyAssigned { entry_id, doctor_id },
            None => QueueError::NotFound(entry_id),
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    admitted: AtomicU64,
    assigned: AtomicU64,
    cancelled: AtomicU64,
    requeued: AtomicU64,
}

/// Admits triaged requests into the emergency and routine lanes and hands
/// them out to doctors.
///
/// Each lane sits behind its own lock so the two lanes proceed in parallel.
/// Lock order is emergency lane, routine lane, then directory; the directory
/// lock is never held while waiting for a lane.
pub struct Scheduler {
    emergency: Mutex<QueueStore>,
    routine: Mutex<QueueStore>,
    directory: Mutex<Directory>,
    clock: Arc<dyn Clock>,
    stamper: ArrivalStamper,
    counters: Counters,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl Scheduler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_assigned_history(clock, DEFAULT_ASSIGNED_HISTORY)
    }

    /// `assigned_history` bounds how many past assignments are remembered;
    /// an assignment older than that reports `NotFound` instead of
    /// `AlreadyAssigned`.
    pub fn with_assigned_history(clock: Arc<dyn Clock>, assigned_history: usize) -> Self {
        Self {
            emergency: Mutex::new(QueueStore::new(QueueClass::Emergency)),
            routine: Mutex::new(QueueStore::new(QueueClass::Routine)),
            directory: Mutex::new(Directory::new(assigned_history)),
            clock,
            stamper: ArrivalStamper::new(),
            counters: Counters::default(),
        }
    }

    fn lane(&self, queue_class: QueueClass) -> MutexGuard<'_, QueueStore> {
        let lane = match queue_class {
            QueueClass::Emergency => &self.emergency,
            QueueClass::Routine => &self.routine,
        };
        lane.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn directory(&self) -> MutexGuard<'_, Directory> {
        self.directory.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn class_of(&self, entry_id: Uuid) -> Result<QueueClass, QueueError> {
        let directory = self.directory();
        directory
            .classes
            .get(&entry_id)
            .copied()
            .ok_or_else(|| directory.missing(entry_id))
    }

    fn check_severity(outcome: &TriageOutcome) -> Result<(), QueueError> {
        if (MIN_SEVERITY..=MAX_SEVERITY).contains(&outcome.severity_score) {
            Ok(())
        } else {
            Err(QueueError::InvalidEntry(format!(
                "severity score {} is outside {}..={}",
                outcome.severity_score, MIN_SEVERITY, MAX_SEVERITY
            )))
        }
    }

    /// Creates a queue entry for the appointment in the lane its outcome
    /// routes to. `doctor_id` pins the entry to one doctor.
    pub fn admit(
        &self,
        appointment_id: Uuid,
        outcome: &TriageOutcome,
        doctor_id: Option<Uuid>,
    ) -> Result<RankedEntry, QueueError> {
        Self::check_severity(outcome)?;
        let queue_class = outcome.queue_class();

        let mut lane = self.lane(queue_class);
        let mut directory = self.directory();

        if directory.by_appointment.contains_key(&appointment_id) {
            warn!("Rejected admit: appointment {} is already queued", appointment_id);
            return Err(QueueError::AlreadyQueued(appointment_id));
        }

        let entry = QueueEntry {
            entry_id: Uuid::new_v4(),
            appointment_id,
            queue_class,
            severity_score: outcome.severity_score,
            enqueued_at: self.stamper.stamp(self.clock.as_ref()),
            doctor_id,
        };

        let position = lane.insert(entry.clone())?;
        directory.track(&entry);
        self.counters.admitted.fetch_add(1, Ordering::Relaxed);

        info!(
            "Admitted appointment {} into {} queue at position {} (severity {})",
            appointment_id, queue_class, position, entry.severity_score
        );

        Ok(RankedEntry { entry, position })
    }

    /// Highest-ranked entry a free doctor should take: emergency lane first.
    /// Does not remove anything.
    pub fn next_for_assignment(&self) -> Option<RankedEntry> {
        QueueClass::drain_order().into_iter().find_map(|queue_class| {
            self.lane(queue_class).peek_next().map(|entry| RankedEntry {
                entry: entry.clone(),
                position: 1,
            })
        })
    }

    /// Takes the entry out of its lane for `doctor_id`. Only one caller can
    /// win; the rest see `AlreadyAssigned` or `NotFound`.
    pub fn assign(&self, entry_id: Uuid, doctor_id: Uuid) -> Result<QueueEntry, QueueError> {
        let queue_class = self.class_of(entry_id)?;

        let mut lane = self.lane(queue_class);
        let mut directory = self.directory();

        if let Some(pending) = lane.get(entry_id) {
            if !pending.is_open_to(doctor_id) {
                return Err(QueueError::InvalidEntry(format!(
                    "entry {} is reserved for another doctor",
                    entry_id
                )));
            }
        }

        let entry = lane.remove(entry_id).map_err(|_| directory.missing(entry_id))?;
        directory.forget(&entry);
        directory.assigned.record(entry_id, doctor_id);
        self.counters.assigned.fetch_add(1, Ordering::Relaxed);

        info!("Assigned entry {} ({} queue) to doctor {}", entry_id, queue_class, doctor_id);
        Ok(entry)
    }

    /// Removes a queued entry. Assigned entries are already out of the queue
    /// and report `NotFound`.
    pub fn cancel(&self, entry_id: Uuid) -> Result<QueueEntry, QueueError> {
        let queue_class = self
            .directory()
            .classes
            .get(&entry_id)
            .copied()
            .ok_or(QueueError::NotFound(entry_id))?;

        let mut lane = self.lane(queue_class);
        let mut directory = self.directory();

        let entry = lane.remove(entry_id)?;
        directory.forget(&entry);
        self.counters.cancelled.fetch_add(1, Ordering::Relaxed);

        info!("Cancelled entry {} from {} queue", entry_id, queue_class);
        Ok(entry)
    }

    /// Replaces an entry with a fresh arrival for the same appointment. The
    /// new entry goes to the back of its severity band and may change lane.
    pub fn requeue(&self, entry_id: Uuid, outcome: &TriageOutcome) -> Result<RequeueOutcome, QueueError> {
        Self::check_severity(outcome)?;

        let mut emergency = self.lane(QueueClass::Emergency);
        let mut routine = self.lane(QueueClass::Routine);
        let mut directory = self.directory();

        let old_class = directory
            .classes
            .get(&entry_id)
            .copied()
            .ok_or(QueueError::NotFound(entry_id))?;
        let new_class = outcome.queue_class();

        let removed = match old_class {
            QueueClass::Emergency => emergency.remove(entry_id)?,
            QueueClass::Routine => routine.remove(entry_id)?,
        };
        directory.forget(&removed);

        let entry = QueueEntry {
            entry_id: Uuid::new_v4(),
            appointment_id: removed.appointment_id,
            queue_class: new_class,
            severity_score: outcome.severity_score,
            enqueued_at: self.stamper.stamp(self.clock.as_ref()),
            doctor_id: removed.doctor_id,
        };

        let position = match new_class {
            QueueClass::Emergency => emergency.insert(entry.clone())?,
            QueueClass::Routine => routine.insert(entry.clone())?,
        };
        directory.track(&entry);
        self.counters.requeued.fetch_add(1, Ordering::Relaxed);

        info!(
            "Requeued appointment {} from {} to {} queue at position {}",
            entry.appointment_id, old_class, new_class, position
        );

        Ok(RequeueOutcome {
            removed,
            inserted: RankedEntry { entry, position },
        })
    }

    pub fn position_of(&self, entry_id: Uuid) -> Result<usize, QueueError> {
        let queue_class = self.class_of(entry_id)?;
        self.lane(queue_class).position_of(entry_id)
    }

    pub fn entry(&self, entry_id: Uuid) -> Option<RankedEntry> {
        let queue_class = self.class_of(entry_id).ok()?;
        let lane = self.lane(queue_class);
        let entry = lane.get(entry_id)?.clone();
        let position = lane.position_of(entry_id).ok()?;
        Some(RankedEntry { entry, position })
    }

    pub fn find_by_appointment(&self, appointment_id: Uuid) -> Option<RankedEntry> {
        let entry_id = self.directory().by_appointment.get(&appointment_id).copied()?;
        self.entry(entry_id)
    }

    /// Entries a doctor may take, emergency lane first, each lane in rank
    /// order. Positions stay relative to the entry's own lane.
    pub fn candidates_for(&self, doctor_id: Uuid) -> Vec<RankedEntry> {
        QueueClass::drain_order()
            .into_iter()
            .flat_map(|queue_class| self.lane(queue_class).entries())
            .filter(|ranked| ranked.entry.is_open_to(doctor_id))
            .collect()
    }

    pub fn lane_len(&self, queue_class: QueueClass) -> usize {
        self.lane(queue_class).len()
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let emergency = self.lane(QueueClass::Emergency);
        let routine = self.lane(QueueClass::Routine);

        QueueSnapshot {
            emergency: emergency.entries(),
            routine: routine.entries(),
            taken_at: Some(self.clock.now()),
        }
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            emergency_len: self.lane_len(QueueClass::Emergency),
            routine_len: self.lane_len(QueueClass::Routine),
            admitted_total: self.counters.admitted.load(Ordering::Relaxed),
            assigned_total: self.counters.assigned.load(Ordering::Relaxed),
            cancelled_total: self.counters.cancelled.load(Ordering::Relaxed),
            requeued_total: self.counters.requeued.load(Ordering::Relaxed),
            assigned_tracked: self.directory().assigned.len(),
        }
    }

    /// Rebuilds the lanes from persisted entries, keeping their original
    /// arrival times. Returns how many entries were restored.
    pub fn restore(&self, entries: impl IntoIterator<Item = QueueEntry>) -> usize {
        let mut restored = 0;

        for entry in entries {
            let entry_id = entry.entry_id;
            let appointment_id = entry.appointment_id;
            let enqueued_at = entry.enqueued_at;

            match self.put_back(entry) {
                Ok(_) => {
                    self.stamper.observe(enqueued_at);
                    restored += 1;
                }
                Err(e) => warn!(
                    "Skipping persisted entry {} for appointment {}: {}",
                    entry_id, appointment_id, e
                ),
            }
        }

        info!("Restored {} queue entries", restored);
        restored
    }

    /// Puts back an entry taken out by an operation that could not be
    /// persisted. The entry keeps its original seniority.
    pub fn reinstate(&self, entry: QueueEntry) -> Result<usize, QueueError> {
        let entry_id = entry.entry_id;
        let position = self.put_back(entry)?;
        self.directory().assigned.forget(entry_id);

        warn!("Reinstated entry {} at position {}", entry_id, position);
        Ok(position)
    }

    fn put_back(&self, entry: QueueEntry) -> Result<usize, QueueError> {
        if !(MIN_SEVERITY..=MAX_SEVERITY).contains(&entry.severity_score) {
            return Err(QueueError::InvalidEntry(format!(
                "severity score {} is outside {}..={}",
                entry.severity_score, MIN_SEVERITY, MAX_SEVERITY
            )));
        }

        let mut lane = self.lane(entry.queue_class);
        let mut directory = self.directory();

        if directory.by_appointment.contains_key(&entry.appointment_id) {
            return Err(QueueError::AlreadyQueued(entry.appointment_id));
        }

        let position = lane.restore(entry.clone())?;
        directory.track(&entry);
        debug!("Entry {} back in {} queue", entry.entry_id, entry.queue_class);
        Ok(position)
    }
}
