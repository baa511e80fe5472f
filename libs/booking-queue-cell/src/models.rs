use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use uuid::Uuid;

use shared_models::QueueClass;

/// A pending request waiting in one queue class. Position is never stored;
/// it is derived from rank whenever it is read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueEntry {
    pub entry_id: Uuid,
    pub appointment_id: Uuid,
    pub queue_class: QueueClass,
    pub severity_score: u8,
    pub enqueued_at: DateTime<Utc>,
    pub doctor_id: Option<Uuid>,
}

impl QueueEntry {
    pub fn rank_key(&self) -> RankKey {
        RankKey {
            severity: Reverse(self.severity_score),
            enqueued_at: self.enqueued_at,
            entry_id: self.entry_id,
        }
    }

    /// Whether a doctor may take this entry: unpinned entries are open to everyone.
    pub fn is_open_to(&self, doctor_id: Uuid) -> bool {
        self.doctor_id.map_or(true, |pinned| pinned == doctor_id)
    }
}

/// Ordering within a queue class: severity descending, then arrival ascending.
/// The entry id only separates entries restored with identical timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RankKey {
    pub severity: Reverse<u8>,
    pub enqueued_at: DateTime<Utc>,
    pub entry_id: Uuid,
}

/// An entry together with its 1-indexed position inside its queue class.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RankedEntry {
    pub entry: QueueEntry,
    pub position: usize,
}

impl PartialOrd for RankedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RankedEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.entry.rank_key().cmp(&other.entry.rank_key())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct QueueSnapshot {
    pub emergency: Vec<RankedEntry>,
    pub routine: Vec<RankedEntry>,
    pub taken_at: Option<DateTime<Utc>>,
}

impl QueueSnapshot {
    pub fn lane(&self, queue_class: QueueClass) -> &[RankedEntry] {
        match queue_class {
            QueueClass::Emergency => &self.emergency,
            QueueClass::Routine => &self.routine,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub emergency_len: usize,
    pub routine_len: usize,
    pub admitted_total: u64,
    pub assigned_total: u64,
    pub cancelled_total: u64,
    pub requeued_total: u64,
    /// Past assignments still remembered for double-assign detection.
    pub assigned_tracked: usize,
}

/// Both sides of a requeue: the entry that lost its place and its replacement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequeueOutcome {
    pub removed: QueueEntry,
    pub inserted: RankedEntry,
}
