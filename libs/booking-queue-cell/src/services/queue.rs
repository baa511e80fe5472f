use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use shared_models::QueueClass;

use crate::{QueueEntry, QueueError, RankKey, RankedEntry};

/// Ordered collection of pending entries for one queue class.
///
/// `ranked` is kept sorted by [`RankKey`], so a position lookup is a binary
/// search. The store is not synchronised; the scheduler owns one per class
/// behind its own lock.
#[derive(Debug)]
pub struct QueueStore {
    queue_class: QueueClass,
    ranked: Vec<RankKey>,
    entries: HashMap<Uuid, QueueEntry>,
    by_appointment: HashMap<Uuid, Uuid>,
}

impl QueueStore {
    pub fn new(queue_class: QueueClass) -> Self {
        Self {
            queue_class,
            ranked: Vec::new(),
            entries: HashMap::new(),
            by_appointment: HashMap::new(),
        }
    }

    pub fn queue_class(&self) -> QueueClass {
        self.queue_class
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    /// Inserts an entry and returns its 1-indexed position.
    pub fn insert(&mut self, entry: QueueEntry) -> Result<usize, QueueError> {
        if entry.queue_class != self.queue_class {
            return Err(QueueError::InvalidEntry(format!(
                "{} entry offered to the {} queue",
                entry.queue_class, self.queue_class
            )));
        }

        if self.by_appointment.contains_key(&entry.appointment_id)
            || self.entries.contains_key(&entry.entry_id)
        {
            return Err(QueueError::DuplicateEntry(entry.appointment_id));
        }

        let key = entry.rank_key();
        let index = match self.ranked.binary_search(&key) {
            Ok(_) => return Err(QueueError::DuplicateEntry(entry.appointment_id)),
            Err(index) => index,
        };

        self.ranked.insert(index, key);
        self.by_appointment.insert(entry.appointment_id, entry.entry_id);
        self.entries.insert(entry.entry_id, entry);

        debug!("Inserted entry into {} queue at position {}", self.queue_class, index + 1);
        Ok(index + 1)
    }

    /// Puts back a persisted entry with its original arrival time.
    pub fn restore(&mut self, entry: QueueEntry) -> Result<usize, QueueError> {
        let entry_id = entry.entry_id;
        let position = self.insert(entry)?;
        debug!("Restored entry {} into {} queue", entry_id, self.queue_class);
        Ok(position)
    }

    /// Removes and returns the entry only if it is still present.
    pub fn remove(&mut self, entry_id: Uuid) -> Result<QueueEntry, QueueError> {
        let entry = self.entries.remove(&entry_id).ok_or(QueueError::NotFound(entry_id))?;

        if let Ok(index) = self.ranked.binary_search(&entry.rank_key()) {
            self.ranked.remove(index);
        }
        self.by_appointment.remove(&entry.appointment_id);

        Ok(entry)
    }

    pub fn position_of(&self, entry_id: Uuid) -> Result<usize, QueueError> {
        let entry = self.entries.get(&entry_id).ok_or(QueueError::NotFound(entry_id))?;

        self.ranked
            .binary_search(&entry.rank_key())
            .map(|index| index + 1)
            .map_err(|_| QueueError::NotFound(entry_id))
    }

    pub fn peek_next(&self) -> Option<&QueueEntry> {
        self.ranked.first().and_then(|key| self.entries.get(&key.entry_id))
    }

    pub fn get(&self, entry_id: Uuid) -> Option<&QueueEntry> {
        self.entries.get(&entry_id)
    }

    pub fn entry_for_appointment(&self, appointment_id: Uuid) -> Option<&QueueEntry> {
        self.by_appointment
            .get(&appointment_id)
            .and_then(|entry_id| self.entries.get(entry_id))
    }

    /// Entries in rank order.
    pub fn iter_ranked(&self) -> impl Iterator<Item = &QueueEntry> + '_ {
        self.ranked.iter().filter_map(|key| self.entries.get(&key.entry_id))
    }

    /// Ranked copy of the whole queue with positions.
    pub fn entries(&self) -> Vec<RankedEntry> {
        self.iter_ranked()
            .enumerate()
            .map(|(index, entry)| RankedEntry {
                entry: entry.clone(),
                position: index + 1,
            })
            .collect()
    }
}
