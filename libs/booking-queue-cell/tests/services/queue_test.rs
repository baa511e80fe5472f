use assert_matches::assert_matches;

use booking_queue_cell::*;
use shared_models::QueueClass;
use super::SchedulerTestUtils;

#[test]
fn test_higher_severity_jumps_earlier_lower_arrivals() {
    let mut store = QueueStore::new(QueueClass::Routine);
    let early_mild = SchedulerTestUtils::persisted_entry(4, 1);
    let late_moderate = SchedulerTestUtils::persisted_entry(6, 2);

    assert_eq!(store.insert(early_mild.clone()).unwrap(), 1);
    assert_eq!(store.insert(late_moderate.clone()).unwrap(), 1);

    assert_eq!(store.position_of(late_moderate.entry_id).unwrap(), 1);
    assert_eq!(store.position_of(early_mild.entry_id).unwrap(), 2);
}

#[test]
fn test_equal_severity_is_fifo() {
    let mut store = QueueStore::new(QueueClass::Routine);
    let entries: Vec<QueueEntry> = (0..5)
        .map(|i| SchedulerTestUtils::persisted_entry(5, i))
        .collect();

    // Insert out of arrival order; rank must still follow enqueued_at
    for entry in entries.iter().rev() {
        store.insert(entry.clone()).unwrap();
    }

    for (index, entry) in entries.iter().enumerate() {
        assert_eq!(store.position_of(entry.entry_id).unwrap(), index + 1);
    }
}

#[test]
fn test_remove_unknown_entry_is_not_found() {
    let mut store = QueueStore::new(QueueClass::Emergency);
    let stranger = SchedulerTestUtils::persisted_entry(9, 0);

    assert_matches!(store.remove(stranger.entry_id), Err(QueueError::NotFound(_)));
    assert_matches!(store.position_of(stranger.entry_id), Err(QueueError::NotFound(_)));
}

#[test]
fn test_restore_keeps_original_arrival_time() {
    let mut store = QueueStore::new(QueueClass::Routine);
    let older = SchedulerTestUtils::persisted_entry(3, 10);
    let newer = SchedulerTestUtils::persisted_entry(3, 20);

    store.restore(newer.clone()).unwrap();
    store.restore(older.clone()).unwrap();

    let ranked = store.entries();
    assert_eq!(ranked[0].entry, older);
    assert_eq!(ranked[1].entry, newer);
    assert_eq!(store.entry_for_appointment(older.appointment_id), Some(&older));
}
