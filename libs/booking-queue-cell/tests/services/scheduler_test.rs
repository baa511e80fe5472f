use assert_matches::assert_matches;
use uuid::Uuid;

use booking_queue_cell::*;
use shared_models::QueueClass;
use super::SchedulerTestUtils;

#[test]
fn test_emergency_lane_drains_first() {
    let utils = SchedulerTestUtils::new();
    let routine = utils.admit(6);
    let emergency = utils.admit(8);

    let next = utils.scheduler.next_for_assignment().expect("queue is not empty");
    assert_eq!(next.entry.entry_id, emergency.entry.entry_id);

    utils.scheduler.assign(emergency.entry.entry_id, Uuid::new_v4()).unwrap();

    let next = utils.scheduler.next_for_assignment().expect("routine entry remains");
    assert_eq!(next.entry.entry_id, routine.entry.entry_id);
}

#[test]
fn test_next_for_assignment_never_returns_routine_while_emergency_waits() {
    let utils = SchedulerTestUtils::new();
    for score in [7, 2, 9, 5, 8, 10, 1] {
        utils.admit(score);
    }

    while utils.scheduler.lane_len(QueueClass::Emergency) > 0 {
        let next = utils.scheduler.next_for_assignment().unwrap();
        assert_eq!(next.entry.queue_class, QueueClass::Emergency);
        utils.scheduler.assign(next.entry.entry_id, Uuid::new_v4()).unwrap();
    }

    let next = utils.scheduler.next_for_assignment().unwrap();
    assert_eq!(next.entry.queue_class, QueueClass::Routine);
    assert_eq!(next.entry.severity_score, 7);
}

#[test]
fn test_next_for_assignment_is_a_peek() {
    let utils = SchedulerTestUtils::new();
    assert!(utils.scheduler.next_for_assignment().is_none());

    utils.admit(4);
    let first = utils.scheduler.next_for_assignment().unwrap();
    let second = utils.scheduler.next_for_assignment().unwrap();

    assert_eq!(first, second);
    assert_eq!(utils.scheduler.stats().routine_len, 1);
}

#[test]
fn test_positions_within_each_lane() {
    let utils = SchedulerTestUtils::new();
    let a = utils.admit(4);
    let b = utils.admit(6);
    let c = utils.admit(6);
    let e = utils.admit(9);

    assert_eq!(utils.scheduler.position_of(b.entry.entry_id).unwrap(), 1);
    assert_eq!(utils.scheduler.position_of(c.entry.entry_id).unwrap(), 2);
    assert_eq!(utils.scheduler.position_of(a.entry.entry_id).unwrap(), 3);
    assert_eq!(utils.scheduler.position_of(e.entry.entry_id).unwrap(), 1);
}

#[test]
fn test_cancel_twice_reports_not_found() {
    let utils = SchedulerTestUtils::new();
    let entry = utils.admit(5);
    utils.admit(5);

    utils.scheduler.cancel(entry.entry.entry_id).unwrap();
    let len_after_first = utils.scheduler.stats().routine_len;

    assert_matches!(
        utils.scheduler.cancel(entry.entry.entry_id),
        Err(QueueError::NotFound(id)) if id == entry.entry.entry_id
    );
    assert_eq!(utils.scheduler.stats().routine_len, len_after_first);
}

#[test]
fn test_cancel_after_assign_is_not_found() {
    let utils = SchedulerTestUtils::new();
    let entry = utils.admit(5);
    utils.scheduler.assign(entry.entry.entry_id, Uuid::new_v4()).unwrap();

    assert_matches!(
        utils.scheduler.cancel(entry.entry.entry_id),
        Err(QueueError::NotFound(_))
    );
}

#[test]
fn test_second_assign_reports_already_assigned() {
    let utils = SchedulerTestUtils::new();
    let entry = utils.admit(5);
    let winner = Uuid::new_v4();

    utils.scheduler.assign(entry.entry.entry_id, winner).unwrap();

    assert_matches!(
        utils.scheduler.assign(entry.entry.entry_id, Uuid::new_v4()),
        Err(QueueError::AlreadyAssigned { doctor_id, .. }) if doctor_id == winner
    );
    assert_matches!(
        utils.scheduler.assign(Uuid::new_v4(), winner),
        Err(QueueError::NotFound(_))
    );
}

#[test]
fn test_readmit_after_cancel_is_allowed() {
    let utils = SchedulerTestUtils::new();
    let appointment_id = Uuid::new_v4();
    let outcome = SchedulerTestUtils::outcome(5);

    let first = utils.scheduler.admit(appointment_id, &outcome, None).unwrap();
    utils.scheduler.cancel(first.entry.entry_id).unwrap();

    let second = utils.scheduler.admit(appointment_id, &outcome, None).unwrap();
    assert_ne!(first.entry.entry_id, second.entry.entry_id);
    assert_eq!(
        utils.scheduler.find_by_appointment(appointment_id).unwrap().entry.entry_id,
        second.entry.entry_id
    );
}

#[test]
fn test_requeue_loses_seniority() {
    let utils = SchedulerTestUtils::new();
    let first = utils.admit(5);
    let second = utils.admit(5);

    let outcome = utils
        .scheduler
        .requeue(first.entry.entry_id, &SchedulerTestUtils::outcome(5))
        .unwrap();

    assert_eq!(outcome.removed.entry_id, first.entry.entry_id);
    assert!(outcome.inserted.entry.enqueued_at > first.entry.enqueued_at);
    assert!(outcome.inserted.entry.enqueued_at > second.entry.enqueued_at);
    assert_eq!(outcome.inserted.position, 2);
    assert_matches!(
        utils.scheduler.position_of(first.entry.entry_id),
        Err(QueueError::NotFound(_))
    );
}

#[test]
fn test_requeue_unknown_entry_is_not_found() {
    let utils = SchedulerTestUtils::new();
    assert_matches!(
        utils.scheduler.requeue(Uuid::new_v4(), &SchedulerTestUtils::outcome(5)),
        Err(QueueError::NotFound(_))
    );
}

#[test]
fn test_candidates_respect_pinned_doctor() {
    let utils = SchedulerTestUtils::new();
    let doctor = Uuid::new_v4();
    let other = Uuid::new_v4();

    let open = utils.admit(4);
    let mine = utils
        .scheduler
        .admit(Uuid::new_v4(), &SchedulerTestUtils::outcome(9), Some(doctor))
        .unwrap();
    let theirs = utils
        .scheduler
        .admit(Uuid::new_v4(), &SchedulerTestUtils::outcome(6), Some(other))
        .unwrap();

    let ids: Vec<Uuid> = utils
        .scheduler
        .candidates_for(doctor)
        .into_iter()
        .map(|c| c.entry.entry_id)
        .collect();

    assert_eq!(ids, vec![mine.entry.entry_id, open.entry.entry_id]);
    assert!(!ids.contains(&theirs.entry.entry_id));
}

#[test]
fn test_snapshot_and_stats() {
    let utils = SchedulerTestUtils::new();
    let a = utils.admit(9);
    utils.admit(3);
    let c = utils.admit(5);
    utils.scheduler.assign(a.entry.entry_id, Uuid::new_v4()).unwrap();
    utils.scheduler.cancel(c.entry.entry_id).unwrap();

    let snapshot = utils.scheduler.snapshot();
    assert!(snapshot.emergency.is_empty());
    assert_eq!(snapshot.routine.len(), 1);
    assert_eq!(snapshot.lane(QueueClass::Routine)[0].position, 1);
    assert!(snapshot.taken_at.is_some());

    let stats = utils.scheduler.stats();
    assert_eq!(
        stats,
        QueueStats {
            emergency_len: 0,
            routine_len: 1,
            admitted_total: 3,
            assigned_total: 1,
            cancelled_total: 1,
            requeued_total: 0,
            assigned_tracked: 1,
        }
    );
}

#[test]
fn test_restore_rebuilds_rank_from_persisted_tuples() {
    let utils = SchedulerTestUtils::new();
    let older = SchedulerTestUtils::persisted_entry(5, 100);
    let newer = SchedulerTestUtils::persisted_entry(5, 200);
    let urgent = SchedulerTestUtils::persisted_entry(9, 300);
    let mut duplicate = SchedulerTestUtils::persisted_entry(4, 400);
    duplicate.appointment_id = older.appointment_id;

    let restored = utils
        .scheduler
        .restore(vec![newer.clone(), urgent.clone(), older.clone(), duplicate]);

    assert_eq!(restored, 3);
    assert_eq!(utils.scheduler.position_of(older.entry_id).unwrap(), 1);
    assert_eq!(utils.scheduler.position_of(newer.entry_id).unwrap(), 2);
    assert_eq!(utils.scheduler.position_of(urgent.entry_id).unwrap(), 1);

    // Fresh admissions land after everything restored, even on a clock behind the data
    let fresh = utils.admit(5);
    assert!(fresh.entry.enqueued_at > urgent.enqueued_at);
    assert_eq!(fresh.position, 3);
}

#[test]
fn test_reinstate_restores_seniority_and_clears_assignment() {
    let utils = SchedulerTestUtils::new();
    let first = utils.admit(5);
    let second = utils.admit(5);

    let taken = utils.scheduler.assign(first.entry.entry_id, Uuid::new_v4()).unwrap();
    assert_eq!(utils.scheduler.position_of(second.entry.entry_id).unwrap(), 1);

    let position = utils.scheduler.reinstate(taken).unwrap();
    assert_eq!(position, 1);
    assert_eq!(utils.scheduler.position_of(second.entry.entry_id).unwrap(), 2);

    // Assignable again after compensation
    assert!(utils.scheduler.assign(first.entry.entry_id, Uuid::new_v4()).is_ok());
}

#[test]
fn test_assigned_history_is_bounded() {
    let clock = std::sync::Arc::new(ManualClock::new(SchedulerTestUtils::start_time()));
    let scheduler = Scheduler::with_assigned_history(clock, 3);
    let doctor = Uuid::new_v4();

    let taken: Vec<Uuid> = (0..5)
        .map(|_| {
            let ranked = scheduler
                .admit(Uuid::new_v4(), &SchedulerTestUtils::outcome(5), None)
                .unwrap();
            scheduler.assign(ranked.entry.entry_id, doctor).unwrap();
            ranked.entry.entry_id
        })
        .collect();

    assert_eq!(scheduler.stats().assigned_total, 5);
    assert_eq!(scheduler.stats().assigned_tracked, 3);

    // Oldest assignments have been forgotten, recent ones are still reported
    assert_matches!(scheduler.assign(taken[0], doctor), Err(QueueError::NotFound(_)));
    assert_matches!(
        scheduler.assign(taken[4], doctor),
        Err(QueueError::AlreadyAssigned { doctor_id, .. }) if doctor_id == doctor
    );
}
