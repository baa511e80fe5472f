use std::collections::HashSet;
use assert_matches::assert_matches;
use futures::future::join_all;
use uuid::Uuid;

use booking_queue_cell::*;
use shared_models::QueueClass;
use super::SchedulerTestUtils;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_assigns_have_exactly_one_winner() {
    let utils = SchedulerTestUtils::new();
    let entry = utils.admit(8);
    let entry_id = entry.entry.entry_id;

    let handles = (0..16).map(|_| {
        let scheduler = utils.scheduler.clone();
        tokio::spawn(async move { scheduler.assign(entry_id, Uuid::new_v4()) })
    });

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);

    for result in results.iter().filter(|r| r.is_err()) {
        assert_matches!(
            result,
            Err(QueueError::AlreadyAssigned { .. }) | Err(QueueError::NotFound(_))
        );
    }
    assert_eq!(utils.scheduler.stats().assigned_total, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_admits_keep_positions_unique() {
    let utils = SchedulerTestUtils::new();

    let handles = (0..64u8).map(|i| {
        let scheduler = utils.scheduler.clone();
        let outcome = SchedulerTestUtils::outcome(1 + i % 10);
        tokio::spawn(async move { scheduler.admit(Uuid::new_v4(), &outcome, None) })
    });

    for joined in join_all(handles).await {
        assert!(joined.expect("task panicked").is_ok());
    }

    let snapshot = utils.scheduler.snapshot();
    assert_eq!(snapshot.emergency.len() + snapshot.routine.len(), 64);

    for class in QueueClass::drain_order() {
        let lane = snapshot.lane(class);
        let positions: Vec<usize> = lane.iter().map(|r| r.position).collect();
        assert_eq!(positions, (1..=lane.len()).collect::<Vec<_>>());

        let stamps: HashSet<_> = lane.iter().map(|r| r.entry.enqueued_at).collect();
        assert_eq!(stamps.len(), lane.len(), "arrival stamps are unique");

        for pair in lane.windows(2) {
            assert!(pair[0].entry.rank_key() < pair[1].entry.rank_key());
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_doctors_draining_in_parallel_never_share_an_entry() {
    let utils = SchedulerTestUtils::new();
    for score in 1..=10 {
        utils.admit(score);
        utils.admit(score);
    }

    let handles = (0..4).map(|_| {
        let scheduler = utils.scheduler.clone();
        tokio::spawn(async move {
            let doctor = Uuid::new_v4();
            let mut taken = Vec::new();
            while let Some(next) = scheduler.next_for_assignment() {
                if let Ok(entry) = scheduler.assign(next.entry.entry_id, doctor) {
                    taken.push(entry.entry_id);
                }
                tokio::task::yield_now().await;
            }
            taken
        })
    });

    let mut all = Vec::new();
    for joined in join_all(handles).await {
        all.extend(joined.expect("task panicked"));
    }

    let unique: HashSet<_> = all.iter().collect();
    assert_eq!(all.len(), 20);
    assert_eq!(unique.len(), 20);
}
