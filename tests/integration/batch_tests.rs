/*!
 * Tests for the batch coordinator: concurrency bounds, error isolation,
 * sequential chaining, and batch-wide stop.
 */

use std::time::Duration;

use sublate::providers::mock::MockBehavior;
use sublate::{BatchDescriptor, JobState};

use crate::common::{harness, source_sequence, test_config};

fn load_items(h: &crate::common::TestHarness, count: usize, lines: usize) -> Vec<String> {
    (1..=count)
        .map(|i| {
            let id = format!("ep{i}");
            h.engine.load_sequence(&id, source_sequence(lines));
            id
        })
        .collect()
}

#[tokio::test]
async fn test_batch_independent_shouldRespectConcurrencyLimit() {
    let h = harness(MockBehavior::Slow { delay_ms: 30 });
    let ids = load_items(&h, 6, 3);

    let batch_id = h
        .engine
        .start_batch(BatchDescriptor::independent(ids, 2), test_config())
        .unwrap();
    let report = h.engine.join_batch(&batch_id).await.unwrap();

    assert_eq!(report.done_count(), 6);
    assert!(h.provider.max_in_flight() <= 2);

    for i in 1..=6 {
        let seq = h.engine.sequence(&format!("ep{i}")).unwrap();
        assert_eq!(seq.remaining_count(), 0);
    }
}

#[tokio::test]
async fn test_batch_independent_oneItemError_shouldNotAbortSiblings() {
    // With concurrency 1 and one chunk per item, call 2 belongs to ep2
    let h = harness(MockBehavior::GarbageCall { call: 2 });
    let ids = load_items(&h, 3, 3);

    let batch_id = h
        .engine
        .start_batch(BatchDescriptor::independent(ids, 1), test_config())
        .unwrap();
    let report = h.engine.join_batch(&batch_id).await.unwrap();

    assert_eq!(report.outcomes[0].1, Some(JobState::Done));
    assert_eq!(report.outcomes[1].1, Some(JobState::Error));
    assert_eq!(report.outcomes[2].1, Some(JobState::Done));
}

#[tokio::test]
async fn test_batch_sequential_shouldChainPreviousOutputIntoNextContext() {
    let h = harness(MockBehavior::Working);
    let ids = load_items(&h, 2, 3);

    let batch_id = h
        .engine
        .start_batch(BatchDescriptor::sequential(ids), test_config())
        .unwrap();
    let report = h.engine.join_batch(&batch_id).await.unwrap();

    assert_eq!(report.done_count(), 2);

    // Item order is strict in sequential mode: ep1's single chunk first
    let requests = h.provider.recorded_requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].context_document.is_none());

    // ep2's request carries ep1's completed output document
    let chained = requests[1].context_document.as_deref().unwrap();
    assert!(chained.contains("line 1 (fr)"));
    assert!(chained.contains("line 3 (fr)"));
}

#[tokio::test]
async fn test_batch_stop_shouldPreventQueuedItemsFromStarting() {
    let h = harness(MockBehavior::Slow { delay_ms: 60 });
    let ids = load_items(&h, 3, 3);

    let batch_id = h
        .engine
        .start_batch(BatchDescriptor::independent(ids, 1), test_config())
        .unwrap();

    // Let the first item get in flight, then stop the batch
    tokio::time::sleep(Duration::from_millis(15)).await;
    h.engine.stop_batch(&batch_id).unwrap();

    let report = h.engine.join_batch(&batch_id).await.unwrap();

    // The in-flight item finished its chunk; queued items never started
    assert_eq!(report.outcomes[0].1, Some(JobState::Done));
    assert_eq!(report.outcomes[1].1, None);
    assert_eq!(report.outcomes[2].1, None);
    assert_eq!(h.provider.calls(), 1);
}
