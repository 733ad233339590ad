/*!
 * End-to-end tests for the single-job lifecycle: the chunk loop, context
 * windows, salvage recovery, cooperative stop, and gap-based continuation.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use sublate::providers::mock::MockBehavior;
use sublate::{ContextStrategy, JobState};

use crate::common::{harness, source_sequence, test_config};

#[tokio::test]
async fn test_job_tenLinesChunkFour_shouldCompleteInThreeChunks() {
    let h = harness(MockBehavior::Working);
    h.engine.load_sequence("ep1", source_sequence(10));

    h.engine.start_job("ep1", test_config(), None).unwrap();
    let state = h.engine.join_job("ep1").await.unwrap();

    assert_eq!(state, JobState::Done);
    assert_eq!(h.engine.job_state("ep1"), Some(JobState::Done));

    let seq = h.engine.sequence("ep1").unwrap();
    assert_eq!(seq.translated_count(), 10);
    assert_eq!(seq.get(1).unwrap().translated_text, "line 1 (fr)");

    // Chunks are [1-4], [5-8], [9-10], strictly in order
    let requests = h.provider.recorded_requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].line_indices, vec![1, 2, 3, 4]);
    assert_eq!(requests[1].line_indices, vec![5, 6, 7, 8]);
    assert_eq!(requests[2].line_indices, vec![9, 10]);

    // Persistence fires once per chunk, plus the terminal save
    assert_eq!(h.store.save_count("ep1"), 4);
}

#[tokio::test]
async fn test_job_contextWindow_shouldBeEmptyOnFirstChunkThenPaired() {
    let h = harness(MockBehavior::Working);
    h.engine.load_sequence("ep1", source_sequence(10));

    let config = test_config().with_context_strategy(ContextStrategy::Minimal);
    h.engine.start_job("ep1", config, None).unwrap();
    h.engine.join_job("ep1").await.unwrap();

    let requests = h.provider.recorded_requests();
    assert_eq!(requests[0].window_turns, 0);
    assert_eq!(requests[1].window_turns, 2);
    assert_eq!(requests[2].window_turns, 2);
}

#[tokio::test]
async fn test_job_truncatedChunk_shouldSalvageAndResumeAfterHighestIndex() {
    // Chunk 2 ([5-8]) is cut off after 3 entries; the job must keep going
    let h = harness(MockBehavior::TruncateCall { call: 2, keep: 3 });
    h.engine.load_sequence("ep1", source_sequence(10));

    h.engine.start_job("ep1", test_config(), None).unwrap();
    let state = h.engine.join_job("ep1").await.unwrap();

    assert_eq!(state, JobState::Done);

    // Lines 5, 6, 7 came from the salvage; the next chunk resumed at 8
    let requests = h.provider.recorded_requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[2].line_indices, vec![8, 9, 10]);

    let seq = h.engine.sequence("ep1").unwrap();
    assert_eq!(seq.translated_count(), 10);
}

#[tokio::test]
async fn test_job_unsalvageableChunk_shouldErrorAndPreserveEarlierChunks() {
    let h = harness(MockBehavior::GarbageCall { call: 2 });
    h.engine.load_sequence("ep1", source_sequence(10));

    h.engine.start_job("ep1", test_config(), None).unwrap();
    let state = h.engine.join_job("ep1").await.unwrap();

    assert_eq!(state, JobState::Error);

    // Chunk 1 stays merged; chunk 3 was never submitted
    let seq = h.engine.sequence("ep1").unwrap();
    assert_eq!(seq.translated_count(), 4);
    assert_eq!(h.engine.remaining_lines("ep1"), Some(6));
    assert_eq!(h.provider.calls(), 2);

    // Raw output is preserved and annotated
    let error = h.engine.job_error("ep1").unwrap();
    assert!(error.contains("I am sorry"));
    assert!(error.contains("<<<UNRECOVERABLE>>>"));
}

#[tokio::test]
async fn test_job_stopDuringChunk_shouldMergeInFlightAndSkipRest() {
    let h = harness(MockBehavior::Working);
    h.engine.load_sequence("ep1", source_sequence(20));

    // Request the stop from the streaming callback of chunk 2, while that
    // chunk is still in flight.
    let engine = h.engine.clone();
    let provider = h.provider.clone();
    let stops = Arc::new(AtomicUsize::new(0));
    let stops_clone = stops.clone();
    h.engine.on_progress(Arc::new(move |id: &str, _partial: &str| {
        if provider.calls() == 2 && stops_clone.fetch_add(1, Ordering::SeqCst) == 0 {
            engine.stop_job(id).unwrap();
        }
    }));

    h.engine.start_job("ep1", test_config(), None).unwrap();
    let state = h.engine.join_job("ep1").await.unwrap();

    assert_eq!(state, JobState::Stopped);

    // Chunks 1 and 2 merged in full, chunk 3 never submitted
    assert_eq!(h.provider.calls(), 2);
    let seq = h.engine.sequence("ep1").unwrap();
    assert_eq!(seq.translated_count(), 8);
    assert_eq!(seq.get(8).unwrap().translated_text, "line 8 (fr)");
    assert!(seq.get(9).unwrap().translated_text.is_empty());
}

#[tokio::test]
async fn test_job_rangeOverride_shouldTranslateOnlyThatRange() {
    let h = harness(MockBehavior::Working);
    h.engine.load_sequence("ep1", source_sequence(10));

    h.engine.start_job("ep1", test_config(), Some((3, 6))).unwrap();
    let state = h.engine.join_job("ep1").await.unwrap();

    assert_eq!(state, JobState::Done);
    let seq = h.engine.sequence("ep1").unwrap();
    assert_eq!(seq.translated_count(), 4);
    assert!(seq.get(2).unwrap().translated_text.is_empty());
    assert_eq!(seq.get(3).unwrap().translated_text, "line 3 (fr)");
    assert!(seq.get(7).unwrap().translated_text.is_empty());
}

#[tokio::test]
async fn test_continueJob_shouldResubmitOnlyMergedGaps() {
    let h = harness(MockBehavior::Working);

    // Lines 3, 4 and 8 already translated: gaps are [1-2], [5-7], [9-10]
    let mut seq = source_sequence(10);
    for index in [3, 4, 8] {
        seq.get_mut(index).unwrap().translated_text = "pre".to_string();
    }
    h.engine.load_sequence("ep1", seq);

    // Tolerance 2 keeps [1-2] separate but coalesces [5-7] and [9-10]
    let mut config = test_config().with_chunk_size(30);
    config.gap_tolerance = 2;
    h.engine.continue_job("ep1", config).unwrap();
    let state = h.engine.join_job("ep1").await.unwrap();

    assert_eq!(state, JobState::Done);

    let requests = h.provider.recorded_requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].line_indices, vec![1, 2]);
    assert_eq!(requests[1].line_indices, vec![5, 6, 7, 8, 9, 10]);

    // Untouched lines outside the gaps keep their existing translation
    let seq = h.engine.sequence("ep1").unwrap();
    assert_eq!(seq.remaining_count(), 0);
    assert_eq!(seq.get(3).unwrap().translated_text, "pre");
    // Line 8 sat inside a coalesced gap and was re-translated
    assert_eq!(seq.get(8).unwrap().translated_text, "line 8 (fr)");
}

#[tokio::test]
async fn test_continueJob_onFullyTranslatedSequence_shouldFinishWithoutCalls() {
    let h = harness(MockBehavior::Working);

    let mut seq = source_sequence(5);
    for entry in &mut seq.entries {
        entry.translated_text = "done".to_string();
    }
    h.engine.load_sequence("ep1", seq);

    h.engine.continue_job("ep1", test_config()).unwrap();
    let state = h.engine.join_job("ep1").await.unwrap();

    assert_eq!(state, JobState::Done);
    assert_eq!(h.provider.calls(), 0);
}
