/*!
 * Tests for the engine facade: validation at the start boundary, job
 * registry behavior, and status queries.
 */

use sublate::providers::mock::MockBehavior;
use sublate::{EngineError, FewShotExample, JobError, JobState, ValidationError};

use crate::common::{harness, source_sequence, test_config};

#[tokio::test]
async fn test_startJob_withUnknownSequence_shouldRejectBeforeRunning() {
    let h = harness(MockBehavior::Working);

    let err = h.engine.start_job("missing", test_config(), None).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Job(JobError::Validation(ValidationError::UnknownSequence(_)))
    ));
    assert_eq!(h.provider.calls(), 0);
}

#[tokio::test]
async fn test_startJob_withEmptySequence_shouldRejectBeforeRunning() {
    let h = harness(MockBehavior::Working);
    h.engine.load_sequence("ep1", source_sequence(0));

    let err = h.engine.start_job("ep1", test_config(), None).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Job(JobError::Validation(ValidationError::EmptySequence(_)))
    ));
    assert!(h.engine.job_state("ep1").is_none());
}

#[tokio::test]
async fn test_startJob_withInvalidFewShotExample_shouldRejectBeforeRunning() {
    let h = harness(MockBehavior::Working);
    h.engine.load_sequence("ep1", source_sequence(5));

    let mut config = test_config();
    config.few_shot_examples = vec![FewShotExample {
        content: "Hello".to_string(),
        translated_text: String::new(),
    }];

    let err = h.engine.start_job("ep1", config, None).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Job(JobError::Validation(
            ValidationError::InvalidFewShotExample { position: 1, .. }
        ))
    ));
    assert_eq!(h.provider.calls(), 0);
}

#[tokio::test]
async fn test_startJob_withInvertedRange_shouldReject() {
    let h = harness(MockBehavior::Working);
    h.engine.load_sequence("ep1", source_sequence(5));

    let err = h.engine.start_job("ep1", test_config(), Some((4, 2))).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Job(JobError::Validation(ValidationError::InvalidRange { .. }))
    ));

    let err = h.engine.start_job("ep1", test_config(), Some((1, 99))).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Job(JobError::Validation(ValidationError::InvalidRange { .. }))
    ));
}

#[tokio::test]
async fn test_startJob_whileRunning_shouldRejectSecondStart() {
    let h = harness(MockBehavior::Slow { delay_ms: 80 });
    h.engine.load_sequence("ep1", source_sequence(5));

    h.engine.start_job("ep1", test_config(), None).unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(15)).await;

    let err = h.engine.start_job("ep1", test_config(), None).unwrap_err();
    assert!(matches!(err, EngineError::Job(JobError::AlreadyRunning(_))));

    assert_eq!(h.engine.join_job("ep1").await.unwrap(), JobState::Done);
}

#[tokio::test]
async fn test_jobState_afterCompletedRun_shouldAllowRestart() {
    let h = harness(MockBehavior::Working);
    h.engine.load_sequence("ep1", source_sequence(5));

    h.engine.start_job("ep1", test_config(), None).unwrap();
    h.engine.join_job("ep1").await.unwrap();

    // A finished job can be started again, e.g. to re-translate
    h.engine.start_job("ep1", test_config(), None).unwrap();
    assert_eq!(h.engine.join_job("ep1").await.unwrap(), JobState::Done);
}

#[test]
fn test_stopJob_onUnknownJob_shouldError() {
    let h = harness(MockBehavior::Working);
    let err = h.engine.stop_job("nope").unwrap_err();
    assert!(matches!(err, EngineError::Job(JobError::UnknownJob(_))));
}

#[tokio::test]
async fn test_remainingLines_shouldBeDerivableWithoutProviderCalls() {
    let h = harness(MockBehavior::Working);

    let mut seq = source_sequence(6);
    seq.get_mut(1).unwrap().translated_text = "done".to_string();
    seq.get_mut(4).unwrap().source_text = String::new();
    h.engine.load_sequence("ep1", seq);

    // 6 lines, one translated, one with empty source
    assert_eq!(h.engine.remaining_lines("ep1"), Some(4));
    assert_eq!(h.engine.remaining_lines("missing"), None);
    assert_eq!(h.provider.calls(), 0);
}

#[test]
fn test_joinBatch_onUnknownBatch_shouldError() {
    let h = harness(MockBehavior::Working);

    let result = tokio_test::block_on(async { h.engine.join_batch("nope").await });
    assert!(matches!(result.unwrap_err(), EngineError::UnknownBatch(_)));
}

#[tokio::test]
async fn test_joinJob_afterTerminalState_shouldReturnItAgain() {
    let h = harness(MockBehavior::Working);
    h.engine.load_sequence("ep1", source_sequence(5));

    h.engine.start_job("ep1", test_config(), None).unwrap();
    assert_eq!(h.engine.join_job("ep1").await.unwrap(), JobState::Done);

    // The task handle is gone, but the settled state is still reportable
    assert_eq!(h.engine.join_job("ep1").await.unwrap(), JobState::Done);
}

#[tokio::test]
async fn test_joinJob_whileAnotherCallerHoldsTheHandle_shouldError() {
    let h = harness(MockBehavior::Slow { delay_ms: 80 });
    h.engine.load_sequence("ep1", source_sequence(3));
    h.engine.start_job("ep1", test_config(), None).unwrap();

    let engine = h.engine.clone();
    let first = tokio::spawn(async move { engine.join_job("ep1").await });
    tokio::time::sleep(std::time::Duration::from_millis(15)).await;

    // The job is still running and its handle is held elsewhere
    let err = h.engine.join_job("ep1").await.unwrap_err();
    assert!(matches!(err, EngineError::Unknown(_)));

    assert_eq!(first.await.unwrap().unwrap(), JobState::Done);
}
