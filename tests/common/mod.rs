/*!
 * Shared helpers for the sublate test suite.
 */

use std::sync::Arc;

use sublate::providers::mock::{MockBehavior, MockProvider};
use sublate::store::{InMemoryRepository, MemoryStore};
use sublate::{JobConfig, LineSequence, SequenceFormat, TranslationEngine};

/// A sequence of `count` numbered source lines, untranslated
pub fn source_sequence(count: usize) -> LineSequence {
    LineSequence::from_source_lines(SequenceFormat::Srt, (1..=count).map(|i| format!("line {i}")))
}

/// A job config suitable for tests: en -> fr, chunk size 4, no cooldown
pub fn test_config() -> JobConfig {
    JobConfig::new("en", "fr").with_chunk_size(4).without_cooldown()
}

/// Engine plus handles on its collaborators for assertions
pub struct TestHarness {
    pub engine: TranslationEngine,
    pub provider: Arc<MockProvider>,
    pub repository: Arc<InMemoryRepository>,
    pub store: Arc<MemoryStore>,
}

/// Build an engine wired to a mock provider with the given behavior
pub fn harness(behavior: MockBehavior) -> TestHarness {
    // RUST_LOG=debug makes the engine's chunk/merge logging visible
    let _ = env_logger::builder().is_test(true).try_init();

    let provider = MockProvider::new(behavior);
    let repository = InMemoryRepository::new();
    let store = MemoryStore::new();
    let engine = TranslationEngine::new(provider.clone(), repository.clone(), store.clone());

    TestHarness {
        engine,
        provider,
        repository,
        store,
    }
}
