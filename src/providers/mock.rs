/*!
 * Mock provider implementations for testing.
 *
 * The mock streams structured JSON output the way a real provider would and
 * can simulate the interesting failure shapes:
 * - `MockProvider::working()` - always succeeds with a full structured response
 * - `MockBehavior::TruncateCall` - cuts one call short mid-array (salvageable)
 * - `MockBehavior::GarbageCall` - one call fails with an unparseable buffer
 * - `MockBehavior::Failing` - every call errors before any output
 * - `MockBehavior::Slow` - adds latency for cancellation/concurrency tests
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::{GenerationRequest, GenerationResponse, PartialSink, Provider};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a complete structured response
    Working,

    /// On the given 1-based call, stream only `keep` complete entries plus a
    /// dangling fragment, then fail. Other calls succeed.
    TruncateCall { call: usize, keep: usize },

    /// On the given 1-based call, stream unparseable text then fail. Other
    /// calls succeed.
    GarbageCall { call: usize },

    /// Always fails before streaming anything
    Failing,

    /// Succeeds after sleeping for the given delay
    Slow { delay_ms: u64 },
}

/// Snapshot of one request the mock received, for test assertions
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// 1-based indices of the requested lines
    pub line_indices: Vec<usize>,

    /// Number of context turns in the request window
    pub window_turns: usize,

    /// Context document carried by the request, if any
    pub context_document: Option<String>,
}

/// Mock provider for exercising the orchestration engine
#[derive(Debug)]
pub struct MockProvider {
    behavior: MockBehavior,
    call_count: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockProvider {
    /// Create a mock with the given behavior
    pub fn new(behavior: MockBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            call_count: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Create a mock that always succeeds
    pub fn working() -> Arc<Self> {
        Self::new(MockBehavior::Working)
    }

    /// Total calls received so far
    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously in-flight calls observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Requests received so far
    pub fn recorded_requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    fn translate(request: &GenerationRequest, text: &str) -> String {
        format!("{} ({})", text, request.target_language)
    }

    fn entry_json(request: &GenerationRequest, index: usize, text: &str) -> String {
        serde_json::json!({
            "index": index,
            "text": Self::translate(request, text),
        })
        .to_string()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn generate(
        &self,
        request: GenerationRequest,
        on_partial: PartialSink<'_>,
    ) -> Result<GenerationResponse, ProviderError> {
        let call = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        // Yield so that concurrently launched calls can overlap
        tokio::task::yield_now().await;

        self.requests.lock().push(RecordedRequest {
            line_indices: request.lines.iter().map(|l| l.index).collect(),
            window_turns: request.context_window.len(),
            context_document: request.context_document.clone(),
        });

        let result = match self.behavior {
            MockBehavior::Failing => Err(ProviderError::RequestFailed(
                "mock provider configured to fail".to_string(),
            )),
            MockBehavior::GarbageCall { call: bad } if call == bad => {
                on_partial("I am sorry, I cannot");
                Err(ProviderError::StreamInterrupted(
                    "mock stream dropped".to_string(),
                ))
            }
            MockBehavior::TruncateCall { call: bad, keep } if call == bad => {
                on_partial("[\n");
                for line in request.lines.iter().take(keep) {
                    let piece = format!("{},\n", Self::entry_json(&request, line.index, &line.text));
                    on_partial(&piece);
                }
                // Dangling fragment: an entry that never finishes
                on_partial("{\"index\":");
                Err(ProviderError::StreamInterrupted(
                    "mock stream dropped mid-entry".to_string(),
                ))
            }
            behavior => {
                if let MockBehavior::Slow { delay_ms } = behavior {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }

                let mut raw = String::from("[\n");
                on_partial("[\n");
                for (i, line) in request.lines.iter().enumerate() {
                    let sep = if i + 1 == request.lines.len() { "\n" } else { ",\n" };
                    let piece = format!("{}{}", Self::entry_json(&request, line.index, &line.text), sep);
                    on_partial(&piece);
                    raw.push_str(&piece);
                }
                on_partial("]");
                raw.push(']');
                Ok(GenerationResponse { text: raw })
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
