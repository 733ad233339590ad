/*!
 * Per-item job lifecycle and the chunk loop.
 *
 * A job owns its sequence for the duration of a run: it repeatedly plans the
 * next chunk, builds the rolling context window, submits the chunk through
 * the call cycle, merges the result, and persists. Cancellation is
 * cooperative; the token is polled at the top of each chunk iteration and
 * before each gap, never pre-empting an in-flight call.
 */

use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::job_config::JobConfig;
use crate::line_sequence::LineSequence;
use crate::providers::{GenerationRequest, RequestLine};

use super::chunk::{self, ChunkSpan};
use super::context;
use super::cycle::{CallCycle, ChunkOutcome};
use super::gaps;
use super::merge::{self, MergeEngine};

/// Marker appended to raw output preserved from an unrecoverable failure
pub const PARSE_FAILURE_MARKER: &str = "<<<UNRECOVERABLE>>>";

/// Lifecycle state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Created, not yet started
    Idle,
    /// Chunk loop in progress
    Running,
    /// Stop requested, waiting for the in-flight chunk to finish
    Stopping,
    /// Stopped cooperatively; merged chunks are preserved
    Stopped,
    /// Planned range exhausted without unrecoverable error
    Done,
    /// Salvage failed; raw text preserved on the handle
    Error,
}

impl JobState {
    /// Whether the job has reached a terminal state
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Done | Self::Error)
    }
}

/// Explicit cancellation token, polled at defined suspension points
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a fresh, unset token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a cooperative stop
    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether a stop has been requested
    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Shared view of a job the engine and coordinator read
#[derive(Debug, Clone, Default)]
pub struct JobHandle {
    state: Arc<Mutex<Option<JobState>>>,
    /// Annotated raw output from an unrecoverable failure
    last_error: Arc<Mutex<Option<String>>>,
    /// Cancellation token for this run
    pub cancel: CancelToken,
}

impl JobHandle {
    /// Create a handle in the idle state
    pub fn new() -> Self {
        let handle = Self::default();
        handle.set_state(JobState::Idle);
        handle
    }

    /// Current job state
    pub fn state(&self) -> JobState {
        (*self.state.lock()).unwrap_or(JobState::Idle)
    }

    /// Set the job state
    pub fn set_state(&self, state: JobState) {
        *self.state.lock() = Some(state);
    }

    /// Annotated raw output from the last unrecoverable failure, if any
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    fn record_error(&self, raw: &str) {
        *self.last_error.lock() = Some(format!("{raw}\n{PARSE_FAILURE_MARKER}"));
    }
}

/// How one range run ended
enum RangeEnd {
    Completed,
    Stopped,
    Failed { raw: String },
}

/// A single translation job bound to one sequence
pub struct TranslationJob {
    id: String,
    config: JobConfig,
    cycle: CallCycle,
    merge_engine: MergeEngine,
    handle: JobHandle,
    progress: Option<Arc<dyn Fn(&str, &str) + Send + Sync>>,
}

impl TranslationJob {
    /// Create a job; validation has already happened at the engine boundary
    pub fn new(
        id: String,
        config: JobConfig,
        cycle: CallCycle,
        merge_engine: MergeEngine,
        handle: JobHandle,
        progress: Option<Arc<dyn Fn(&str, &str) + Send + Sync>>,
    ) -> Self {
        Self {
            id,
            config,
            cycle,
            merge_engine,
            handle,
            progress,
        }
    }

    /// Run the job over the given range (defaults to the whole sequence)
    ///
    /// Returns the terminal state. The sequence is mutated in place and
    /// written back through the merge engine after every chunk.
    pub async fn run(
        &self,
        sequence: &mut LineSequence,
        range_override: Option<(usize, usize)>,
    ) -> JobState {
        let (start, end) = range_override.unwrap_or((1, sequence.len()));

        self.handle.set_state(JobState::Running);
        info!(
            "Job '{}' running over [{}, {}] (chunk size {})",
            self.id,
            start,
            end,
            self.config.effective_chunk_size()
        );

        let terminal = match self.run_range(sequence, start, end, start).await {
            RangeEnd::Completed => JobState::Done,
            RangeEnd::Stopped => JobState::Stopped,
            RangeEnd::Failed { raw } => {
                self.handle.record_error(&raw);
                JobState::Error
            }
        };

        self.finish(sequence, terminal).await
    }

    /// Run only the still-untranslated portions of the sequence
    ///
    /// Gaps are computed up front, coalesced with the configured tolerance,
    /// and processed strictly in order; a stop observed before a gap aborts
    /// the remaining gaps.
    pub async fn run_continuation(&self, sequence: &mut LineSequence) -> JobState {
        let found = gaps::find_gaps(sequence);
        let merged = gaps::merge_nearby_gaps(&found, self.config.gap_tolerance);

        self.handle.set_state(JobState::Running);
        info!(
            "Job '{}' continuing: {} gaps ({} after merging)",
            self.id,
            found.len(),
            merged.len()
        );

        let mut terminal = JobState::Done;
        for gap in merged {
            if self.handle.cancel.is_stop_requested() {
                terminal = JobState::Stopped;
                break;
            }
            // Anchor the window at the sequence start so already-translated
            // lines before the gap still provide context.
            match self.run_range(sequence, gap.start, gap.end, 1).await {
                RangeEnd::Completed => {}
                RangeEnd::Stopped => {
                    terminal = JobState::Stopped;
                    break;
                }
                RangeEnd::Failed { raw } => {
                    self.handle.record_error(&raw);
                    terminal = JobState::Error;
                    break;
                }
            }
        }

        self.finish(sequence, terminal).await
    }

    /// Drive the chunk loop over `[start, end]`
    async fn run_range(
        &self,
        sequence: &mut LineSequence,
        start: usize,
        end: usize,
        window_anchor: usize,
    ) -> RangeEnd {
        let chunk_size = self.config.effective_chunk_size();
        let mut next = chunk::first_chunk(start, end, chunk_size);
        let mut first = true;

        while let Some(span) = next {
            // Cooperative stop, checked between chunks only
            if self.handle.cancel.is_stop_requested() {
                return RangeEnd::Stopped;
            }

            if !first && self.config.chunk_cooldown_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.chunk_cooldown_ms)).await;
            }
            first = false;

            let last_processed = match self.process_chunk(sequence, span, window_anchor).await {
                Ok(last) => last,
                Err(raw) => return RangeEnd::Failed { raw },
            };

            next = chunk::next_chunk(last_processed, end, chunk_size);
        }

        RangeEnd::Completed
    }

    /// Submit one chunk, merge its result, and return the last processed index
    async fn process_chunk(
        &self,
        sequence: &mut LineSequence,
        span: ChunkSpan,
        window_anchor: usize,
    ) -> Result<usize, String> {
        let window = context::build_window(
            sequence,
            window_anchor,
            span.start,
            self.config.context_strategy,
            self.config.effective_chunk_size(),
        );

        let lines: Vec<RequestLine> = (span.start..=span.end)
            .filter_map(|index| sequence.get(index))
            .map(|entry| RequestLine {
                index: entry.index,
                speaker: entry.speaker.clone(),
                text: entry.source_text.clone(),
            })
            .collect();

        let request = GenerationRequest::from_config(&self.config, lines, window);

        let id = self.id.clone();
        let progress = self.progress.clone();
        let sink = move |piece: &str| {
            if let Some(cb) = &progress {
                cb(&id, piece);
            }
        };

        debug!("Job '{}' submitting chunk [{}, {}]", self.id, span.start, span.end);

        match self.cycle.submit(request, &sink).await {
            ChunkOutcome::Complete(result) => {
                let stats = self
                    .merge_engine
                    .commit(&self.id, sequence, &result.entries)
                    .await;
                debug!(
                    "Job '{}' merged chunk [{}, {}]: {:?}",
                    self.id, span.start, span.end, stats
                );
                Ok(span.end)
            }
            ChunkOutcome::Recovered(result) => {
                // A salvaged chunk may cover only a prefix; resume right after
                // the highest index actually recovered.
                let resume_after = merge::highest_merged_index(sequence, &result.entries)
                    .unwrap_or(span.start)
                    .max(span.start);
                let stats = self
                    .merge_engine
                    .commit(&self.id, sequence, &result.entries)
                    .await;
                warn!(
                    "Job '{}' recovered partial chunk [{}, {}]: {:?}, resuming after {}",
                    self.id, span.start, span.end, stats, resume_after
                );
                Ok(resume_after)
            }
            ChunkOutcome::Fatal { raw } => Err(raw),
        }
    }

    /// Apply the terminal transition: persist final state, free capacity
    async fn finish(&self, sequence: &LineSequence, terminal: JobState) -> JobState {
        self.merge_engine.finalize(&self.id, sequence).await;
        self.handle.set_state(terminal);
        info!("Job '{}' finished: {:?}", self.id, terminal);
        terminal
    }
}
