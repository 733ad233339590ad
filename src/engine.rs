/*!
 * Engine facade: the boundary the UI/state layer talks to.
 *
 * The engine owns the job and batch registries and wires each job to the
 * provider, repository, and persistence store. It is cheap to clone; all
 * state lives behind an `Arc`. Jobs are spawned onto the tokio runtime and
 * observed through their handles; `join_*` waits for completion where a
 * caller needs it (tests, sequential batches).
 */

use futures::FutureExt;
use log::{info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::errors::{EngineError, JobError, ValidationError};
use crate::job_config::JobConfig;
use crate::line_sequence::{LineEntry, LineSequence};
use crate::orchestration::batch::{self, BatchDescriptor, BatchReport, ItemRunner};
use crate::orchestration::cycle::CallCycle;
use crate::orchestration::job::{CancelToken, JobHandle, JobState, TranslationJob};
use crate::orchestration::merge::MergeEngine;
use crate::providers::Provider;
use crate::store::{InMemoryRepository, MemoryStore, SequenceRepository, SequenceStore};

/// Callback receiving `(job_id, partial_raw_text)` during streaming
pub type ProgressCallback = Arc<dyn Fn(&str, &str) + Send + Sync>;

struct JobRecord {
    handle: JobHandle,
    join: Option<JoinHandle<JobState>>,
}

struct BatchRecord {
    cancel: CancelToken,
    item_ids: Vec<String>,
    join: Option<JoinHandle<BatchReport>>,
}

struct EngineInner {
    provider: Arc<dyn Provider>,
    repository: Arc<dyn SequenceRepository>,
    store: Arc<dyn SequenceStore>,
    jobs: Mutex<HashMap<String, JobRecord>>,
    batches: Mutex<HashMap<String, BatchRecord>>,
    progress: Mutex<Option<ProgressCallback>>,
}

/// The translation engine
#[derive(Clone)]
pub struct TranslationEngine {
    inner: Arc<EngineInner>,
}

impl TranslationEngine {
    /// Create an engine over explicit collaborators
    pub fn new(
        provider: Arc<dyn Provider>,
        repository: Arc<dyn SequenceRepository>,
        store: Arc<dyn SequenceStore>,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                provider,
                repository,
                store,
                jobs: Mutex::new(HashMap::new()),
                batches: Mutex::new(HashMap::new()),
                progress: Mutex::new(None),
            }),
        }
    }

    /// Create an engine with in-memory state and persistence
    pub fn with_defaults(provider: Arc<dyn Provider>) -> Self {
        Self::new(provider, InMemoryRepository::new(), MemoryStore::new())
    }

    /// Register or replace a sequence in the repository
    pub fn load_sequence(&self, id: &str, sequence: LineSequence) {
        self.inner.repository.set(id, sequence);
    }

    /// Snapshot of the sequence under the given id
    pub fn sequence(&self, id: &str) -> Option<LineSequence> {
        self.inner.repository.get(id)
    }

    /// Install the streaming progress callback
    pub fn on_progress(&self, callback: ProgressCallback) {
        *self.inner.progress.lock() = Some(callback);
    }

    /// Current state of a job, if known
    pub fn job_state(&self, id: &str) -> Option<JobState> {
        self.inner.jobs.lock().get(id).map(|r| r.handle.state())
    }

    /// Annotated raw output of a job's last unrecoverable failure
    pub fn job_error(&self, id: &str) -> Option<String> {
        self.inner.jobs.lock().get(id).and_then(|r| r.handle.last_error())
    }

    /// Lines still awaiting translation, derivable without any provider call
    pub fn remaining_lines(&self, id: &str) -> Option<usize> {
        self.inner.repository.get(id).map(|s| s.remaining_count())
    }

    /// Start a translation job over the whole sequence or an explicit range
    ///
    /// Validation failures surface here; the job never transitions to
    /// `Running` on invalid input.
    pub fn start_job(
        &self,
        id: &str,
        config: JobConfig,
        range_override: Option<(usize, usize)>,
    ) -> Result<(), EngineError> {
        let handle = self.prepare_job(id, &config, range_override)?;

        let inner = self.inner.clone();
        let id_owned = id.to_string();
        let join = tokio::spawn(execute_job(
            inner,
            id_owned.clone(),
            config,
            range_override,
            false,
            handle,
        ));

        if let Some(record) = self.inner.jobs.lock().get_mut(&id_owned) {
            record.join = Some(join);
        }
        Ok(())
    }

    /// Start a continuation run over the still-untranslated gaps
    pub fn continue_job(&self, id: &str, config: JobConfig) -> Result<(), EngineError> {
        let handle = self.prepare_job(id, &config, None)?;

        let inner = self.inner.clone();
        let id_owned = id.to_string();
        let join = tokio::spawn(execute_job(inner, id_owned.clone(), config, None, true, handle));

        if let Some(record) = self.inner.jobs.lock().get_mut(&id_owned) {
            record.join = Some(join);
        }
        Ok(())
    }

    /// Request a cooperative stop of a running job
    ///
    /// The in-flight chunk completes and merges before the loop exits.
    pub fn stop_job(&self, id: &str) -> Result<(), EngineError> {
        let jobs = self.inner.jobs.lock();
        let record = jobs
            .get(id)
            .ok_or_else(|| EngineError::Job(JobError::UnknownJob(id.to_string())))?;

        if record.handle.state() == JobState::Running {
            record.handle.set_state(JobState::Stopping);
        }
        record.handle.cancel.request_stop();
        info!("Stop requested for job '{}'", id);
        Ok(())
    }

    /// Wait for a previously started job to reach its terminal state
    pub async fn join_job(&self, id: &str) -> Result<JobState, EngineError> {
        let join = {
            let mut jobs = self.inner.jobs.lock();
            let record = jobs
                .get_mut(id)
                .ok_or_else(|| EngineError::Job(JobError::UnknownJob(id.to_string())))?;
            record.join.take()
        };

        match join {
            Some(join) => join
                .await
                .map_err(|e| EngineError::Unknown(format!("job task panicked: {e}"))),
            None => {
                // Another caller holds the JoinHandle; only a settled state
                // can be reported truthfully here.
                let state = self
                    .job_state(id)
                    .ok_or_else(|| EngineError::Job(JobError::UnknownJob(id.to_string())))?;
                if state.is_terminal() {
                    Ok(state)
                } else {
                    Err(EngineError::Unknown(format!("job '{id}' already joined")))
                }
            }
        }
    }

    /// Start a batch of jobs under one concurrency policy
    ///
    /// Returns the batch id. The shared config is applied to every item; in
    /// sequential mode each item additionally receives the previous item's
    /// completed output as its context document.
    pub fn start_batch(
        &self,
        descriptor: BatchDescriptor,
        config: JobConfig,
    ) -> Result<String, EngineError> {
        config.validate()?;

        let batch_id = Uuid::new_v4().to_string();
        let cancel = CancelToken::new();
        let runner = self.item_runner(config);

        let join = tokio::spawn(batch::run_batch(descriptor.clone(), cancel.clone(), runner));

        self.inner.batches.lock().insert(
            batch_id.clone(),
            BatchRecord {
                cancel,
                item_ids: descriptor.item_ids,
                join: Some(join),
            },
        );

        info!("Batch '{}' started", &batch_id[..8]);
        Ok(batch_id)
    }

    /// Stop a batch: no queued item starts, running jobs stop cooperatively
    pub fn stop_batch(&self, batch_id: &str) -> Result<(), EngineError> {
        let item_ids = {
            let batches = self.inner.batches.lock();
            let record = batches
                .get(batch_id)
                .ok_or_else(|| EngineError::UnknownBatch(batch_id.to_string()))?;
            record.cancel.request_stop();
            record.item_ids.clone()
        };

        for id in &item_ids {
            // Items that never started are not registered; that is fine
            let _ = self.stop_job(id);
        }
        info!("Stop requested for batch '{}'", batch_id);
        Ok(())
    }

    /// Wait for a batch to finish and return its per-item report
    pub async fn join_batch(&self, batch_id: &str) -> Result<BatchReport, EngineError> {
        let join = {
            let mut batches = self.inner.batches.lock();
            let record = batches
                .get_mut(batch_id)
                .ok_or_else(|| EngineError::UnknownBatch(batch_id.to_string()))?;
            record.join.take()
        };

        match join {
            Some(join) => join
                .await
                .map_err(|e| EngineError::Unknown(format!("batch task panicked: {e}"))),
            None => Err(EngineError::Unknown(format!(
                "batch '{batch_id}' already joined"
            ))),
        }
    }

    /// Validate and register a job, returning its fresh handle
    fn prepare_job(
        &self,
        id: &str,
        config: &JobConfig,
        range_override: Option<(usize, usize)>,
    ) -> Result<JobHandle, EngineError> {
        config.validate()?;

        let sequence = self
            .inner
            .repository
            .get(id)
            .ok_or_else(|| ValidationError::UnknownSequence(id.to_string()))?;
        if sequence.is_empty() {
            return Err(ValidationError::EmptySequence(id.to_string()).into());
        }
        if let Some((start, end)) = range_override {
            if start == 0 || start > end || end > sequence.len() {
                return Err(ValidationError::InvalidRange {
                    start,
                    end,
                    len: sequence.len(),
                }
                .into());
            }
        }

        let mut jobs = self.inner.jobs.lock();
        if let Some(existing) = jobs.get(id) {
            if matches!(existing.handle.state(), JobState::Running | JobState::Stopping) {
                return Err(JobError::AlreadyRunning(id.to_string()).into());
            }
        }

        let handle = JobHandle::new();
        jobs.insert(
            id.to_string(),
            JobRecord {
                handle: handle.clone(),
                join: None,
            },
        );
        Ok(handle)
    }

    /// Build the per-item runner a batch coordinator drives
    fn item_runner(&self, config: JobConfig) -> ItemRunner {
        let engine = self.clone();

        Arc::new(move |item_id: String, chained_context: Option<String>| {
            let engine = engine.clone();
            let mut item_config = config.clone();
            if chained_context.is_some() {
                item_config.context_document = chained_context;
            }

            async move {
                let handle = match engine.prepare_job(&item_id, &item_config, None) {
                    Ok(handle) => handle,
                    Err(e) => {
                        warn!("Batch item '{}' rejected: {}", item_id, e);
                        return (JobState::Error, None);
                    }
                };

                let state = execute_job(
                    engine.inner.clone(),
                    item_id.clone(),
                    item_config,
                    None,
                    false,
                    handle,
                )
                .await;

                let output = if state == JobState::Done {
                    engine.sequence(&item_id).map(|seq| completed_output(&seq))
                } else {
                    None
                };
                (state, output)
            }
            .boxed()
        })
    }
}

/// Run one job to its terminal state
async fn execute_job(
    inner: Arc<EngineInner>,
    id: String,
    config: JobConfig,
    range_override: Option<(usize, usize)>,
    continuation: bool,
    handle: JobHandle,
) -> JobState {
    let Some(mut sequence) = inner.repository.get(&id) else {
        // Validated at prepare time; losing the sequence mid-start is a bug
        // in the embedding application, not a job failure mode.
        warn!("Sequence '{}' vanished before job start", id);
        handle.set_state(JobState::Error);
        return JobState::Error;
    };

    let progress = inner.progress.lock().clone();
    let job = TranslationJob::new(
        id.clone(),
        config,
        CallCycle::new(inner.provider.clone()),
        MergeEngine::new(inner.repository.clone(), inner.store.clone()),
        handle,
        progress,
    );

    if continuation {
        job.run_continuation(&mut sequence).await
    } else {
        job.run(&mut sequence, range_override).await
    }
}

/// Render a finished sequence as a context document for chaining
fn completed_output(sequence: &LineSequence) -> String {
    sequence
        .entries
        .iter()
        .filter(|e| !e.translated_text.is_empty())
        .map(render_translated)
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_translated(entry: &LineEntry) -> String {
    match &entry.speaker {
        Some(speaker) => format!("{}: {}", speaker, entry.translated_text),
        None => entry.translated_text.clone(),
    }
}
