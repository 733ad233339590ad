/*!
 * Batch coordination: running many jobs under one concurrency policy.
 *
 * Independent mode races items to completion under a semaphore-bounded pool;
 * sequential mode serializes items and threads each finished item's output
 * document into the next item's input context, which is what cross-episode
 * continuity needs. One item's error never aborts its siblings.
 */

use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::job_config::MAX_BATCH_CONCURRENCY;

use super::job::{CancelToken, JobState};

/// Scheduling mode for a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BatchMode {
    /// Launch items without inter-item context; jobs race to completion
    #[default]
    Independent,

    /// One item at a time; the previous item's completed output becomes the
    /// next item's context document
    Sequential,
}

/// Describes a batch of sequence ids to run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchDescriptor {
    /// Ordered sequence ids
    pub item_ids: Vec<String>,

    /// Requested concurrency; clamped to `[1, MAX_BATCH_CONCURRENCY]`,
    /// forced to 1 in sequential mode
    pub concurrency_limit: usize,

    /// Scheduling mode
    #[serde(default)]
    pub mode: BatchMode,
}

impl BatchDescriptor {
    /// Create an independent batch
    pub fn independent(item_ids: Vec<String>, concurrency_limit: usize) -> Self {
        Self {
            item_ids,
            concurrency_limit,
            mode: BatchMode::Independent,
        }
    }

    /// Create a sequential batch
    pub fn sequential(item_ids: Vec<String>) -> Self {
        Self {
            item_ids,
            concurrency_limit: 1,
            mode: BatchMode::Sequential,
        }
    }

    /// Concurrency after clamping and mode rules
    pub fn effective_concurrency(&self) -> usize {
        match self.mode {
            BatchMode::Sequential => 1,
            BatchMode::Independent => self.concurrency_limit.clamp(1, MAX_BATCH_CONCURRENCY),
        }
    }
}

/// Terminal states of a finished batch, in item order
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Per-item terminal state, `None` for items never started
    pub outcomes: Vec<(String, Option<JobState>)>,
}

impl BatchReport {
    /// Items that reached `Done`
    pub fn done_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, s)| *s == Some(JobState::Done))
            .count()
    }
}

/// One item's run: takes the item id and an optional chained context
/// document, returns the terminal state and the item's completed output
/// document (used for chaining in sequential mode).
pub type ItemRunner =
    Arc<dyn Fn(String, Option<String>) -> BoxFuture<'static, (JobState, Option<String>)> + Send + Sync>;

/// Run a batch to completion
///
/// The cancel token prevents queued items from starting; stopping jobs that
/// are already running is the engine's concern.
pub async fn run_batch(
    descriptor: BatchDescriptor,
    cancel: CancelToken,
    runner: ItemRunner,
) -> BatchReport {
    match descriptor.mode {
        BatchMode::Sequential => run_sequential(descriptor, cancel, runner).await,
        BatchMode::Independent => run_independent(descriptor, cancel, runner).await,
    }
}

async fn run_independent(
    descriptor: BatchDescriptor,
    cancel: CancelToken,
    runner: ItemRunner,
) -> BatchReport {
    let limit = descriptor.effective_concurrency();
    let semaphore = Arc::new(Semaphore::new(limit));
    let total = descriptor.item_ids.len();

    info!("Starting independent batch: {} items, concurrency {}", total, limit);

    let outcomes = stream::iter(descriptor.item_ids.into_iter().enumerate())
        .map(|(position, item_id)| {
            let semaphore = semaphore.clone();
            let cancel = cancel.clone();
            let runner = runner.clone();

            async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return (position, item_id, None);
                };

                // Queued items never start once the batch is cancelled
                if cancel.is_stop_requested() {
                    return (position, item_id, None);
                }

                let (state, _output) = runner(item_id.clone(), None).await;
                (position, item_id, Some(state))
            }
        })
        .buffer_unordered(limit)
        .collect::<Vec<_>>()
        .await;

    let mut sorted = outcomes;
    sorted.sort_by_key(|(position, _, _)| *position);

    BatchReport {
        outcomes: sorted
            .into_iter()
            .map(|(_, id, state)| (id, state))
            .collect(),
    }
}

async fn run_sequential(
    descriptor: BatchDescriptor,
    cancel: CancelToken,
    runner: ItemRunner,
) -> BatchReport {
    info!("Starting sequential batch: {} items", descriptor.item_ids.len());

    let mut outcomes = Vec::with_capacity(descriptor.item_ids.len());
    let mut chained_context: Option<String> = None;

    for item_id in descriptor.item_ids {
        if cancel.is_stop_requested() {
            outcomes.push((item_id, None));
            continue;
        }

        let (state, output) = runner(item_id.clone(), chained_context.take()).await;

        // Chain only fully completed output into the next item
        if state == JobState::Done {
            chained_context = output;
        } else {
            warn!("Batch item '{}' ended {:?}, breaking context chain", item_id, state);
        }

        outcomes.push((item_id, Some(state)));
    }

    BatchReport { outcomes }
}
