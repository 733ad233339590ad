/*!
 * Merging parsed results back into the master sequence.
 *
 * Merging is idempotent per index and never destructive: an empty translated
 * text in a result leaves the existing value untouched, which protects
 * against partial or salvaged results that omit some lines. After each merge
 * the engine writes the sequence back to the repository and notifies the
 * persistence store, once per chunk, to bound data loss on interruption.
 */

use log::warn;
use std::sync::Arc;

use crate::line_sequence::LineSequence;
use crate::store::{SequenceRepository, SequenceStore};

use super::parse::ParsedEntry;

/// What happened during one merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Entries written into the sequence
    pub merged: usize,

    /// Entries skipped because their text was empty
    pub skipped_empty: usize,

    /// Entries ignored because their index is outside the sequence
    pub out_of_range: usize,
}

/// Merge parsed entries into the sequence by stable index
pub fn merge_entries(sequence: &mut LineSequence, entries: &[ParsedEntry]) -> MergeStats {
    let mut stats = MergeStats::default();

    for parsed in entries {
        if parsed.text.is_empty() {
            stats.skipped_empty += 1;
            continue;
        }
        match sequence.get_mut(parsed.index) {
            Some(entry) => {
                entry.translated_text = parsed.text.clone();
                stats.merged += 1;
            }
            None => stats.out_of_range += 1,
        }
    }

    stats
}

/// Highest index actually written by a merge, if any
pub fn highest_merged_index(sequence: &LineSequence, entries: &[ParsedEntry]) -> Option<usize> {
    entries
        .iter()
        .filter(|e| !e.text.is_empty() && sequence.get(e.index).is_some())
        .map(|e| e.index)
        .max()
}

/// Applies merges and fans out state/persistence notifications
#[derive(Clone)]
pub struct MergeEngine {
    repository: Arc<dyn SequenceRepository>,
    store: Arc<dyn SequenceStore>,
}

impl MergeEngine {
    /// Create a merge engine over the given collaborators
    pub fn new(repository: Arc<dyn SequenceRepository>, store: Arc<dyn SequenceStore>) -> Self {
        Self { repository, store }
    }

    /// Merge one chunk's entries and notify the repository and store
    ///
    /// Persistence failures are logged, not propagated.
    pub async fn commit(
        &self,
        sequence_id: &str,
        sequence: &mut LineSequence,
        entries: &[ParsedEntry],
    ) -> MergeStats {
        let stats = merge_entries(sequence, entries);

        self.repository.set(sequence_id, sequence.clone());
        if let Err(e) = self.store.save(sequence_id, sequence).await {
            warn!("Best-effort save of '{}' failed: {}", sequence_id, e);
        }

        stats
    }

    /// Persist the final sequence state on a terminal transition
    pub async fn finalize(&self, sequence_id: &str, sequence: &LineSequence) {
        self.repository.set(sequence_id, sequence.clone());
        if let Err(e) = self.store.save(sequence_id, sequence).await {
            warn!("Final save of '{}' failed: {}", sequence_id, e);
        }
    }
}
