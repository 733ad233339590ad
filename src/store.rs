/*!
 * Sequence state and persistence boundaries.
 *
 * Two collaborators live behind traits here:
 * - `SequenceRepository`: the in-memory state the UI layer reads, a plain
 *   get/set map with a subscription mechanism in place of any particular
 *   reactivity framework.
 * - `SequenceStore`: the durable store notified once per merged chunk.
 *   Failures are logged and never propagated; saving is best-effort.
 */

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::line_sequence::LineSequence;

/// Callback fired when a sequence changes in the repository
pub type SequenceListener = Arc<dyn Fn(&str, &LineSequence) + Send + Sync>;

/// In-memory sequence state shared with the UI layer
pub trait SequenceRepository: Send + Sync {
    /// Get a snapshot of the sequence under the given id
    fn get(&self, id: &str) -> Option<LineSequence>;

    /// Replace the sequence under the given id, notifying subscribers
    fn set(&self, id: &str, sequence: LineSequence);

    /// Register a listener fired on every `set`
    fn subscribe(&self, listener: SequenceListener);
}

/// Default `SequenceRepository` backed by a `HashMap`
#[derive(Default)]
pub struct InMemoryRepository {
    sequences: RwLock<HashMap<String, LineSequence>>,
    listeners: RwLock<Vec<SequenceListener>>,
}

impl InMemoryRepository {
    /// Create an empty repository
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of sequences currently held
    pub fn len(&self) -> usize {
        self.sequences.read().len()
    }

    /// Whether the repository is empty
    pub fn is_empty(&self) -> bool {
        self.sequences.read().is_empty()
    }
}

impl SequenceRepository for InMemoryRepository {
    fn get(&self, id: &str) -> Option<LineSequence> {
        self.sequences.read().get(id).cloned()
    }

    fn set(&self, id: &str, sequence: LineSequence) {
        self.sequences
            .write()
            .insert(id.to_string(), sequence.clone());

        for listener in self.listeners.read().iter() {
            listener(id, &sequence);
        }
    }

    fn subscribe(&self, listener: SequenceListener) {
        self.listeners.write().push(listener);
    }
}

/// Durable persistence, invoked once per merged chunk
///
/// Implementations must tolerate concurrent invocation from many jobs; no two
/// jobs ever save the same sequence id concurrently.
#[async_trait]
pub trait SequenceStore: Send + Sync {
    /// Durably save the sequence under the given id
    async fn save(&self, id: &str, sequence: &LineSequence) -> anyhow::Result<()>;
}

/// A saved snapshot held by the in-memory store
#[derive(Debug, Clone)]
pub struct SavedRecord {
    /// The saved sequence
    pub sequence: LineSequence,

    /// When the save happened
    pub saved_at: DateTime<Utc>,

    /// How many times this id has been saved
    pub save_count: usize,
}

/// In-memory `SequenceStore` used in tests and as a default collaborator
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, SavedRecord>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Get the last saved record for an id
    pub fn record(&self, id: &str) -> Option<SavedRecord> {
        self.records.read().get(id).cloned()
    }

    /// How many times the given id has been saved
    pub fn save_count(&self, id: &str) -> usize {
        self.records.read().get(id).map_or(0, |r| r.save_count)
    }
}

#[async_trait]
impl SequenceStore for MemoryStore {
    async fn save(&self, id: &str, sequence: &LineSequence) -> anyhow::Result<()> {
        let mut records = self.records.write();
        let save_count = records.get(id).map_or(0, |r| r.save_count) + 1;
        records.insert(
            id.to_string(),
            SavedRecord {
                sequence: sequence.clone(),
                saved_at: Utc::now(),
                save_count,
            },
        );
        debug!("Saved sequence '{}' (save #{})", id, save_count);
        Ok(())
    }
}
