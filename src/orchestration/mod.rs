/*!
 * The translation job orchestration engine.
 *
 * Submodules, leaves first:
 * - `chunk`: planning the next contiguous sub-range to submit
 * - `context`: rolling context window construction
 * - `parse`: structured-output parsing and salvage
 * - `cycle`: the per-chunk call/parse cycle
 * - `merge`: writing parsed results back into the sequence
 * - `gaps`: gap analysis for continuation runs
 * - `job`: per-item lifecycle and the chunk loop
 * - `batch`: running many jobs under one concurrency policy
 */

// Re-export the types callers actually touch
pub use self::batch::{BatchDescriptor, BatchMode, BatchReport};
pub use self::chunk::ChunkSpan;
pub use self::context::{ContextTurn, TurnRole};
pub use self::cycle::{CallCycle, ChunkOutcome, ChunkResult};
pub use self::gaps::Gap;
pub use self::job::{CancelToken, JobHandle, JobState, TranslationJob, PARSE_FAILURE_MARKER};
pub use self::merge::{MergeEngine, MergeStats};
pub use self::parse::ParsedEntry;

pub mod batch;
pub mod chunk;
pub mod context;
pub mod cycle;
pub mod gaps;
pub mod job;
pub mod merge;
pub mod parse;
