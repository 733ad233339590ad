/*!
 * # sublate
 *
 * A job orchestration engine for AI subtitle translation.
 *
 * ## Features
 *
 * - Splits long line sequences into bounded chunks and submits them to a
 *   text-generation provider one at a time
 * - Carries a rolling context window across chunks for translation
 *   consistency, with three strategies trading consistency against token
 *   growth and prompt-cache reuse
 * - Salvages truncated or malformed provider output so a transient failure
 *   costs at most part of one chunk
 * - Finds untranslated gaps and resumes only those, coalescing nearby gaps
 * - Runs many jobs under a configurable concurrency cap with cooperative
 *   start/stop semantics, including a sequential mode that chains each
 *   item's output into the next item's context
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `job_config`: Per-job configuration, passed explicitly at start time
 * - `line_sequence`: The ordered collection of translatable entries
 * - `orchestration`: The engine internals:
 *   - `orchestration::chunk`: Chunk planning
 *   - `orchestration::context`: Rolling context window construction
 *   - `orchestration::cycle`: The per-chunk call/parse cycle
 *   - `orchestration::merge`: Merging results back into the sequence
 *   - `orchestration::gaps`: Gap analysis for continuation
 *   - `orchestration::job`: Per-item lifecycle and cancellation
 *   - `orchestration::batch`: Batch coordination
 * - `providers`: The generation boundary (opaque async call + mock)
 * - `store`: Sequence state repository and persistence boundary
 * - `engine`: The facade the UI/state layer talks to
 * - `errors`: Custom error types for the engine
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod engine;
pub mod errors;
pub mod job_config;
pub mod line_sequence;
pub mod orchestration;
pub mod providers;
pub mod store;

// Re-export main types for easier usage
pub use engine::{ProgressCallback, TranslationEngine};
pub use errors::{EngineError, JobError, ProviderError, ValidationError};
pub use job_config::{ContextStrategy, FewShotExample, JobConfig, ModelConfig};
pub use line_sequence::{LineEntry, LineSequence, SequenceFormat};
pub use orchestration::{BatchDescriptor, BatchMode, BatchReport, JobState};
pub use providers::{GenerationRequest, GenerationResponse, Provider};
