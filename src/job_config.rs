/*!
 * Job configuration.
 *
 * Every job receives an explicit `JobConfig` at start time; there are no
 * global settings reads inside the engine. The chunk planner, context window
 * builder, and call cycle are all functions of the sequence, this config, and
 * the rolling window.
 */

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

/// Smallest allowed chunk size
pub const MIN_CHUNK_SIZE: usize = 1;

/// Largest allowed chunk size
pub const MAX_CHUNK_SIZE: usize = 300;

/// Lines of trailing context kept under the minimal strategy
pub const MINIMAL_CONTEXT_LINES: usize = 5;

/// Default distance under which nearby gaps are coalesced
pub const DEFAULT_GAP_TOLERANCE: usize = 5;

/// Hard cap on concurrent jobs in a batch
pub const MAX_BATCH_CONCURRENCY: usize = 10;

/// Default cooldown between chunks of the same job, in milliseconds
pub const DEFAULT_CHUNK_COOLDOWN_MS: u64 = 3000;

/// Strategy for assembling the rolling context window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContextStrategy {
    /// Window spans from the first processed line of the job. Unbounded
    /// growth, reserved for large-context providers.
    Full,

    /// Window spans the previous `chunk_size` lines, keeping the window
    /// proportional to chunk size for prompt-cache reuse.
    #[default]
    Caching,

    /// Window capped to `MINIMAL_CONTEXT_LINES` immediately preceding the
    /// chunk start.
    Minimal,
}

/// Model parameters forwarded to the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name
    pub model_name: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum output tokens per request
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Whether to request structured (JSON) output
    #[serde(default = "default_true")]
    pub structured_output: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_name: "default".to_string(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            structured_output: true,
        }
    }
}

/// A source/translation example pair supplied by the user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FewShotExample {
    /// Source-language content
    pub content: String,

    /// Target-language rendition
    pub translated_text: String,
}

/// Per-job configuration, passed explicitly at job start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Title of the work being translated
    #[serde(default)]
    pub title: String,

    /// Source language code
    pub source_language: String,

    /// Target language code
    pub target_language: String,

    /// Free-form instructions appended to the prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_instructions: Option<String>,

    /// Extra context document, e.g. the previous episode's output in
    /// sequential batch mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_document: Option<String>,

    /// Few-shot example pairs, validated before the job starts
    #[serde(default)]
    pub few_shot_examples: Vec<FewShotExample>,

    /// Requested lines per chunk; clamped to the legal interval before use
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Context window strategy
    #[serde(default)]
    pub context_strategy: ContextStrategy,

    /// Cooldown between chunks, in milliseconds
    #[serde(default = "default_chunk_cooldown_ms")]
    pub chunk_cooldown_ms: u64,

    /// Gap-merge tolerance for continuation runs
    #[serde(default = "default_gap_tolerance")]
    pub gap_tolerance: usize,

    /// Model parameters
    #[serde(default)]
    pub model: ModelConfig,
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_output_tokens() -> u32 {
    8192
}

fn default_true() -> bool {
    true
}

fn default_chunk_size() -> usize {
    30
}

fn default_chunk_cooldown_ms() -> u64 {
    DEFAULT_CHUNK_COOLDOWN_MS
}

fn default_gap_tolerance() -> usize {
    DEFAULT_GAP_TOLERANCE
}

impl JobConfig {
    /// Create a config for a language pair with defaults everywhere else
    pub fn new(source_language: &str, target_language: &str) -> Self {
        Self {
            title: String::new(),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            custom_instructions: None,
            context_document: None,
            few_shot_examples: Vec::new(),
            chunk_size: default_chunk_size(),
            context_strategy: ContextStrategy::default(),
            chunk_cooldown_ms: default_chunk_cooldown_ms(),
            gap_tolerance: default_gap_tolerance(),
            model: ModelConfig::default(),
        }
    }

    /// Chunk size clamped to `[MIN_CHUNK_SIZE, MAX_CHUNK_SIZE]`
    pub fn effective_chunk_size(&self) -> usize {
        self.chunk_size.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE)
    }

    /// Validate the config before a job is allowed to start
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.source_language.trim().is_empty() {
            return Err(ValidationError::MissingLanguage("source".to_string()));
        }
        if self.target_language.trim().is_empty() {
            return Err(ValidationError::MissingLanguage("target".to_string()));
        }
        validate_few_shot_examples(&self.few_shot_examples)
    }

    /// Set the chunk size
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the context strategy
    pub fn with_context_strategy(mut self, strategy: ContextStrategy) -> Self {
        self.context_strategy = strategy;
        self
    }

    /// Disable the inter-chunk cooldown (used by tests and local providers)
    pub fn without_cooldown(mut self) -> Self {
        self.chunk_cooldown_ms = 0;
        self
    }
}

/// Validate few-shot example pairs
///
/// Invalid input aborts job start with a user-facing validation error and
/// never reaches the call cycle.
pub fn validate_few_shot_examples(examples: &[FewShotExample]) -> Result<(), ValidationError> {
    for (i, example) in examples.iter().enumerate() {
        if example.content.trim().is_empty() {
            return Err(ValidationError::InvalidFewShotExample {
                position: i + 1,
                reason: "empty content".to_string(),
            });
        }
        if example.translated_text.trim().is_empty() {
            return Err(ValidationError::InvalidFewShotExample {
                position: i + 1,
                reason: "empty translation".to_string(),
            });
        }
    }
    Ok(())
}
