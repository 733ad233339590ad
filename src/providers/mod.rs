/*!
 * Provider boundary for text generation.
 *
 * The engine treats the generation service as an opaque async call: build a
 * `GenerationRequest`, receive streamed partial text, and get the full raw
 * response back. Transport concerns (HTTP, SDK, local process) live behind
 * the `Provider` trait.
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;
use crate::job_config::{FewShotExample, JobConfig};
use crate::orchestration::context::ContextTurn;

/// Callback receiving partial raw text as it streams in
pub type PartialSink<'a> = &'a (dyn Fn(&str) + Send + Sync);

/// A single line projected into a generation request
#[derive(Debug, Clone, serde::Serialize)]
pub struct RequestLine {
    /// Stable 1-based index in the master sequence
    pub index: usize,

    /// Optional speaker label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,

    /// Source text to translate
    pub text: String,
}

/// A generation request, constructed fresh per chunk and immutable once sent
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Title of the work
    pub title: String,

    /// Lines of the current chunk
    pub lines: Vec<RequestLine>,

    /// Source language code
    pub source_language: String,

    /// Target language code
    pub target_language: String,

    /// Extra context document (e.g. previous episode output)
    pub context_document: Option<String>,

    /// Free-form user instructions
    pub custom_instructions: Option<String>,

    /// Validated few-shot example pairs
    pub few_shot_examples: Vec<FewShotExample>,

    /// Rolling context window from previous chunks
    pub context_window: Vec<ContextTurn>,

    /// Model name
    pub model_name: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum output tokens
    pub max_output_tokens: u32,

    /// Whether structured (JSON) output is requested
    pub structured_output: bool,
}

impl GenerationRequest {
    /// Build a request from a job config, chunk lines, and context window
    pub fn from_config(
        config: &JobConfig,
        lines: Vec<RequestLine>,
        context_window: Vec<ContextTurn>,
    ) -> Self {
        Self {
            title: config.title.clone(),
            lines,
            source_language: config.source_language.clone(),
            target_language: config.target_language.clone(),
            context_document: config.context_document.clone(),
            custom_instructions: config.custom_instructions.clone(),
            few_shot_examples: config.few_shot_examples.clone(),
            context_window,
            model_name: config.model.model_name.clone(),
            temperature: config.model.temperature,
            max_output_tokens: config.model.max_output_tokens,
            structured_output: config.model.structured_output,
        }
    }
}

/// Raw response from a provider
#[derive(Debug, Clone)]
pub struct GenerationResponse {
    /// Complete raw text of the response
    pub text: String,
}

/// Common trait for all generation providers
///
/// Implementations stream partial output through `on_partial` as it arrives;
/// the same text must also appear in the returned response. On failure the
/// engine salvages whatever was streamed before the error.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Execute a generation request
    async fn generate(
        &self,
        request: GenerationRequest,
        on_partial: PartialSink<'_>,
    ) -> Result<GenerationResponse, ProviderError>;
}

pub mod mock;
