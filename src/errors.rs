/*!
 * Error types for the sublate engine.
 *
 * This module contains custom error types for different parts of the engine,
 * using the thiserror crate for ergonomic error definitions.
 */

// Allow dead code - error types are for library consumers
#![allow(dead_code)]

use thiserror::Error;

/// Errors that can occur when calling a generation provider
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making the generation request fails
    #[error("Generation request failed: {0}")]
    RequestFailed(String),

    /// Error when the response stream is interrupted mid-flight
    #[error("Response stream interrupted: {0}")]
    StreamInterrupted(String),

    /// Error returned by the provider itself
    #[error("Provider responded with error: {status_code} - {message}")]
    ApiError {
        /// Status code reported by the provider
        status_code: u16,
        /// Error message from the provider
        message: String,
    },

    /// Error when the request exceeds the provider deadline
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),
}

/// Errors raised before a job is allowed to start
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The sequence has no entries to translate
    #[error("Sequence '{0}' is empty, nothing to translate")]
    EmptySequence(String),

    /// No sequence registered under the given id
    #[error("Unknown sequence: {0}")]
    UnknownSequence(String),

    /// A few-shot example is malformed
    #[error("Few-shot example {position} is invalid: {reason}")]
    InvalidFewShotExample {
        /// 1-based position of the offending example
        position: usize,
        /// What is wrong with it
        reason: String,
    },

    /// A required language field is missing
    #[error("Missing language: {0}")]
    MissingLanguage(String),

    /// An explicit range override is out of bounds or inverted
    #[error("Invalid range override [{start}, {end}] for sequence of length {len}")]
    InvalidRange {
        start: usize,
        end: usize,
        len: usize,
    },
}

/// Errors that can occur while a job is running or being managed
#[derive(Error, Debug)]
pub enum JobError {
    /// The job failed validation before starting
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The job id is not registered with the engine
    #[error("Unknown job: {0}")]
    UnknownJob(String),

    /// The job is already running; jobs are single-flight
    #[error("Job '{0}' is already running")]
    AlreadyRunning(String),
}

/// Top-level engine error wrapping all other errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from job validation or management
    #[error("Job error: {0}")]
    Job(#[from] JobError),

    /// The batch id is not registered with the engine
    #[error("Unknown batch: {0}")]
    UnknownBatch(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<ValidationError> for EngineError {
    fn from(error: ValidationError) -> Self {
        Self::Job(JobError::Validation(error))
    }
}

impl From<anyhow::Error> for EngineError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}
