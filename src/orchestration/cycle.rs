/*!
 * The per-chunk call/parse cycle.
 *
 * One submission = one provider call. Partial raw text is streamed to the
 * caller's sink while a private buffer accumulates it for salvage. Expected
 * failure paths come back as values, never as errors: a transport failure
 * that salvages becomes `Recovered`, one that does not becomes `Fatal`.
 */

use log::{debug, warn};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::providers::{GenerationRequest, Provider};

use super::parse::{self, ParsedEntry};

/// Entries parsed from one chunk, with the raw text they came from
#[derive(Debug, Clone)]
pub struct ChunkResult {
    /// Parsed per-line results
    pub entries: Vec<ParsedEntry>,

    /// Raw provider output the entries were parsed from
    pub raw: String,
}

/// Outcome of one chunk submission
#[derive(Debug, Clone)]
pub enum ChunkOutcome {
    /// The response was well-formed and parsed directly
    Complete(ChunkResult),

    /// The call failed but a valid prefix was salvaged from the partial buffer
    Recovered(ChunkResult),

    /// Nothing could be recovered; the job must transition to error
    Fatal {
        /// The raw buffer as far as it got
        raw: String,
    },
}

/// Executes provider calls for one job, strictly one at a time
#[derive(Clone)]
pub struct CallCycle {
    provider: Arc<dyn Provider>,
}

impl CallCycle {
    /// Create a cycle over the given provider
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    /// Submit one chunk request and classify the outcome
    ///
    /// `on_partial` receives raw text as it streams in.
    pub async fn submit(
        &self,
        request: GenerationRequest,
        on_partial: &(dyn Fn(&str) + Send + Sync),
    ) -> ChunkOutcome {
        let buffer = Arc::new(Mutex::new(String::new()));

        let buffer_tap = buffer.clone();
        let tap = move |piece: &str| {
            buffer_tap.lock().push_str(piece);
            on_partial(piece);
        };

        match self.provider.generate(request, &tap).await {
            Ok(response) => match parse::parse_entries(&response.text) {
                Ok(entries) => {
                    debug!("Chunk parsed cleanly: {} entries", entries.len());
                    ChunkOutcome::Complete(ChunkResult {
                        entries,
                        raw: response.text,
                    })
                }
                Err(e) => {
                    warn!("Malformed complete response ({}), attempting salvage", e);
                    Self::salvage(response.text)
                }
            },
            Err(e) => {
                let raw = buffer.lock().clone();
                warn!(
                    "Provider call failed ({}), salvaging {} buffered bytes",
                    e,
                    raw.len()
                );
                Self::salvage(raw)
            }
        }
    }

    fn salvage(raw: String) -> ChunkOutcome {
        match parse::salvage_entries(&raw) {
            Some(entries) => {
                debug!("Salvage recovered {} entries", entries.len());
                ChunkOutcome::Recovered(ChunkResult { entries, raw })
            }
            None => ChunkOutcome::Fatal { raw },
        }
    }
}
