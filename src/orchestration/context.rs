/*!
 * Rolling context window construction.
 *
 * Before each chunk the window is rebuilt from already-translated lines as a
 * single source/generated pair. The strategy decides how far back the pair
 * reaches; for every strategy except `Full` the window collapses to the lines
 * of the immediately preceding chunk (or less), which bounds token growth
 * irrespective of job length.
 */

use serde::{Deserialize, Serialize};

use crate::job_config::{ContextStrategy, MINIMAL_CONTEXT_LINES};
use crate::line_sequence::LineSequence;

/// Role of a context turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// Source-language content previously submitted
    Source,
    /// Generated translation previously received
    Generated,
}

/// One turn of the rolling context window
///
/// A window always holds zero or an even number of turns, paired
/// source/generated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextTurn {
    /// Turn role
    pub role: TurnRole,

    /// Newline-joined line content
    pub content: String,
}

/// Build the context window for a chunk starting at `chunk_start`
///
/// `job_start` is the first index the job processed; under `Full` the window
/// reaches back to it. Lines without a translation yet (or with empty source)
/// are skipped, so the pair reflects only completed work.
pub fn build_window(
    sequence: &LineSequence,
    job_start: usize,
    chunk_start: usize,
    strategy: ContextStrategy,
    chunk_size: usize,
) -> Vec<ContextTurn> {
    if chunk_start <= job_start {
        return Vec::new();
    }

    let window_lines = match strategy {
        ContextStrategy::Full => chunk_start - job_start,
        ContextStrategy::Caching => chunk_size.max(1),
        ContextStrategy::Minimal => MINIMAL_CONTEXT_LINES,
    };
    let lo = chunk_start.saturating_sub(window_lines).max(job_start);

    let mut sources = Vec::new();
    let mut generated = Vec::new();
    for index in lo..chunk_start {
        let Some(entry) = sequence.get(index) else { continue };
        if entry.translated_text.is_empty() || entry.source_text.trim().is_empty() {
            continue;
        }
        sources.push(render_line(index, entry.speaker.as_deref(), &entry.source_text));
        generated.push(render_line(index, entry.speaker.as_deref(), &entry.translated_text));
    }

    if sources.is_empty() {
        return Vec::new();
    }

    vec![
        ContextTurn {
            role: TurnRole::Source,
            content: sources.join("\n"),
        },
        ContextTurn {
            role: TurnRole::Generated,
            content: generated.join("\n"),
        },
    ]
}

fn render_line(index: usize, speaker: Option<&str>, text: &str) -> String {
    match speaker {
        Some(speaker) => format!("{}. {}: {}", index, speaker, text),
        None => format!("{}. {}", index, text),
    }
}
