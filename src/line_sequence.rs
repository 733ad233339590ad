/*!
 * Line sequence model: the ordered collection of translatable entries.
 *
 * A `LineSequence` is the master document a job operates on. Entries carry a
 * stable 1-based index that is never reassigned; translated text is written
 * only by the merge engine or by explicit user edits upstream.
 */

use serde::{Deserialize, Serialize};

/// Document format the sequence was loaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SequenceFormat {
    #[default]
    Srt,
    Ass,
    Vtt,
}

/// A single translatable line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineEntry {
    /// 1-based index, stable for the lifetime of the sequence
    pub index: usize,

    /// Optional speaker label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,

    /// Original text
    pub source_text: String,

    /// Translated text, empty until successfully merged
    #[serde(default)]
    pub translated_text: String,
}

impl LineEntry {
    /// Create a new untranslated entry
    pub fn new(index: usize, source_text: impl Into<String>) -> Self {
        Self {
            index,
            speaker: None,
            source_text: source_text.into(),
            translated_text: String::new(),
        }
    }

    /// Create a new untranslated entry with a speaker label
    pub fn with_speaker(index: usize, speaker: impl Into<String>, source_text: impl Into<String>) -> Self {
        Self {
            index,
            speaker: Some(speaker.into()),
            source_text: source_text.into(),
            translated_text: String::new(),
        }
    }

    /// Whether this entry still needs translation
    pub fn needs_translation(&self) -> bool {
        self.translated_text.is_empty() && !self.source_text.trim().is_empty()
    }
}

/// An ordered, append-only sequence of line entries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSequence {
    /// Document format
    pub format: SequenceFormat,

    /// Entries in positional order; `entries[i].index == i + 1`
    pub entries: Vec<LineEntry>,
}

impl LineSequence {
    /// Build a sequence from raw source lines, assigning 1-based indices
    pub fn from_source_lines<I, S>(format: SequenceFormat, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries = lines
            .into_iter()
            .enumerate()
            .map(|(i, text)| LineEntry::new(i + 1, text))
            .collect();

        Self { format, entries }
    }

    /// Number of entries in the sequence
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the sequence has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the entry at a 1-based index
    pub fn get(&self, index: usize) -> Option<&LineEntry> {
        if index == 0 {
            return None;
        }
        self.entries.get(index - 1)
    }

    /// Get a mutable reference to the entry at a 1-based index
    pub fn get_mut(&mut self, index: usize) -> Option<&mut LineEntry> {
        if index == 0 {
            return None;
        }
        self.entries.get_mut(index - 1)
    }

    /// Number of entries with a non-empty translation
    pub fn translated_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| !e.translated_text.is_empty())
            .count()
    }

    /// Number of entries still awaiting translation
    ///
    /// Lines with empty source are already satisfied and not counted.
    pub fn remaining_count(&self) -> usize {
        self.entries.iter().filter(|e| e.needs_translation()).count()
    }

    /// Whether every translatable entry has a translation
    pub fn is_fully_translated(&self) -> bool {
        self.remaining_count() == 0
    }
}
