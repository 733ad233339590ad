/*!
 * Gap analysis for resuming partially translated sequences.
 *
 * A gap is a maximal run of lines that still need translation. Nearby gaps
 * are coalesced before resubmission: re-translating a few already-done lines
 * is cheaper than issuing many small requests.
 */

use crate::line_sequence::LineSequence;

/// A contiguous run of untranslated lines, 1-based inclusive bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gap {
    /// First untranslated index
    pub start: usize,

    /// Last untranslated index
    pub end: usize,
}

impl Gap {
    /// Number of lines in the gap
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Gaps are never empty by construction
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Find maximal runs of lines with source text but no translation
///
/// Lines with empty source are treated as already satisfied; they neither
/// open a gap nor split one. A gap may contain them in its interior, but its
/// bounds are always lines that need translation, so continuation never
/// resubmits an empty-source edge.
pub fn find_gaps(sequence: &LineSequence) -> Vec<Gap> {
    let mut gaps = Vec::new();
    let mut open: Option<Gap> = None;

    for entry in &sequence.entries {
        if entry.needs_translation() {
            match &mut open {
                Some(gap) => gap.end = entry.index,
                None => {
                    open = Some(Gap {
                        start: entry.index,
                        end: entry.index,
                    });
                }
            }
        } else if !entry.source_text.trim().is_empty() {
            // A translated line closes any open gap; empty-source lines do not
            if let Some(gap) = open.take() {
                gaps.push(gap);
            }
        }
    }

    if let Some(gap) = open {
        gaps.push(gap);
    }

    gaps
}

/// Coalesce gaps whose distance is within the tolerance
///
/// The distance between `[a, b]` and `[c, d]` (with `c > b`) is `c - b`;
/// merging trades a few redundant re-translations for fewer, larger requests.
pub fn merge_nearby_gaps(gaps: &[Gap], tolerance: usize) -> Vec<Gap> {
    let mut merged: Vec<Gap> = Vec::with_capacity(gaps.len());

    for &gap in gaps {
        match merged.last_mut() {
            Some(last) if gap.start - last.end <= tolerance => {
                last.end = gap.end;
            }
            _ => merged.push(gap),
        }
    }

    merged
}
