/*!
 * Chunk planning: computing the next contiguous sub-range to submit.
 *
 * All bounds here are 1-based and inclusive, matching the stable indices of
 * the line sequence. Planning is a pure function of the requested range and
 * the clamped chunk size; the job loop advances by feeding back the last
 * processed index.
 */

use crate::job_config::{MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};

/// A contiguous sub-range of the sequence, 1-based inclusive bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan {
    /// First index of the chunk
    pub start: usize,

    /// Last index of the chunk
    pub end: usize,
}

impl ChunkSpan {
    /// Number of lines covered by the span
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Spans are never empty by construction
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Clamp a requested chunk size to the legal interval, never zero
pub fn clamp_chunk_size(size: usize) -> usize {
    size.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE)
}

/// Plan the first chunk of the range `[start, end]`
///
/// Returns `None` when `start > end` (an empty range is a no-op, not an
/// error) or when `start` is zero.
pub fn first_chunk(start: usize, end: usize, chunk_size: usize) -> Option<ChunkSpan> {
    if start == 0 || start > end {
        return None;
    }
    let size = clamp_chunk_size(chunk_size);
    Some(ChunkSpan {
        start,
        end: (start + size - 1).min(end),
    })
}

/// Plan the chunk following the last processed index
///
/// Returns `None` once the range is exhausted, which terminates planning
/// successfully.
pub fn next_chunk(last_processed: usize, end: usize, chunk_size: usize) -> Option<ChunkSpan> {
    first_chunk(last_processed + 1, end, chunk_size)
}
