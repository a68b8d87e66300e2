//! Window loop for [`split`].

use super::types::{ChunkConfig, ChunkError};

/// Split `text` into trimmed, non-empty chunks of at most `chunk_size` characters,
/// repeating `overlap` characters between consecutive chunks.
///
/// Text no longer than `chunk_size` comes back as a single, untrimmed chunk,
/// even when blank; callers reject blank documents. Whitespace-only windows are dropped, so the result can be shorter than the
/// window count.
pub fn split(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<&str>, ChunkError> {
    ChunkConfig::new(chunk_size, overlap).validate()?;

    // Byte offset of every char, plus the end of the text, so windows can be
    // counted in chars and sliced without copying.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let len = bounds.len() - 1;

    if len <= chunk_size {
        return Ok(vec![text]);
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < len {
        let mut end = (start + chunk_size).min(len);

        if end < len {
            if let Some(boundary) = last_boundary(&text[bounds[start]..bounds[end]], end) {
                // Only snap when the boundary sits in the back half of the window.
                if boundary > start + chunk_size / 2 {
                    end = boundary + 1;
                }
            }
        }

        let piece = text[bounds[start]..bounds[end]].trim();
        if !piece.is_empty() {
            chunks.push(piece);
        }

        start = if end < len {
            next_start(start, end, overlap)
        } else {
            end
        };
    }

    Ok(chunks)
}

impl ChunkConfig {
    pub fn split<'a>(&self, text: &'a str) -> Result<Vec<&'a str>, ChunkError> {
        split(text, self.chunk_size, self.overlap)
    }
}

/// Char index of the last `.` or `\n` in `window`, which ends at char index `end`.
fn last_boundary(window: &str, end: usize) -> Option<usize> {
    window
        .chars()
        .rev()
        .position(|c| c == '.' || c == '\n')
        .map(|from_end| end - 1 - from_end)
}

/// Step back by `overlap` from `end`; a snapped window can be shorter than the
/// overlap, in which case the next window starts at `end` so the loop advances.
fn next_start(start: usize, end: usize, overlap: usize) -> usize {
    end.checked_sub(overlap)
        .filter(|&next| next > start)
        .unwrap_or(end)
}
