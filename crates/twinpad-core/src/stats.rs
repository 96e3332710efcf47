//! Document summary counts.

use crate::document::Document;
use rayon::prelude::*;
use unicode_segmentation::UnicodeSegmentation;

/// Bytes per work item of the parallel character count.
const CHUNK_SIZE: usize = 256 * 1024;

/// Counts shown by the summary command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DocumentSummary {
    /// Length in bytes.
    pub bytes: usize,
    /// Unicode scalar values.
    pub chars: usize,
    /// Characters that are not whitespace.
    pub chars_without_blanks: usize,
    /// Words, by Unicode word boundaries.
    pub words: usize,
    /// Lines.
    pub lines: usize,
}

fn count_scalars(bytes: &[u8]) -> usize {
    bytes.iter().filter(|b| (**b & 0xC0) != 0x80).count()
}

/// Number of characters in `text`.
///
/// Texts of at least `threshold` bytes are split into contiguous chunks counted in parallel.
/// Continuation bytes never start a character, so chunk boundaries need no alignment.
pub fn char_count(text: &str, threshold: usize) -> usize {
    let bytes = text.as_bytes();
    if bytes.len() < threshold {
        return count_scalars(bytes);
    }
    bytes.par_chunks(CHUNK_SIZE).map(count_scalars).sum()
}

/// Summarize `doc`.
pub fn summarize(doc: &Document, parallel_threshold: usize) -> DocumentSummary {
    let text = doc.text();
    DocumentSummary {
        bytes: text.len(),
        chars: char_count(&text, parallel_threshold),
        chars_without_blanks: text.chars().filter(|c| !c.is_whitespace()).count(),
        words: text.unicode_words().count(),
        lines: doc.line_count(),
    }
}
