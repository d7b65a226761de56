//! Boundary-aware markdown chunking.
//!
//! [`smart_chunk_markdown`] splits raw markdown into ordered, size-bounded
//! chunks while trying hard not to cut through code blocks, paragraphs, or
//! sentences. [`extract_section_info`] derives per-chunk section metadata
//! (headers, character and word counts) for storage alongside embeddings.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Default target chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 5000;

/// A split candidate must sit past this fraction of the target size,
/// otherwise we would emit pathologically tiny chunks.
const MIN_SPLIT_FRACTION: f64 = 0.3;

static HEADER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#+\s+.+$").expect("header pattern is valid"));

/// Splits markdown into chunks of roughly `chunk_size` bytes.
///
/// Each iteration consumes a prefix of the remaining text. If the remainder
/// fits in `chunk_size` it is emitted whole. Otherwise the window
/// `[0, chunk_size)` is scanned for split candidates in priority order:
///
/// 1. the last balanced code-fence boundary, either just before an opening
///    fence or just after a closing one, so no chunk is left holding an open
///    fence when avoidable;
/// 2. the last blank-line (paragraph) boundary;
/// 3. the last `". "` sentence terminator.
///
/// The first candidate lying past [`MIN_SPLIT_FRACTION`] of the window wins;
/// with no viable candidate the text is split exactly at the window edge.
/// Emitted chunks are trimmed and never empty, and concatenating them
/// reproduces the input up to boundary whitespace.
pub fn smart_chunk_markdown(text: &str, chunk_size: usize) -> Vec<String> {
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < text.len() {
        let remaining = &text[start..];
        if remaining.len() <= chunk_size {
            push_trimmed(&mut chunks, remaining);
            break;
        }

        // Round the window edge up to the next char boundary so multi-byte
        // characters are never split. Overshoot is at most three bytes.
        let mut window_end = chunk_size;
        while window_end < remaining.len() && !remaining.is_char_boundary(window_end) {
            window_end += 1;
        }
        let window = &remaining[..window_end];
        let threshold = (chunk_size as f64 * MIN_SPLIT_FRACTION) as usize;

        let split = fence_split(window, threshold)
            .or_else(|| paragraph_split(window, threshold))
            .or_else(|| sentence_split(window, threshold))
            .unwrap_or(window_end);

        push_trimmed(&mut chunks, &remaining[..split]);
        start += split;
    }

    chunks
}

/// Last position where a split leaves both sides with balanced fences.
///
/// Candidates are the start of each opening fence (the block it opens moves
/// wholly into the next chunk) and the end of each closing fence (the block
/// stays wholly behind the cut).
fn fence_split(window: &str, threshold: usize) -> Option<usize> {
    let mut best = None;
    for (count, (pos, marker)) in window.match_indices("```").enumerate() {
        let candidate = if count % 2 == 0 {
            pos
        } else {
            pos + marker.len()
        };
        if candidate > threshold {
            best = Some(candidate);
        }
    }
    best
}

/// Last blank-line boundary in the window.
fn paragraph_split(window: &str, threshold: usize) -> Option<usize> {
    window.rfind("\n\n").filter(|pos| *pos > threshold)
}

/// Last sentence terminator in the window; the period stays with the chunk.
fn sentence_split(window: &str, threshold: usize) -> Option<usize> {
    window
        .rfind(". ")
        .filter(|pos| *pos > threshold)
        .map(|pos| pos + 1)
}

fn push_trimmed(chunks: &mut Vec<String>, piece: &str) {
    let trimmed = piece.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// Section metadata derived from a single chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionInfo {
    /// Every markdown header line in the chunk, in order of appearance.
    pub headers: Vec<String>,
    /// Character (not byte) count of the chunk.
    pub char_count: usize,
    /// Whitespace-delimited token count.
    pub word_count: usize,
}

/// Extracts header and size statistics from a chunk.
pub fn extract_section_info(chunk: &str) -> SectionInfo {
    let headers = HEADER_PATTERN
        .find_iter(chunk)
        .map(|m| m.as_str().trim_end().to_string())
        .collect();

    SectionInfo {
        headers,
        char_count: chunk.chars().count(),
        word_count: chunk.split_whitespace().count(),
    }
}
