//! Fixed-size overlapping text chunker.
//!
//! Splits document text into passages sized for the embedding model. All
//! whitespace runs are collapsed to single spaces before windowing, so the
//! original layout (newlines, indentation) is not preserved. Each window is
//! at most `max_chars` characters and starts `overlap` characters before the
//! end of the previous one.
//!
//! Windowing is by Unicode scalar values, so multi-byte text (Korean, CJK)
//! never splits mid-character.

/// Split text into overlapping character windows.
///
/// Returns an empty vector for empty or whitespace-only input. Consecutive
/// chunks share exactly `overlap` characters, except possibly the final chunk
/// which covers whatever remains. `overlap` is clamped below `max_chars` so
/// the window always advances.
pub fn chunk_text(text: &str, max_chars: usize, overlap: usize) -> Vec<String> {
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() || max_chars == 0 {
        return Vec::new();
    }
    let overlap = overlap.min(max_chars - 1);

    let chars: Vec<char> = cleaned.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + max_chars).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end >= chars.len() {
            break;
        }
        start = end - overlap;
    }
    chunks
}
