//! Fixed-size overlapping chunker for corpus text.

use serde::{Deserialize, Serialize};

/// A text chunk with source information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextChunk {
    pub text: String,
    /// Source identifier (file path, CLI input, etc.).
    pub source: String,
    /// Character offset in the original document.
    pub start_offset: usize,
    /// Chunk index within the source.
    pub chunk_index: usize,
}

/// Split text into chunks of at most `chunk_size` characters, each sharing
/// `overlap` characters with its predecessor. Prefers to cut at a sentence
/// boundary near the window end when one exists.
pub fn split_into_chunks(
    text: &str,
    source: &str,
    chunk_size: usize,
    overlap: usize,
) -> Vec<TextChunk> {
    let mut chunks = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let total_chars = chars.len();

    if total_chars == 0 || chunk_size == 0 {
        return chunks;
    }

    let mut start = 0;
    let mut chunk_index = 0;

    loop {
        let end = (start + chunk_size).min(total_chars);
        let window: String = chars[start..end].iter().collect();

        if end == total_chars {
            let trimmed = window.trim();
            if !trimmed.is_empty() {
                chunks.push(TextChunk {
                    text: trimmed.to_string(),
                    source: source.to_string(),
                    start_offset: start,
                    chunk_index,
                });
            }
            break;
        }

        let cut = cut_at_sentence_boundary(&window);
        let emitted_chars = cut.chars().count();

        let trimmed = cut.trim();
        if !trimmed.is_empty() {
            chunks.push(TextChunk {
                text: trimmed.to_string(),
                source: source.to_string(),
                start_offset: start,
                chunk_index,
            });
            chunk_index += 1;
        }

        // The next window must begin `overlap` characters before the end of
        // what was actually emitted, so a sentence cut never skips text.
        start += emitted_chars.saturating_sub(overlap).max(1);
    }

    chunks
}

/// Cut the window at a sentence ending in its last 20%, if one exists.
fn cut_at_sentence_boundary(text: &str) -> String {
    let sentence_endings = [". ", "! ", "? ", ".\n", "!\n", "?\n"];

    let char_count = text.chars().count();
    let search_start_chars = (char_count * 80) / 100;
    let search_start = text
        .char_indices()
        .nth(search_start_chars)
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    let search_text = &text[search_start..];

    for ending in sentence_endings.iter() {
        if let Some(pos) = search_text.rfind(ending) {
            let cut_pos = search_start + pos + ending.len();
            return text[..cut_pos].to_string();
        }
    }

    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(split_into_chunks("", "src", 100, 20).is_empty());
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = split_into_chunks("Just one sentence.", "src", 500, 50);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Just one sentence.");
        assert_eq!(chunks[0].chunk_index, 0);
    }

    #[test]
    fn long_text_produces_overlapping_windows() {
        let text = "This is a test sentence. ".repeat(40);
        let chunks = split_into_chunks(&text, "src", 100, 20);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 100);
        }
        // Consecutive windows advance by chunk_size - overlap characters.
        assert_eq!(chunks[1].start_offset - chunks[0].start_offset, 80);
    }

    #[test]
    fn prefers_sentence_boundary_near_window_end() {
        let text = format!("{}. {}", "a".repeat(95), "b".repeat(200));
        let chunks = split_into_chunks(&text, "src", 100, 0);
        assert!(chunks[0].text.ends_with('.'));
    }

    #[test]
    fn sentence_cut_never_drops_text() {
        // A cut before the window end must not skip the characters between
        // the cut and the next window.
        let text = format!("{}. MARKER {}", "a".repeat(83), "b".repeat(200));
        let chunks = split_into_chunks(&text, "src", 100, 10);

        let joined: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert!(joined.contains("MARKER"));
    }

    #[test]
    fn every_character_lands_in_some_chunk() {
        // Unique markers sprinkled through sentence-heavy text must all
        // survive chunking, whatever boundary cuts happen.
        let mut text = String::new();
        for i in 0..40 {
            text.push_str(&format!("Sentence number {} ends here. TOK{} follows. ", i, i));
        }
        let chunks = split_into_chunks(&text, "src", 100, 20);

        let joined: String = chunks.iter().map(|c| c.text.as_str()).collect();
        for i in 0..40 {
            assert!(joined.contains(&format!("TOK{}", i)), "TOK{} was dropped", i);
        }
    }

    #[test]
    fn multibyte_text_does_not_panic() {
        let text = "日本語のテキストです。".repeat(30);
        let chunks = split_into_chunks(&text, "src", 50, 10);
        assert!(!chunks.is_empty());
    }
}
