//! Text splitting helpers for narration.
//!
//! Narration is synthesized one chunk at a time. A chunk is a run of whole
//! sentences joined back together, kept under a character budget so each
//! utterance stays short enough for the platform synthesizer.

/// Default character budget per chunk.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 150;
/// Separator used when sentences are glued back into a chunk.
pub const SENTENCE_JOINER: &str = ". ";

const JOINER_LEN: usize = SENTENCE_JOINER.len();

/// Lightweight sentence splitter. Runs of `.`, `!` and `?` end a sentence;
/// the terminators themselves are dropped and blank fragments discarded.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        if matches!(ch, '.' | '!' | '?') {
            push_fragment(&mut sentences, &current);
            current.clear();
        } else {
            current.push(ch);
        }
    }
    push_fragment(&mut sentences, &current);

    sentences
}

fn push_fragment(sentences: &mut Vec<String>, fragment: &str) {
    let trimmed = fragment.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
}

/// Split `text` into ordered chunks of at most `max_chars` characters.
///
/// Sentences are accumulated greedily; a sentence longer than the budget on
/// its own becomes its own chunk and is not cut. Text without any sentence
/// fragment (only terminators) is returned whole as one chunk, and blank
/// text yields no chunks.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let fragments = split_sentences(text);
    if fragments.is_empty() {
        let whole = text.trim();
        if whole.is_empty() {
            return Vec::new();
        }
        return vec![whole.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for fragment in fragments {
        let fragment_len = fragment.chars().count();
        let separator_len = if current.is_empty() { 0 } else { JOINER_LEN };

        if !current.is_empty() && current_len + separator_len + fragment_len > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if current.is_empty() {
            current.push_str(&fragment);
            current_len = fragment_len;
        } else {
            current.push_str(SENTENCE_JOINER);
            current.push_str(&fragment);
            current_len += JOINER_LEN + fragment_len;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
