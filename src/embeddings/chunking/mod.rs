
use std::sync::LazyLock;

use fancy_regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

static SENTENCE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?<=[\.\?\!])\s+").expect("sentence pattern is valid"));

/// A window of words ready for embedding or string comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChunk {
    /// Words of the window joined by single spaces
    pub content: String,
    /// Position of this chunk within the document
    pub chunk_index: usize,
    /// Index of the first word of the window
    pub start_word: usize,
    pub word_count: usize,
}

/// Configuration for segmenting document text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Words per overlapping chunk
    pub window_words: usize,
    /// Words shared by adjacent chunks
    pub overlap_words: usize,
    /// Sentences shorter than this many characters are discarded
    pub min_sentence_chars: usize,
    /// Characters of a document embedded for novelty retrieval and indexing
    pub excerpt_chars: usize,
    /// Pages read from a PDF when building an excerpt
    pub excerpt_pages: usize,
    /// Characters of a document considered for overlap and factual checks
    pub max_document_chars: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            window_words: 300,
            overlap_words: 50,
            min_sentence_chars: 30,
            excerpt_chars: 2000,
            excerpt_pages: 5,
            max_document_chars: 20_000,
        }
    }
}

impl ChunkingConfig {
    /// Distance in words between the starts of adjacent chunks
    #[inline]
    pub fn stride(&self) -> usize {
        self.window_words.saturating_sub(self.overlap_words).max(1)
    }
}

/// Split text into overlapping fixed-size word windows.
///
/// A window starts every `stride` words, so the tail of the document may be
/// repeated in a short final window.
#[inline]
pub fn chunk_words(text: &str, config: &ChunkingConfig) -> Vec<ContentChunk> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let window = config.window_words.max(1);

    let chunks: Vec<ContentChunk> = (0..words.len())
        .step_by(config.stride())
        .enumerate()
        .map(|(chunk_index, start)| {
            let end = (start + window).min(words.len());
            ContentChunk {
                content: words[start..end].join(" "),
                chunk_index,
                start_word: start,
                word_count: end - start,
            }
        })
        .collect();

    debug!(
        "Chunked {} words into {} chunks (window {}, stride {})",
        words.len(),
        chunks.len(),
        window,
        config.stride()
    );

    chunks
}

/// Collapse every whitespace run to a single space and trim the ends
#[inline]
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split text into sentences at terminal punctuation followed by whitespace,
/// dropping sentences shorter than `min_chars` characters.
#[inline]
pub fn split_into_sentences(text: &str, min_chars: usize) -> Vec<String> {
    let normalized = normalize_whitespace(text);
    let mut sentences = Vec::new();
    let mut last = 0;

    for boundary in SENTENCE_BOUNDARY.find_iter(&normalized) {
        match boundary {
            Ok(m) => {
                sentences.push(&normalized[last..m.start()]);
                last = m.end();
            }
            Err(e) => {
                warn!("Sentence boundary search aborted: {}", e);
                break;
            }
        }
    }
    sentences.push(&normalized[last..]);

    sentences
        .into_iter()
        .map(str::trim)
        .filter(|s| s.chars().count() >= min_chars)
        .map(str::to_string)
        .collect()
}

/// Longest prefix of `text` holding at most `max_chars` characters
#[inline]
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
