//! Recursive boundary-aware text chunking

use std::collections::VecDeque;

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::{Chunk, Document};

/// Paragraph, line, sentence, word, then a hard character cut
pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

/// Splits text into chunks of at most `chunk_size` characters, carrying up to
/// `chunk_overlap` trailing characters of each chunk into the next one.
///
/// The coarsest separator present in the text is tried first; any piece still
/// too long is split again with the next finer separator. Separators stay
/// attached to the start of the piece that follows them.
#[derive(Debug, Clone)]
pub struct RecursiveTextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveTextSplitter {
    /// Create a splitter with the default separators
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Config("chunk_size must be positive".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Create from chunking configuration
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Replace the separator list (coarsest first)
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators.into_iter().map(Into::into).collect();
        self
    }

    /// Maximum chunk length in characters
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Split every document, preserving document order then chunk order
    pub fn split_documents(&self, docs: &[Document]) -> Vec<Chunk> {
        docs.iter()
            .flat_map(|doc| {
                self.split_text(&doc.page_content)
                    .into_iter()
                    .enumerate()
                    .map(|(index, content)| Chunk::new(content, doc.metadata.clone(), index as u32))
            })
            .collect()
    }

    /// Split a single text
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut chunks = Vec::new();

        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut finer: &[String] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate;
                finer = &separators[i + 1..];
                break;
            }
        }

        let mut pending: Vec<&str> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }

            if !pending.is_empty() {
                chunks.extend(self.merge_splits(&pending));
                pending.clear();
            }
            if finer.is_empty() {
                let piece = piece.trim();
                if !piece.is_empty() {
                    chunks.push(piece.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }

        if !pending.is_empty() {
            chunks.extend(self.merge_splits(&pending));
        }

        chunks
    }

    /// Greedily pack small pieces into chunks, keeping a tail of at most
    /// `chunk_overlap` characters as the head of the next chunk
    fn merge_splits(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size && !window.is_empty() {
                if let Some(chunk) = join_trimmed(&window) {
                    chunks.push(chunk);
                }
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some(first) => total -= char_len(first),
                        None => break,
                    }
                }
            }

            window.push_back(piece);
            total += len;
        }

        if let Some(chunk) = join_trimmed(&window) {
            chunks.push(chunk);
        }

        chunks
    }
}

impl Default for RecursiveTextSplitter {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 20,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn join_trimmed(window: &VecDeque<&str>) -> Option<String> {
    let joined: String = window.iter().copied().collect();
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Split on `separator`, keeping it at the start of the following piece.
/// An empty separator splits into single characters.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (index, _) in text.match_indices(separator) {
        if index > start {
            pieces.push(&text[start..index]);
        }
        start = index;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Metadata;

    fn words(count: usize) -> String {
        (0..count)
            .map(|i| format!("word{:04}", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_size() {
        assert!(RecursiveTextSplitter::new(100, 100).is_err());
        assert!(RecursiveTextSplitter::new(0, 0).is_err());
        assert!(RecursiveTextSplitter::new(500, 20).is_ok());
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let splitter = RecursiveTextSplitter::default();
        let texts = [
            "Aspirin is used to reduce pain.".to_string(),
            "a".repeat(500),
            format!("First paragraph.\n\nSecond paragraph. {}", "x".repeat(400)),
        ];
        for text in texts {
            assert!(text.chars().count() <= 500);
            assert_eq!(splitter.split_text(&text), vec![text.clone()]);
        }
    }

    #[test]
    fn test_long_text_respects_size_and_overlap() {
        let splitter = RecursiveTextSplitter::default();
        let text = words(300);
        let chunks = splitter.split_text(&text);

        assert!(chunks.len() > 1);
        let mut cursor = 0;
        let mut previous_end: Option<usize> = None;
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 500);
            let start = cursor + text[cursor..].find(chunk.as_str()).expect("chunk comes from text");
            if let Some(end) = previous_end {
                // the next chunk starts at most 20 characters before the previous one ended
                assert!(start + 20 >= end, "overlap larger than 20");
                assert!(start <= end + 1, "gap between chunks");
                assert!(start < end, "word splits should overlap");
            }
            previous_end = Some(start + chunk.len());
            cursor = start;
        }
        assert!(chunks.last().unwrap().ends_with("word0299"));
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let splitter = RecursiveTextSplitter::new(50, 0).unwrap();
        let text = format!("{}\n\n{}", "a".repeat(40), "b".repeat(40));
        let chunks = splitter.split_text(&text);
        assert_eq!(chunks, vec!["a".repeat(40), "b".repeat(40)]);
    }

    #[test]
    fn test_sentence_boundary_before_words() {
        let splitter = RecursiveTextSplitter::new(40, 0).unwrap();
        let text = "The first sentence is here. The second sentence is here.";
        let chunks = splitter.split_text(text);
        // the separator travels with the following piece
        assert_eq!(chunks, vec!["The first sentence is here", ". The second sentence is here."]);
    }

    #[test]
    fn test_hard_cut_without_separators() {
        let splitter = RecursiveTextSplitter::new(10, 2).unwrap();
        let text = "abcdefghijklmnopqrstuvwxyz";
        let chunks = splitter.split_text(text);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks[0], "abcdefghij");
        assert_eq!(chunks[1], "ijklmnopqr");
    }

    #[test]
    fn test_multibyte_characters_counted_as_chars() {
        let splitter = RecursiveTextSplitter::new(5, 0).unwrap();
        let chunks = splitter.split_text("ééééééé");
        assert_eq!(chunks, vec!["ééééé", "éé"]);
    }

    #[test]
    fn test_split_documents_keeps_order_and_metadata() {
        let splitter = RecursiveTextSplitter::default();
        let meta_a = Metadata::from([("source".to_string(), "a.pdf".to_string())]);
        let meta_b = Metadata::from([("source".to_string(), "b.pdf".to_string())]);
        let docs = vec![
            Document::new(words(200), meta_a.clone()),
            Document::new("short page", meta_b.clone()),
        ];

        let chunks = splitter.split_documents(&docs);

        let (a, b): (Vec<_>, Vec<_>) = chunks.iter().partition(|c| c.metadata == meta_a);
        assert!(a.len() > 1);
        assert_eq!(b.len(), 1);
        assert_eq!(chunks.last().unwrap().metadata, meta_b);
        for (i, chunk) in a.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i as u32);
        }
        assert_eq!(b[0].chunk_index, 0);
        assert_eq!(b[0].content, "short page");
    }

    #[test]
    fn test_whitespace_only_text_yields_nothing() {
        let splitter = RecursiveTextSplitter::default();
        assert!(splitter.split_text("   \n\n  ").is_empty());
    }
}
