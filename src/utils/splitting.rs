//! Recursive text splitting for document ingestion.
//!
//! [RecursiveCharacterSplitter] cuts text into chunks of at most `chunk_size` length
//! units, trying separators in order from coarsest to finest and re-joining small pieces
//! until a chunk is full. Consecutive chunks share up to `chunk_overlap` units of
//! trailing context. Length is measured by a caller-supplied [CountToken], so the same
//! splitter works with plain character counts or a real tokenizer.

use log::warn;

use crate::utils::loaders::Document;
use crate::utils::token::CountToken;

/// Splitter with an ordered separator list. The default list (`"\n\n"`, `"\n"`, `" "`,
/// `""`) tries to keep paragraphs together, then lines, then words, then falls back to
/// single characters.
#[derive(Debug, Clone)]
#[readonly::make]
pub struct RecursiveCharacterSplitter {
    /// Maximum chunk length, readonly
    pub chunk_size: usize,
    /// Length carried over between consecutive chunks, readonly
    pub chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveCharacterSplitter {
    /// Create a splitter with the default separator list.
    /// Panics if `chunk_overlap` is not smaller than `chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self::with_separators(chunk_size, chunk_overlap, vec!["\n\n", "\n", " ", ""])
    }

    /// Create a splitter with a custom separator list, ordered coarsest first.
    /// Panics if `chunk_overlap` is not smaller than `chunk_size`.
    pub fn with_separators(
        chunk_size: usize,
        chunk_overlap: usize,
        separators: Vec<impl Into<String>>,
    ) -> Self {
        assert!(
            chunk_overlap < chunk_size,
            "chunk overlap {} must be smaller than chunk size {}",
            chunk_overlap,
            chunk_size
        );
        Self {
            chunk_size,
            chunk_overlap,
            separators: separators.into_iter().map(Into::into).collect(),
        }
    }

    /// Split one text into chunks.
    pub fn split_text(&self, text: &str, counter: &impl CountToken) -> Vec<String> {
        self.split_with(text, &self.separators, counter)
    }

    /// Split every document, each chunk inheriting its document's metadata.
    pub fn split_documents(&self, documents: Vec<Document>, counter: &impl CountToken) -> Vec<Document> {
        let mut chunks = Vec::new();
        for document in documents {
            for chunk in self.split_text(&document.page_content, counter) {
                chunks.push(Document::new(chunk, document.metadata.clone()));
            }
        }
        chunks
    }

    fn split_with(&self, text: &str, separators: &[String], counter: &impl CountToken) -> Vec<String> {
        // pick the coarsest separator that occurs in the text; "" always matches
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut finer: &[String] = &[];
        for (idx, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() || text.contains(candidate.as_str()) {
                separator = candidate;
                finer = &separators[idx + 1..];
                break;
            }
        }

        let pieces: Vec<String> = if separator.is_empty() {
            text.chars().map(|c| c.to_string()).collect()
        } else {
            text.split(separator).map(str::to_string).collect()
        };

        let mut chunks = Vec::new();
        let mut fitting: Vec<String> = Vec::new();
        for piece in pieces {
            if counter.count_token(&piece) < self.chunk_size {
                fitting.push(piece);
            } else {
                if !fitting.is_empty() {
                    chunks.extend(self.merge_pieces(std::mem::take(&mut fitting), separator, counter));
                }
                if finer.is_empty() {
                    chunks.push(piece);
                } else {
                    chunks.extend(self.split_with(&piece, finer, counter));
                }
            }
        }
        if !fitting.is_empty() {
            chunks.extend(self.merge_pieces(fitting, separator, counter));
        }
        chunks
    }

    /// Re-join small pieces into chunks up to `chunk_size`, carrying `chunk_overlap`
    /// worth of trailing pieces into the next chunk.
    fn merge_pieces(&self, pieces: Vec<String>, separator: &str, counter: &impl CountToken) -> Vec<String> {
        let separator_len = counter.count_token(separator);
        let mut chunks = Vec::new();
        let mut window: Vec<String> = Vec::new();
        let mut total = 0usize;
        for piece in pieces {
            let piece_len = counter.count_token(&piece);
            if !window.is_empty() && total + piece_len + separator_len > self.chunk_size {
                if total > self.chunk_size {
                    warn!(
                        "created a chunk of size {}, which is longer than the requested {}",
                        total, self.chunk_size
                    );
                }
                if let Some(chunk) = join_pieces(&window, separator) {
                    chunks.push(chunk);
                }
                while total > self.chunk_overlap
                    || (total + piece_len + separator_len > self.chunk_size && total > 0)
                {
                    let dropped = window.remove(0);
                    total -= counter.count_token(&dropped)
                        + if window.is_empty() { 0 } else { separator_len };
                }
            }
            total += piece_len + if window.is_empty() { 0 } else { separator_len };
            window.push(piece);
        }
        if let Some(chunk) = join_pieces(&window, separator) {
            chunks.push(chunk);
        }
        chunks
    }
}

fn join_pieces(pieces: &[String], separator: &str) -> Option<String> {
    let joined = pieces.join(separator);
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod test_splitting {
    use serde_json::json;

    use super::RecursiveCharacterSplitter;
    use crate::utils::loaders::Document;
    use crate::utils::token::count_tokens_by_len;
    use crate::utils::JsonMap;

    #[test]
    fn test_short_text_is_one_chunk() {
        let splitter = RecursiveCharacterSplitter::new(100, 0);
        let chunks = splitter.split_text("hello world", &count_tokens_by_len);
        assert_eq!(chunks, vec!["hello world".to_string()]);
    }

    #[test]
    fn test_chunks_respect_the_size_limit() {
        let splitter = RecursiveCharacterSplitter::new(8, 0);
        let chunks = splitter.split_text("aa bb cc dd ee ff", &count_tokens_by_len);
        assert_eq!(chunks, vec!["aa bb cc".to_string(), "dd ee ff".to_string()]);
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let splitter = RecursiveCharacterSplitter::new(8, 3);
        let chunks = splitter.split_text("aa bb cc dd ee ff", &count_tokens_by_len);
        assert_eq!(
            chunks,
            vec!["aa bb cc".to_string(), "cc dd ee".to_string(), "ee ff".to_string()]
        );
    }

    #[test]
    fn test_paragraphs_split_before_words() {
        let splitter = RecursiveCharacterSplitter::new(15, 0);
        let chunks = splitter.split_text("para one word\n\npara two word", &count_tokens_by_len);
        assert_eq!(chunks, vec!["para one word".to_string(), "para two word".to_string()]);
    }

    #[test]
    fn test_unbreakable_text_falls_back_to_characters() {
        let splitter = RecursiveCharacterSplitter::new(4, 0);
        let chunks = splitter.split_text("abcdefgh", &count_tokens_by_len);
        assert_eq!(chunks, vec!["abcd".to_string(), "efgh".to_string()]);
    }

    #[test]
    fn test_split_documents_keeps_metadata() {
        let mut metadata = JsonMap::new();
        metadata.insert("source".to_string(), json!("somewhere.txt"));
        let documents = vec![Document::new("aa bb cc dd ee ff", metadata.clone())];

        let splitter = RecursiveCharacterSplitter::new(8, 0);
        let chunks = splitter.split_documents(documents, &count_tokens_by_len);

        assert_eq!(chunks.len(), 2);
        for chunk in &chunks {
            assert_eq!(chunk.metadata, metadata);
        }
    }

    #[test]
    #[should_panic]
    fn test_overlap_must_be_smaller_than_chunk_size() {
        RecursiveCharacterSplitter::new(10, 10);
    }
}
