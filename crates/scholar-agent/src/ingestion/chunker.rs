//! Fixed-window text chunking with overlap

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Text chunker with configurable size and overlap
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Target chunk size in characters
    chunk_size: usize,
    /// Overlap between consecutive chunks
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker. Overlap is clamped below the chunk size so
    /// every window advances.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    /// Split text into whitespace-normalised windows of `chunk_size` characters
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let normalized = WHITESPACE.replace_all(text, " ");
        let chars: Vec<char> = normalized.trim().chars().collect();
        let len = chars.len();

        let mut chunks = Vec::new();
        let mut start = 0usize;

        while start < len {
            let end = (start + self.chunk_size).min(len);
            let chunk: String = chars[start..end].iter().collect();
            let chunk = chunk.trim();
            if !chunk.is_empty() {
                chunks.push(chunk.to_string());
            }
            if end >= len {
                break;
            }
            start = end - self.overlap;
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text() {
        let chunker = TextChunker::new(10, 2);
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk(" \n\t ").is_empty());
    }

    #[test]
    fn test_whitespace_is_normalised() {
        let chunker = TextChunker::new(100, 10);
        assert_eq!(chunker.chunk("a\n\n b\t\tc  "), vec!["a b c".to_string()]);
    }

    #[test]
    fn test_windows_overlap() {
        let chunker = TextChunker::new(4, 1);
        // abcdefghij -> [abcd] [defg] [ghij]
        assert_eq!(
            chunker.chunk("abcdefghij"),
            vec!["abcd".to_string(), "defg".to_string(), "ghij".to_string()]
        );
    }

    #[test]
    fn test_multibyte_characters() {
        let chunker = TextChunker::new(3, 0);
        assert_eq!(
            chunker.chunk("论文翻译总结"),
            vec!["论文翻".to_string(), "译总结".to_string()]
        );
    }

    #[test]
    fn test_overlap_clamped() {
        let chunker = TextChunker::new(3, 10);
        let chunks = chunker.chunk("abcdef");
        assert_eq!(chunks.first().map(String::as_str), Some("abc"));
        assert_eq!(chunks.last().map(String::as_str), Some("def"));
    }
}
