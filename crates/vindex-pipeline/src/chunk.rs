//! Recursive text chunker.
//!
//! Splits content by trying progressively finer separators until chunks fit
//! within the character budget.

use async_trait::async_trait;

use vindex_core::{Chunk, Chunker, Language, Result};

/// Generic text splitter guided by per-language separator sets.
///
/// Tries each separator in order (paragraph breaks down to single spaces),
/// greedily packing parts into chunks up to `max_chars`. A trailing chunk
/// shorter than `min_chars` is folded into its predecessor when it fits.
pub struct TextChunker {
    max_chars: usize,
    min_chars: usize,
}

impl TextChunker {
    /// Create a chunker with the default character budget.
    pub fn new() -> Self {
        Self {
            max_chars: 2000,
            min_chars: 100,
        }
    }

    /// Create a chunker with a custom character budget.
    pub fn with_limits(max_chars: usize, min_chars: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
            min_chars,
        }
    }

    /// Separators for the given language, coarsest first.
    fn separators(language: Language) -> &'static [&'static str] {
        match language {
            Language::Markdown => &["\n## ", "\n### ", "\n\n", "\n", ". ", " "],
            Language::Rust
            | Language::Python
            | Language::TypeScript
            | Language::JavaScript
            | Language::Go => &["\n\n", "\nfn ", "\ndef ", "\nfunc ", "\nclass ", "\n", " "],
            Language::Json | Language::Yaml | Language::Toml => &["\n\n", "\n", ", ", " "],
            Language::PlainText | Language::Unknown => &["\n\n", "\n", ". ", " "],
        }
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        if text.len() <= self.max_chars {
            return vec![text.to_string()];
        }

        for (i, separator) in separators.iter().enumerate() {
            let parts: Vec<&str> = text
                .split(separator)
                .filter(|p| !p.trim().is_empty())
                .collect();
            if parts.len() <= 1 {
                continue;
            }

            let mut chunks = Vec::new();
            let mut current = String::new();

            for part in parts {
                let candidate_len = if current.is_empty() {
                    part.len()
                } else {
                    current.len() + separator.len() + part.len()
                };

                if candidate_len <= self.max_chars {
                    if !current.is_empty() {
                        current.push_str(separator);
                    }
                    current.push_str(part);
                    continue;
                }

                if !current.is_empty() {
                    chunks.push(std::mem::take(&mut current));
                }

                if part.len() > self.max_chars {
                    // Part alone exceeds the budget; recurse with the
                    // remaining, finer separators.
                    chunks.extend(self.split_recursive(part, &separators[i + 1..]));
                } else {
                    current = part.to_string();
                }
            }

            if !current.is_empty() {
                chunks.push(current);
            }

            self.fold_small_tail(&mut chunks, separator);
            return chunks;
        }

        // No separator made progress; hard-split on character boundaries.
        hard_split(text, self.max_chars)
    }

    /// Fold a trailing chunk below `min_chars` into its predecessor when
    /// the result still fits the budget.
    fn fold_small_tail(&self, chunks: &mut Vec<String>, separator: &str) {
        if chunks.len() < 2 {
            return;
        }
        let tail_len = chunks[chunks.len() - 1].len();
        let prev_len = chunks[chunks.len() - 2].len();
        if tail_len >= self.min_chars
            || prev_len + separator.len() + tail_len > self.max_chars
        {
            return;
        }
        if let Some(tail) = chunks.pop() {
            if let Some(prev) = chunks.last_mut() {
                prev.push_str(separator);
                prev.push_str(&tail);
            }
        }
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Chunker for TextChunker {
    async fn chunk(&self, content: &str, language: Language) -> Result<Vec<Chunk>> {
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let pieces = self.split_recursive(content, Self::separators(language));
        Ok(pieces.into_iter().map(Chunk::new).collect())
    }
}

fn hard_split(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        current.push(ch);
        if current.len() >= max_chars {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_short_content_is_one_chunk() {
        let chunker = TextChunker::new();
        let chunks = chunker
            .chunk("fn main() {}", Language::Rust)
            .await
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "fn main() {}");
    }

    #[tokio::test]
    async fn test_empty_content_is_empty() {
        let chunker = TextChunker::new();
        assert!(chunker.chunk("", Language::Rust).await.unwrap().is_empty());
        assert!(chunker
            .chunk("   \n  ", Language::PlainText)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_paragraphs_split_within_budget() {
        let chunker = TextChunker::with_limits(80, 10);
        let content = vec![
            "first paragraph with some words in it",
            "second paragraph with some words in it",
            "third paragraph with some words in it",
        ]
        .join("\n\n");

        let chunks = chunker.chunk(&content, Language::PlainText).await.unwrap();
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.content.len() <= 80, "oversized chunk: {}", chunk.content.len());
        }
    }

    #[tokio::test]
    async fn test_separatorless_content_hard_splits() {
        let chunker = TextChunker::with_limits(100, 10);
        let content = "x".repeat(250);

        let chunks = chunker.chunk(&content, Language::PlainText).await.unwrap();
        assert_eq!(chunks.len(), 3);
        let total: usize = chunks.iter().map(|c| c.content.len()).sum();
        assert_eq!(total, 250);
    }

    #[tokio::test]
    async fn test_small_tail_folds_into_predecessor() {
        let chunker = TextChunker::with_limits(40, 10);
        // An oversized word-run forces recursion to the space separator;
        // the two-character tail then folds into the last produced chunk.
        let words = "word ".repeat(20);
        let content = format!("{}\n\nok", words.trim_end());

        let chunks = chunker.chunk(&content, Language::PlainText).await.unwrap();
        assert!(chunks.len() > 1);
        // The two-character tail must not stand alone.
        assert!(chunks.iter().all(|c| c.content != "ok"));
        assert!(chunks.last().map_or(false, |c| c.content.ends_with("ok")));
    }
}
