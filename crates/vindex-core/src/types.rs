//! Core domain types for the vector index layer.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Open metadata mapping attached to a chunk.
///
/// Values are expected to be scalars (string, number, boolean); nested
/// values are tolerated here but filtered out by backends that reject them.
pub type Metadata = HashMap<String, Value>;

/// Flat scalar-equality filter over item fields and metadata.
///
/// Keys match either a top-level item field (currently `id`) or a metadata
/// key. No range, prefix, or boolean-combination operators.
pub type Filter = HashMap<String, Value>;

/// Source language of a content fragment, used to pick chunking separators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Rust,
    Python,
    TypeScript,
    JavaScript,
    Go,
    Markdown,
    Json,
    Yaml,
    Toml,
    PlainText,
    Unknown,
}

impl Language {
    /// Detect language from file extension.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "rs" => Self::Rust,
            "py" | "pyi" => Self::Python,
            "ts" | "tsx" => Self::TypeScript,
            "js" | "jsx" | "mjs" | "cjs" => Self::JavaScript,
            "go" => Self::Go,
            "md" | "markdown" => Self::Markdown,
            "json" => Self::Json,
            "yaml" | "yml" => Self::Yaml,
            "toml" => Self::Toml,
            "txt" => Self::PlainText,
            _ => Self::Unknown,
        }
    }

    /// Detect language from a file path or source identifier.
    pub fn from_path(path: &str) -> Self {
        match path.rsplit_once('.') {
            Some((_, ext)) => Self::from_extension(ext),
            None => Self::Unknown,
        }
    }

    /// Stable lowercase name, used in metadata and tool parameters.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rust => "rust",
            Self::Python => "python",
            Self::TypeScript => "typescript",
            Self::JavaScript => "javascript",
            Self::Go => "go",
            Self::Markdown => "markdown",
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Toml => "toml",
            Self::PlainText => "plaintext",
            Self::Unknown => "unknown",
        }
    }

    /// Parse the stable name back into a language.
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "rust" => Self::Rust,
            "python" => Self::Python,
            "typescript" => Self::TypeScript,
            "javascript" => Self::JavaScript,
            "go" => Self::Go,
            "markdown" => Self::Markdown,
            "json" => Self::Json,
            "yaml" => Self::Yaml,
            "toml" => Self::Toml,
            "plaintext" | "text" => Self::PlainText,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A unit of source content with open metadata.
///
/// Produced by a [`crate::traits::Chunker`]; immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk text content.
    pub content: String,

    /// Open metadata (e.g. `source`, `language`, `chunk_index`).
    #[serde(default)]
    pub metadata: Metadata,
}

impl Chunk {
    /// Create a chunk with empty metadata.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    /// Attach a metadata entry, consuming and returning the chunk.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// A chunk extended with a caller-assigned id and an embedding vector.
///
/// Ids are unique within a collection (the pipeline uses
/// `{source}-chunk-{index}`). Upserting an existing id replaces the whole
/// item: content, metadata, and vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedItem {
    /// Unique id within the backing collection.
    pub id: String,

    /// Embedding vector; dimensionality is constant within one collection.
    pub vector: Vec<f32>,

    /// The underlying chunk.
    #[serde(flatten)]
    pub chunk: Chunk,
}

impl IndexedItem {
    /// Create an indexed item from a chunk.
    pub fn new(id: impl Into<String>, vector: Vec<f32>, chunk: Chunk) -> Self {
        Self {
            id: id.into(),
            vector,
            chunk,
        }
    }
}

/// A query hit: an item (possibly partially reconstructed) plus a score.
///
/// Higher score means more similar. Backends that do not return content or
/// vectors on query produce items with empty content and an empty vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// The matched item.
    pub item: IndexedItem,

    /// Similarity score, normalized so higher = more similar.
    pub score: f32,
}

/// Collection status: item count plus a display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStatus {
    /// Number of items currently stored.
    pub count: u64,

    /// Backend display name (index, collection, or sentinel).
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_language_from_extension() {
        assert_eq!(Language::from_extension("rs"), Language::Rust);
        assert_eq!(Language::from_extension("py"), Language::Python);
        assert_eq!(Language::from_extension("TS"), Language::TypeScript);
        assert_eq!(Language::from_extension("md"), Language::Markdown);
        assert_eq!(Language::from_extension("xyz"), Language::Unknown);
    }

    #[test]
    fn test_language_from_path() {
        assert_eq!(Language::from_path("src/lib.rs"), Language::Rust);
        assert_eq!(Language::from_path("README.md"), Language::Markdown);
        assert_eq!(Language::from_path("no_extension"), Language::Unknown);
    }

    #[test]
    fn test_language_name_roundtrip() {
        for lang in [Language::Rust, Language::Markdown, Language::PlainText] {
            assert_eq!(Language::from_name(lang.as_str()), lang);
        }
    }

    #[test]
    fn test_chunk_metadata_builder() {
        let chunk = Chunk::new("fn main() {}")
            .with_metadata("source", json!("main.rs"))
            .with_metadata("chunk_index", json!(0));

        assert_eq!(chunk.metadata.get("source"), Some(&json!("main.rs")));
        assert_eq!(chunk.metadata.get("chunk_index"), Some(&json!(0)));
    }

    #[test]
    fn test_indexed_item_serialization_flattens_chunk() {
        let item = IndexedItem::new(
            "a-chunk-0",
            vec![1.0, 0.0],
            Chunk::new("hello").with_metadata("source", json!("a.ts")),
        );

        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["id"], json!("a-chunk-0"));
        assert_eq!(value["content"], json!("hello"));
        assert_eq!(value["metadata"]["source"], json!("a.ts"));
    }
}
