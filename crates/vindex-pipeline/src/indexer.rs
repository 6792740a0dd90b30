//! Indexing pipeline: content → chunks → vectors → indexed items → backend.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};

use vindex_core::{
    Chunker, EmbeddingFunction, Filter, IndexError, IndexedItem, Language, QueryResult, Result,
};
use vindex_store::IndexManager;

/// Caller-level orchestration over the index manager.
///
/// Builds `{source}-chunk-{index}` ids and records `source`, `language`, and
/// `chunk_index` in each chunk's metadata so filtered deletes and queries can
/// scope by source.
pub struct IndexingPipeline {
    manager: Arc<IndexManager>,
    embedding: Arc<dyn EmbeddingFunction>,
    chunker: Arc<dyn Chunker>,
}

impl IndexingPipeline {
    /// Create a pipeline over an initialized manager.
    pub fn new(
        manager: Arc<IndexManager>,
        embedding: Arc<dyn EmbeddingFunction>,
        chunker: Arc<dyn Chunker>,
    ) -> Self {
        Self {
            manager,
            embedding,
            chunker,
        }
    }

    /// The underlying manager.
    pub fn manager(&self) -> &Arc<IndexManager> {
        &self.manager
    }

    /// Chunk, embed, and upsert one source's content. Returns the number of
    /// chunks indexed.
    ///
    /// Any previously indexed chunks for the same source are deleted first:
    /// ids are positional, so a source that shrank would otherwise leave
    /// stale tail chunks behind.
    pub async fn index_content(
        &self,
        source: &str,
        content: &str,
        language: Language,
    ) -> Result<usize> {
        let chunks = self.chunker.chunk(content, language).await?;
        if chunks.is_empty() {
            debug!("No chunks produced for source '{}'", source);
            return Ok(0);
        }

        let mut filter = Filter::new();
        filter.insert("source".to_string(), json!(source));
        self.manager.delete_where(&filter).await?;

        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let vectors = self.embedding.generate(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(IndexError::embedding(format!(
                "embedding function returned {} vector(s) for {} chunk(s)",
                vectors.len(),
                chunks.len()
            )));
        }

        let items: Vec<IndexedItem> = chunks
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(index, (mut chunk, vector))| {
                chunk.metadata.insert("source".to_string(), json!(source));
                chunk
                    .metadata
                    .insert("language".to_string(), json!(language.as_str()));
                chunk
                    .metadata
                    .insert("chunk_index".to_string(), json!(index));
                IndexedItem::new(format!("{}-chunk-{}", source, index), vector, chunk)
            })
            .collect();

        self.manager.upsert_items(&items).await?;

        info!("Indexed {} chunk(s) from source '{}'", items.len(), source);
        Ok(items.len())
    }

    /// Embed the query text and return ranked results.
    pub async fn query(
        &self,
        text: &str,
        top_k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<QueryResult>> {
        let vectors = self.embedding.generate(&[text]).await?;
        let vector = vectors.into_iter().next().ok_or_else(|| {
            IndexError::embedding("embedding function returned no vector for the query")
        })?;

        self.manager.query_index(&vector, top_k, filter).await
    }

    /// Delete every chunk indexed from the given source.
    pub async fn remove_source(&self, source: &str) -> Result<()> {
        let mut filter = Filter::new();
        filter.insert("source".to_string(), json!(source));
        self.manager.delete_where(&filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MockEmbedder, TextChunker};
    use vindex_core::VectorDbConfig;

    async fn pipeline() -> IndexingPipeline {
        pipeline_with_chunker(TextChunker::new()).await
    }

    async fn pipeline_with_chunker(chunker: TextChunker) -> IndexingPipeline {
        let manager = Arc::new(
            IndexManager::create(VectorDbConfig::InMemory, None)
                .await
                .unwrap(),
        );
        IndexingPipeline::new(manager, Arc::new(MockEmbedder::new()), Arc::new(chunker))
    }

    #[tokio::test]
    async fn test_index_and_query_roundtrip() {
        let pipeline = pipeline().await;

        let content = "fn main() { println!(\"hello\"); }";
        let count = pipeline
            .index_content("main.rs", content, Language::Rust)
            .await
            .unwrap();
        assert_eq!(count, 1);

        // The mock embedder is deterministic, so querying with the chunk's
        // own text scores it at 1.
        let results = pipeline.query(content, 5, None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].item.id, "main.rs-chunk-0");
        assert!((results[0].score - 1.0).abs() < 1e-5);
        assert_eq!(
            results[0].item.chunk.metadata.get("source"),
            Some(&json!("main.rs"))
        );
        assert_eq!(
            results[0].item.chunk.metadata.get("language"),
            Some(&json!("rust"))
        );
    }

    #[tokio::test]
    async fn test_ids_are_source_scoped_and_positional() {
        let pipeline = pipeline_with_chunker(TextChunker::with_limits(40, 5)).await;

        let content = "first paragraph of text\n\nsecond paragraph of text\n\nthird paragraph";
        let count = pipeline
            .index_content("notes.txt", content, Language::PlainText)
            .await
            .unwrap();
        assert!(count > 1);

        let mut ids = pipeline.manager().get_all_ids().await.unwrap();
        ids.sort();
        for i in 0..count {
            assert!(ids.contains(&format!("notes.txt-chunk-{}", i)));
        }
    }

    #[tokio::test]
    async fn test_reindex_drops_stale_tail_chunks() {
        let pipeline = pipeline_with_chunker(TextChunker::with_limits(40, 5)).await;

        let long = "first paragraph of text\n\nsecond paragraph of text\n\nthird paragraph";
        let long_count = pipeline
            .index_content("a.txt", long, Language::PlainText)
            .await
            .unwrap();
        assert!(long_count > 1);

        let short_count = pipeline
            .index_content("a.txt", "tiny", Language::PlainText)
            .await
            .unwrap();
        assert_eq!(short_count, 1);

        let ids = pipeline.manager().get_all_ids().await.unwrap();
        assert_eq!(ids, vec!["a.txt-chunk-0".to_string()]);
    }

    #[tokio::test]
    async fn test_query_filtered_by_source() {
        let pipeline = pipeline().await;
        pipeline
            .index_content("a.rs", "fn a() {}", Language::Rust)
            .await
            .unwrap();
        pipeline
            .index_content("b.rs", "fn b() {}", Language::Rust)
            .await
            .unwrap();

        let mut filter = Filter::new();
        filter.insert("source".to_string(), json!("b.rs"));
        let results = pipeline.query("fn a() {}", 5, Some(&filter)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].item.id, "b.rs-chunk-0");
    }

    #[tokio::test]
    async fn test_remove_source() {
        let pipeline = pipeline().await;
        pipeline
            .index_content("a.rs", "fn a() {}", Language::Rust)
            .await
            .unwrap();
        pipeline
            .index_content("b.rs", "fn b() {}", Language::Rust)
            .await
            .unwrap();

        pipeline.remove_source("a.rs").await.unwrap();

        let ids = pipeline.manager().get_all_ids().await.unwrap();
        assert_eq!(ids, vec!["b.rs-chunk-0".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_content_indexes_nothing() {
        let pipeline = pipeline().await;
        let count = pipeline
            .index_content("empty.txt", "", Language::PlainText)
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert!(pipeline.manager().get_all_ids().await.unwrap().is_empty());
    }
}
