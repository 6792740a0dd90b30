//! Backend-agnostic index manager.

use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use vindex_core::{
    EmbeddingFunction, Filter, IndexError, IndexStatus, IndexedItem, QueryResult, Result,
    VectorDbConfig,
};

use crate::chroma::ChromaBackend;
use crate::memory::MemoryBackend;
use crate::pinecone::PineconeBackend;

/// The configured backend. A closed set: every public manager method
/// matches exhaustively over these variants with no wildcard arm, so adding
/// a backend fails compilation at every unhandled dispatch site.
enum Backend {
    InMemory(MemoryBackend),
    Pinecone(PineconeBackend),
    Chroma(ChromaBackend),
}

/// One backend-agnostic interface over the three vector store backends.
///
/// Constructed only through the async [`IndexManager::create`] factory, which
/// completes all backend setup before returning; a reachable instance is
/// therefore always initialized. The generic filter model (flat scalar
/// equality) is translated into each backend's native request shape inside
/// the adapters, and each backend's response is normalized back into
/// [`QueryResult`]s.
///
/// There is no transaction guarantee across items: a failing batched upsert
/// may leave earlier batches written. No retries, timeouts, or cancellation
/// are applied at this layer; callers own both.
pub struct IndexManager {
    backend: Backend,

    /// Vector dimensionality recorded on first upsert; later mismatches
    /// fail before any backend call.
    dimension: Mutex<Option<usize>>,
}

impl IndexManager {
    /// Create a manager for the configured provider.
    ///
    /// `embedding` is required for ChromaDB (the collection API demands an
    /// embedding callback even for vector-only use) and ignored otherwise.
    /// Pinecone setup is local-only here; index existence is verified lazily
    /// by the remote service on first operation. ChromaDB performs its
    /// get-or-create collection call now, and that failure aborts creation.
    pub async fn create(
        config: VectorDbConfig,
        embedding: Option<Arc<dyn EmbeddingFunction>>,
    ) -> Result<Self> {
        config.validate()?;
        let provider = config.provider_name();

        let backend = match config {
            VectorDbConfig::InMemory => Backend::InMemory(MemoryBackend::new()),
            VectorDbConfig::Pinecone {
                api_key,
                index_name,
                namespace,
            } => Backend::Pinecone(PineconeBackend::new(
                &api_key,
                &index_name,
                namespace.as_deref(),
            )?),
            VectorDbConfig::ChromaDb {
                path,
                host,
                collection_name,
            } => {
                let embedding = embedding.ok_or_else(|| {
                    IndexError::config("ChromaDB requires an embedding function")
                })?;
                // validate() guarantees at least one of path/host is set.
                let url = path.or(host).ok_or_else(|| {
                    IndexError::config("ChromaDB requires either a path or a host")
                })?;
                Backend::Chroma(ChromaBackend::connect(&url, &collection_name, embedding).await?)
            }
        };

        info!("Index manager initialized with provider '{}'", provider);

        Ok(Self {
            backend,
            dimension: Mutex::new(None),
        })
    }

    /// Whether the manager completed initialization.
    ///
    /// Always true: the factory either returns an initialized manager or an
    /// error. Kept on the API so callers holding a manager behind a dynamic
    /// boundary can assert the invariant.
    pub fn is_initialized(&self) -> bool {
        true
    }

    /// Stable provider name of the active backend.
    pub fn provider_name(&self) -> &'static str {
        match &self.backend {
            Backend::InMemory(_) => "in_memory",
            Backend::Pinecone(_) => "pinecone",
            Backend::Chroma(_) => "chromadb",
        }
    }

    /// Whether `delete_where` is reliably supported by the active backend.
    ///
    /// False for Pinecone, where filtered-delete support is plan-dependent
    /// and failures are downgraded to a warning.
    pub fn supports_filtered_delete(&self) -> bool {
        match &self.backend {
            Backend::InMemory(_) => true,
            Backend::Pinecone(p) => p.supports_filtered_delete(),
            Backend::Chroma(c) => c.supports_filtered_delete(),
        }
    }

    /// Write each item into the active backend, insert-or-replace by id.
    ///
    /// Empty input returns immediately with no backend call. Partial writes
    /// are possible when a batched backend call fails mid-way and are not
    /// rolled back.
    pub async fn upsert_items(&self, items: &[IndexedItem]) -> Result<()> {
        if items.is_empty() {
            debug!("upsert_items called with no items; skipping backend call");
            return Ok(());
        }

        self.check_dimensions(items)?;

        let result = match &self.backend {
            Backend::InMemory(m) => m.upsert(items),
            Backend::Pinecone(p) => p.upsert(items).await,
            Backend::Chroma(c) => c.upsert(items).await,
        };

        result.map_err(|e| IndexError::upsert(e.to_string()))
    }

    /// Up to `top_k` results ranked by descending similarity, restricted to
    /// items matching `filter` when provided.
    ///
    /// An empty index, a non-matching filter, or a `top_k` larger than the
    /// item count produce short or empty result sets, never errors.
    pub async fn query_index(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<QueryResult>> {
        let results = match &self.backend {
            Backend::InMemory(m) => m.query(vector, top_k, filter),
            Backend::Pinecone(p) => p.query(vector, top_k, filter).await,
            Backend::Chroma(c) => c.query(vector, top_k, filter).await,
        };

        let results = results.map_err(|e| IndexError::query(e.to_string()))?;
        debug!("Query returned {} result(s)", results.len());
        Ok(results)
    }

    /// Delete by exact id match. Empty input is a no-op; absent ids are
    /// ignored by every backend.
    pub async fn delete_items(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            debug!("delete_items called with no ids; skipping backend call");
            return Ok(());
        }

        let result = match &self.backend {
            Backend::InMemory(m) => m.delete(ids),
            Backend::Pinecone(p) => p.delete(ids).await,
            Backend::Chroma(c) => c.delete(ids).await,
        };

        result.map_err(|e| IndexError::delete(e.to_string()))
    }

    /// Delete everything matching the filter.
    ///
    /// Refuses an empty filter (warns and returns) as a guard against
    /// accidental full-collection wipes. The Pinecone path is the one
    /// deliberate soft-failure: filtered-delete support is plan-dependent,
    /// so its failure is logged as a warning rather than propagated.
    pub async fn delete_where(&self, filter: &Filter) -> Result<()> {
        if filter.is_empty() {
            warn!("delete_where called with an empty filter; refusing to wipe the collection");
            return Ok(());
        }

        match &self.backend {
            Backend::InMemory(m) => {
                let ids = m
                    .matching_ids(filter)
                    .and_then(|ids| m.delete(&ids).map(|_| ids))
                    .map_err(|e| IndexError::delete(e.to_string()))?;
                debug!("delete_where removed {} item(s)", ids.len());
                Ok(())
            }
            Backend::Pinecone(p) => {
                if let Err(e) = p.delete_where(filter).await {
                    warn!(
                        "Pinecone filtered delete failed (not supported on all plans): {}",
                        e
                    );
                }
                Ok(())
            }
            Backend::Chroma(c) => c
                .delete_where(filter)
                .await
                .map_err(|e| IndexError::delete(e.to_string())),
        }
    }

    /// Every id currently stored, accumulated across backend pages where
    /// the backend paginates.
    pub async fn get_all_ids(&self) -> Result<Vec<String>> {
        let result = match &self.backend {
            Backend::InMemory(m) => m.all_ids(),
            Backend::Pinecone(p) => p.all_ids().await,
            Backend::Chroma(c) => c.all_ids().await,
        };

        result.map_err(|e| IndexError::query(e.to_string()))
    }

    /// Item count and display name of the active collection.
    pub async fn get_status(&self) -> Result<IndexStatus> {
        let result = match &self.backend {
            Backend::InMemory(m) => m.status(),
            Backend::Pinecone(p) => p.status().await,
            Backend::Chroma(c) => c.status().await,
        };

        result.map_err(|e| IndexError::status(e.to_string()))
    }

    /// Clear the instance-owned in-memory store and the recorded dimension.
    /// For test harnesses; a no-op with a warning on remote backends.
    pub fn reset(&self) -> Result<()> {
        match &self.backend {
            Backend::InMemory(m) => {
                m.clear()?;
                if let Ok(mut dim) = self.dimension.lock() {
                    *dim = None;
                }
                Ok(())
            }
            Backend::Pinecone(_) | Backend::Chroma(_) => {
                warn!("reset is only supported for the in-memory backend");
                Ok(())
            }
        }
    }

    /// Enforce constant vector dimensionality within the collection. The
    /// first upsert records the dimension; any later mismatch fails before
    /// the backend is called.
    fn check_dimensions(&self, items: &[IndexedItem]) -> Result<()> {
        let mut dimension = self
            .dimension
            .lock()
            .map_err(|e| IndexError::backend(format!("dimension lock poisoned: {}", e)))?;

        for item in items {
            match *dimension {
                Some(expected) if item.vector.len() != expected => {
                    return Err(IndexError::upsert(format!(
                        "dimension mismatch for item '{}': expected {}, got {}",
                        item.id,
                        expected,
                        item.vector.len()
                    )));
                }
                Some(_) => {}
                None => *dimension = Some(item.vector.len()),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vindex_core::Chunk;

    async fn memory_manager() -> IndexManager {
        IndexManager::create(VectorDbConfig::InMemory, None)
            .await
            .unwrap()
    }

    fn item(id: &str, vector: Vec<f32>, source: &str) -> IndexedItem {
        IndexedItem::new(
            id,
            vector,
            Chunk::new(format!("content of {}", id)).with_metadata("source", json!(source)),
        )
    }

    fn source_filter(source: &str) -> Filter {
        let mut filter = Filter::new();
        filter.insert("source".to_string(), json!(source));
        filter
    }

    #[tokio::test]
    async fn test_create_in_memory() {
        let manager = memory_manager().await;
        assert!(manager.is_initialized());
        assert_eq!(manager.provider_name(), "in_memory");
        assert!(manager.supports_filtered_delete());
    }

    #[tokio::test]
    async fn test_create_chromadb_without_embedding_fails() {
        let config = VectorDbConfig::ChromaDb {
            path: Some("http://localhost:8000".to_string()),
            host: None,
            collection_name: "test".to_string(),
        };
        let result = IndexManager::create(config, None).await;
        assert!(matches!(result, Err(IndexError::Config { .. })));
    }

    #[tokio::test]
    async fn test_create_pinecone_rejects_missing_fields() {
        let config = VectorDbConfig::Pinecone {
            api_key: "".to_string(),
            index_name: "idx".to_string(),
            namespace: None,
        };
        assert!(matches!(
            IndexManager::create(config, None).await,
            Err(IndexError::Config { .. })
        ));
    }

    #[tokio::test]
    async fn test_single_item_roundtrip() {
        let manager = memory_manager().await;
        let mut it = item("a", vec![1.0, 0.0], "f1.ts");
        it.chunk.content = "hello".to_string();
        it.chunk
            .metadata
            .insert("lang".to_string(), json!("ts"));
        manager.upsert_items(&[it]).await.unwrap();

        let results = manager.query_index(&[1.0, 0.0], 5, None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].item.id, "a");
        assert!((results[0].score - 1.0).abs() < 1e-6);
        assert_eq!(results[0].item.chunk.content, "hello");
    }

    #[tokio::test]
    async fn test_top_k_limits_results() {
        let manager = memory_manager().await;
        manager
            .upsert_items(&[
                item("a", vec![1.0, 0.0], "f1.ts"),
                item("b", vec![0.0, 1.0], "f2.ts"),
            ])
            .await
            .unwrap();

        let results = manager.query_index(&[1.0, 0.0], 1, None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].item.id, "a");
        assert!((results[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_top_k_larger_than_store_returns_all() {
        let manager = memory_manager().await;
        manager
            .upsert_items(&[item("a", vec![1.0, 0.0], "f1.ts")])
            .await
            .unwrap();

        let results = manager.query_index(&[1.0, 0.0], 50, None).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_query_empty_index_is_empty() {
        let manager = memory_manager().await;
        let results = manager.query_index(&[1.0, 0.0], 5, None).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_query_with_unmatched_filter_is_empty() {
        let manager = memory_manager().await;
        manager
            .upsert_items(&[item("a", vec![1.0, 0.0], "f1.ts")])
            .await
            .unwrap();

        let results = manager
            .query_index(&[1.0, 0.0], 5, Some(&source_filter("missing.ts")))
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_same_id_twice_keeps_one_entry() {
        let manager = memory_manager().await;
        let mut first = item("a", vec![1.0, 0.0], "f1.ts");
        first.chunk.content = "first".to_string();
        let mut second = item("a", vec![1.0, 0.0], "f1.ts");
        second.chunk.content = "second".to_string();

        manager.upsert_items(&[first]).await.unwrap();
        manager.upsert_items(&[second]).await.unwrap();

        let ids = manager.get_all_ids().await.unwrap();
        assert_eq!(ids, vec!["a".to_string()]);

        let results = manager.query_index(&[1.0, 0.0], 5, None).await.unwrap();
        assert_eq!(results[0].item.chunk.content, "second");
    }

    #[tokio::test]
    async fn test_empty_upsert_and_delete_are_noops() {
        let manager = memory_manager().await;
        manager.upsert_items(&[]).await.unwrap();
        manager.delete_items(&[]).await.unwrap();
        assert!(manager.get_all_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_absent_id_is_idempotent() {
        let manager = memory_manager().await;
        manager
            .upsert_items(&[item("a", vec![1.0, 0.0], "f1.ts")])
            .await
            .unwrap();

        manager
            .delete_items(&["missing".to_string()])
            .await
            .unwrap();
        assert_eq!(manager.get_all_ids().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_where_by_source() {
        let manager = memory_manager().await;
        manager
            .upsert_items(&[
                item("a", vec![1.0, 0.0], "f1.ts"),
                item("b", vec![0.0, 1.0], "f1.ts"),
                item("c", vec![0.5, 0.5], "f2.ts"),
            ])
            .await
            .unwrap();

        manager.delete_where(&source_filter("f1.ts")).await.unwrap();

        let ids = manager.get_all_ids().await.unwrap();
        assert_eq!(ids, vec!["c".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_where_empty_filter_refuses() {
        let manager = memory_manager().await;
        manager
            .upsert_items(&[item("a", vec![1.0, 0.0], "f1.ts")])
            .await
            .unwrap();

        manager.delete_where(&Filter::new()).await.unwrap();
        assert_eq!(manager.get_all_ids().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_status_reports_count_and_name() {
        let manager = memory_manager().await;
        manager
            .upsert_items(&[
                item("a", vec![1.0, 0.0], "f1.ts"),
                item("b", vec![0.0, 1.0], "f2.ts"),
            ])
            .await
            .unwrap();

        let status = manager.get_status().await.unwrap();
        assert_eq!(status.count, 2);
        assert_eq!(status.name, crate::memory::MEMORY_INDEX_NAME);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_fails_before_backend() {
        let manager = memory_manager().await;
        manager
            .upsert_items(&[item("a", vec![1.0, 0.0], "f1.ts")])
            .await
            .unwrap();

        let result = manager
            .upsert_items(&[item("b", vec![1.0, 0.0, 0.0], "f2.ts")])
            .await;
        assert!(matches!(result, Err(IndexError::Upsert { .. })));

        // The mismatching item must not have been written.
        assert_eq!(manager.get_all_ids().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reset_clears_store_and_dimension() {
        let manager = memory_manager().await;
        manager
            .upsert_items(&[item("a", vec![1.0, 0.0], "f1.ts")])
            .await
            .unwrap();

        manager.reset().unwrap();
        assert!(manager.get_all_ids().await.unwrap().is_empty());

        // A different dimensionality is accepted after reset.
        manager
            .upsert_items(&[item("b", vec![1.0, 0.0, 0.0], "f2.ts")])
            .await
            .unwrap();
    }
}
