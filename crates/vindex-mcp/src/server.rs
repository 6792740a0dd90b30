//! Tool server implementation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use vindex_core::{EmbeddingFunction, Filter, Language, VectorDbConfig};
use vindex_pipeline::{IndexingPipeline, MockEmbedder, TextChunker};
use vindex_store::IndexManager;

/// Tool server state: one pipeline over one configured backend.
pub struct IndexToolServer {
    /// Indexing and query orchestration.
    pipeline: Arc<IndexingPipeline>,
}

/// Index request parameters.
#[derive(Debug, Deserialize, Serialize)]
pub struct IndexContentParams {
    /// Source identifier (typically a file path).
    pub source: String,

    /// Raw content to index.
    pub content: String,

    /// Language name (optional, detected from `source` if not specified).
    pub language: Option<String>,
}

/// Query request parameters.
#[derive(Debug, Deserialize, Serialize)]
pub struct QueryParams {
    /// The search query.
    pub query: String,

    /// Maximum number of results (default: 5).
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Optional flat equality filter over item fields and metadata.
    pub filter: Option<Filter>,
}

fn default_top_k() -> usize {
    5
}

/// Delete request parameters.
#[derive(Debug, Deserialize, Serialize)]
pub struct DeleteSourceParams {
    /// Source whose chunks are deleted.
    pub source: String,
}

/// Tool result.
#[derive(Debug, Serialize)]
pub struct ToolResult {
    /// Whether the operation was successful.
    pub success: bool,

    /// Result message or content.
    pub message: String,
}

impl ToolResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl IndexToolServer {
    /// Create a tool server with the default (mock) embedding function.
    pub async fn create(config: VectorDbConfig) -> Result<Self, vindex_core::IndexError> {
        Self::with_embedding(config, Arc::new(MockEmbedder::new())).await
    }

    /// Create a tool server with a custom embedding function.
    pub async fn with_embedding(
        config: VectorDbConfig,
        embedding: Arc<dyn EmbeddingFunction>,
    ) -> Result<Self, vindex_core::IndexError> {
        info!(
            "Initializing index tool server with provider '{}'",
            config.provider_name()
        );

        let manager = Arc::new(IndexManager::create(config, Some(embedding.clone())).await?);
        let chunker = Arc::new(TextChunker::new());
        let pipeline = Arc::new(IndexingPipeline::new(manager, embedding, chunker));

        Ok(Self { pipeline })
    }

    /// Get the server info.
    pub fn info() -> ServerInfo {
        ServerInfo {
            name: "vindex".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "Vector index tools over in-memory, Pinecone, and ChromaDB backends"
                .to_string(),
        }
    }

    /// List available tools.
    pub fn tools() -> Vec<ToolInfo> {
        vec![
            ToolInfo {
                name: "index_content".to_string(),
                description: "Chunk, embed, and index a piece of content".to_string(),
            },
            ToolInfo {
                name: "index_query".to_string(),
                description: "Search the index for chunks similar to a query".to_string(),
            },
            ToolInfo {
                name: "index_status".to_string(),
                description: "Report the item count and collection name".to_string(),
            },
            ToolInfo {
                name: "index_delete_source".to_string(),
                description: "Delete every chunk indexed from one source".to_string(),
            },
            ToolInfo {
                name: "index_list_ids".to_string(),
                description: "List all indexed chunk ids".to_string(),
            },
        ]
    }

    /// Index a piece of content.
    pub async fn index_content(&self, params: IndexContentParams) -> ToolResult {
        info!("Indexing content from source: {}", params.source);

        let language = params
            .language
            .as_deref()
            .map(Language::from_name)
            .unwrap_or_else(|| Language::from_path(&params.source));

        match self
            .pipeline
            .index_content(&params.source, &params.content, language)
            .await
        {
            Ok(0) => ToolResult::success(format!(
                "Source '{}' produced no chunks; nothing indexed.",
                params.source
            )),
            Ok(count) => ToolResult::success(format!(
                "Successfully indexed '{}' with {} chunk(s).",
                params.source, count
            )),
            Err(e) => ToolResult::error(format!("Indexing failed: {}", e)),
        }
    }

    /// Query the index.
    pub async fn query(&self, params: QueryParams) -> ToolResult {
        info!("Querying index for: {:?}", params.query);

        let results = self
            .pipeline
            .query(&params.query, params.top_k, params.filter.as_ref())
            .await;

        match results {
            Ok(results) => {
                if results.is_empty() {
                    return ToolResult::success("No results found.");
                }

                let mut output = format!("Found {} result(s):\n\n", results.len());
                for (rank, result) in results.iter().enumerate() {
                    let source = result
                        .item
                        .chunk
                        .metadata
                        .get("source")
                        .and_then(|v| v.as_str())
                        .unwrap_or("(unknown source)");
                    output.push_str(&format!(
                        "---\n[{}] {} - {} (score: {:.3})\n",
                        rank + 1,
                        result.item.id,
                        source,
                        result.score
                    ));
                    if !result.item.chunk.content.is_empty() {
                        output.push_str(&format!("```\n{}\n```\n\n", result.item.chunk.content));
                    }
                }

                ToolResult::success(output)
            }
            Err(e) => ToolResult::error(format!("Query failed: {}", e)),
        }
    }

    /// Get index status.
    pub async fn status(&self) -> ToolResult {
        match self.pipeline.manager().get_status().await {
            Ok(status) => ToolResult::success(format!(
                "Index '{}' holds {} item(s).",
                status.name, status.count
            )),
            Err(e) => ToolResult::error(format!("Failed to get status: {}", e)),
        }
    }

    /// Delete every chunk of one source.
    pub async fn delete_source(&self, params: DeleteSourceParams) -> ToolResult {
        info!("Deleting chunks of source: {}", params.source);

        match self.pipeline.remove_source(&params.source).await {
            Ok(()) => ToolResult::success(format!("Deleted chunks of source '{}'.", params.source)),
            Err(e) => ToolResult::error(format!("Delete failed: {}", e)),
        }
    }

    /// List all indexed chunk ids.
    pub async fn list_ids(&self) -> ToolResult {
        match self.pipeline.manager().get_all_ids().await {
            Ok(ids) => {
                if ids.is_empty() {
                    return ToolResult::success("The index is empty.");
                }
                let mut sorted = ids;
                sorted.sort();
                ToolResult::success(format!(
                    "{} id(s):\n{}",
                    sorted.len(),
                    sorted.join("\n")
                ))
            }
            Err(e) => ToolResult::error(format!("Failed to list ids: {}", e)),
        }
    }
}

/// Server info.
#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

/// Tool info.
#[derive(Debug, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn server() -> IndexToolServer {
        IndexToolServer::create(VectorDbConfig::InMemory)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_server_creation() {
        let _server = server().await;
        let info = IndexToolServer::info();
        assert_eq!(info.name, "vindex");
    }

    #[tokio::test]
    async fn test_tools_list() {
        let tools = IndexToolServer::tools();
        assert!(!tools.is_empty());
        assert!(tools.iter().any(|t| t.name == "index_query"));
        assert!(tools.iter().any(|t| t.name == "index_delete_source"));
    }

    #[tokio::test]
    async fn test_index_and_query() {
        let server = server().await;

        let result = server
            .index_content(IndexContentParams {
                source: "test.rs".to_string(),
                content: "fn main() {\n    println!(\"Hello, world!\");\n}".to_string(),
                language: None,
            })
            .await;
        assert!(result.success, "Index failed: {}", result.message);

        let result = server
            .query(QueryParams {
                query: "fn main() {\n    println!(\"Hello, world!\");\n}".to_string(),
                top_k: 5,
                filter: None,
            })
            .await;
        assert!(result.success, "Query failed: {}", result.message);
        assert!(result.message.contains("test.rs"));
    }

    #[tokio::test]
    async fn test_query_with_filter() {
        let server = server().await;

        server
            .index_content(IndexContentParams {
                source: "a.rs".to_string(),
                content: "fn a() {}".to_string(),
                language: None,
            })
            .await;
        server
            .index_content(IndexContentParams {
                source: "b.rs".to_string(),
                content: "fn b() {}".to_string(),
                language: None,
            })
            .await;

        let mut filter = Filter::new();
        filter.insert("source".to_string(), json!("a.rs"));
        let result = server
            .query(QueryParams {
                query: "anything".to_string(),
                top_k: 5,
                filter: Some(filter),
            })
            .await;
        assert!(result.success);
        assert!(result.message.contains("a.rs"));
        assert!(!result.message.contains("b.rs-chunk"));
    }

    #[tokio::test]
    async fn test_status() {
        let server = server().await;

        let result = server.status().await;
        assert!(result.success);
        assert!(result.message.contains("0 item(s)"));
    }

    #[tokio::test]
    async fn test_delete_source_and_list_ids() {
        let server = server().await;

        server
            .index_content(IndexContentParams {
                source: "a.rs".to_string(),
                content: "fn a() {}".to_string(),
                language: Some("rust".to_string()),
            })
            .await;

        let result = server.list_ids().await;
        assert!(result.success);
        assert!(result.message.contains("a.rs-chunk-0"));

        let result = server
            .delete_source(DeleteSourceParams {
                source: "a.rs".to_string(),
            })
            .await;
        assert!(result.success);

        let result = server.list_ids().await;
        assert!(result.message.contains("empty"));
    }

    #[tokio::test]
    async fn test_query_params_default_top_k() {
        let params: QueryParams = serde_json::from_value(json!({ "query": "hello" })).unwrap();
        assert_eq!(params.top_k, 5);
        assert!(params.filter.is_none());
    }
}
