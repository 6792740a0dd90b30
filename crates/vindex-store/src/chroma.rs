//! Thin adapter around the ChromaDB REST API.
//!
//! Binds to one collection via get-or-create at construction time and keeps
//! the native `where`-clause vocabulary behind [`filter_to_where`].

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use vindex_core::{
    Chunk, EmbeddingFunction, Filter, IndexError, IndexStatus, IndexedItem, Metadata, QueryResult,
    Result,
};

/// Page size for the id-listing loop.
const GET_PAGE_SIZE: usize = 1000;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Adapter for one ChromaDB collection.
///
/// The collection library requires an embedding callback even for
/// vector-only operations, so one is bound at construction; the adapter
/// itself only ever submits precomputed vectors.
pub struct ChromaBackend {
    client: Client,
    base_url: String,
    collection_id: String,
    collection_name: String,
    embedding: Arc<dyn EmbeddingFunction>,
}

#[derive(Deserialize)]
struct CollectionInfo {
    id: String,
    name: String,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    ids: Vec<&'a str>,
    embeddings: Vec<&'a [f32]>,
    metadatas: Vec<Metadata>,
    documents: Vec<&'a str>,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query_embeddings: Vec<&'a [f32]>,
    n_results: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    r#where: Option<Value>,
    include: Vec<&'static str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    /// One row per query embedding; entries at index `i` across all arrays
    /// describe the same hit.
    ids: Vec<Vec<String>>,
    #[serde(default)]
    distances: Option<Vec<Vec<f32>>>,
    #[serde(default)]
    embeddings: Option<Vec<Vec<Option<Vec<f32>>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Metadata>>>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
}

#[derive(Serialize)]
struct DeleteRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    ids: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    r#where: Option<Value>,
}

#[derive(Serialize)]
struct GetRequest {
    limit: usize,
    offset: usize,
    include: Vec<&'static str>,
}

#[derive(Deserialize)]
struct GetResponse {
    #[serde(default)]
    ids: Vec<String>,
}

impl ChromaBackend {
    /// Connect to the server and get-or-create the named collection.
    ///
    /// This call is idempotent-safe to re-run; its failure aborts manager
    /// initialization.
    pub async fn connect(
        url: &str,
        collection_name: &str,
        embedding: Arc<dyn EmbeddingFunction>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                IndexError::initialization(format!("Failed to create HTTP client: {}", e))
            })?;

        let base_url = normalize_url(url);

        let response = client
            .post(format!("{}/api/v1/collections", base_url))
            .json(&serde_json::json!({
                "name": collection_name,
                "get_or_create": true,
            }))
            .send()
            .await
            .map_err(|e| {
                IndexError::initialization(format!("ChromaDB collection request failed: {}", e))
            })?;
        let response = check_status(response, "ChromaDB get-or-create collection")
            .await
            .map_err(|e| IndexError::initialization(e.to_string()))?;

        let info: CollectionInfo = response.json().await.map_err(|e| {
            IndexError::initialization(format!("Failed to parse ChromaDB collection: {}", e))
        })?;

        info!(
            "Bound to ChromaDB collection '{}' ({}) with {}-dim embedding function",
            info.name,
            info.id,
            embedding.dimension()
        );

        Ok(Self {
            client,
            base_url,
            collection_id: info.id,
            collection_name: info.name,
            embedding,
        })
    }

    /// ChromaDB supports `where`-scoped deletes on all deployments.
    pub fn supports_filtered_delete(&self) -> bool {
        true
    }

    /// Dimensionality of the embedding function bound to the collection.
    pub fn embedding_dimension(&self) -> usize {
        self.embedding.dimension()
    }

    fn collection_url(&self, suffix: &str) -> String {
        format!(
            "{}/api/v1/collections/{}/{}",
            self.base_url, self.collection_id, suffix
        )
    }

    /// Submit the whole batch as parallel arrays aligned by index.
    ///
    /// Metadata is filtered to scalar values per item; ChromaDB rejects
    /// nested types. Callers own batch sizing.
    pub async fn upsert(&self, items: &[IndexedItem]) -> Result<()> {
        let request = UpsertRequest {
            ids: items.iter().map(|item| item.id.as_str()).collect(),
            embeddings: items.iter().map(|item| item.vector.as_slice()).collect(),
            metadatas: items
                .iter()
                .map(|item| scalar_metadata(&item.chunk.metadata))
                .collect(),
            documents: items.iter().map(|item| item.chunk.content.as_str()).collect(),
        };

        let response = self
            .client
            .post(self.collection_url("upsert"))
            .json(&request)
            .send()
            .await
            .map_err(|e| IndexError::backend(format!("ChromaDB upsert request failed: {}", e)))?;
        check_status(response, "ChromaDB upsert").await?;

        info!(
            "Upserted {} item(s) to ChromaDB collection '{}'",
            items.len(),
            self.collection_name
        );
        Ok(())
    }

    /// Query the collection; `score = 1 - distance`.
    ///
    /// The conversion assumes a distance metric bounded so that it is
    /// meaningful (cosine distance in `[0, 2]`); callers using other metrics
    /// must account for that.
    pub async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<QueryResult>> {
        let request = QueryRequest {
            query_embeddings: vec![vector],
            n_results: top_k,
            r#where: filter.and_then(filter_to_where),
            include: vec!["embeddings", "documents", "metadatas", "distances"],
        };

        let response = self
            .client
            .post(self.collection_url("query"))
            .json(&request)
            .send()
            .await
            .map_err(|e| IndexError::backend(format!("ChromaDB query request failed: {}", e)))?;
        let response = check_status(response, "ChromaDB query").await?;

        let parsed: QueryResponse = response.json().await.map_err(|e| {
            IndexError::backend(format!("Failed to parse ChromaDB query response: {}", e))
        })?;

        // One query embedding in, so each array's first row describes our
        // hits; the i-th entries across arrays belong to the same hit.
        let ids = parsed.ids.into_iter().next().unwrap_or_default();
        let distances = first_row(parsed.distances);
        let embeddings = first_row(parsed.embeddings);
        let metadatas = first_row(parsed.metadatas);
        let documents = first_row(parsed.documents);

        let mut results = Vec::with_capacity(ids.len());
        for (i, id) in ids.into_iter().enumerate() {
            let distance = distances.get(i).copied().unwrap_or(1.0);
            results.push(QueryResult {
                item: IndexedItem {
                    id,
                    vector: embeddings.get(i).cloned().flatten().unwrap_or_default(),
                    chunk: Chunk {
                        content: documents.get(i).cloned().flatten().unwrap_or_default(),
                        metadata: metadatas.get(i).cloned().flatten().unwrap_or_default(),
                    },
                },
                score: 1.0 - distance,
            });
        }

        Ok(results)
    }

    /// Delete by exact id match.
    pub async fn delete(&self, ids: &[String]) -> Result<()> {
        let request = DeleteRequest {
            ids: Some(ids),
            r#where: None,
        };

        let response = self
            .client
            .post(self.collection_url("delete"))
            .json(&request)
            .send()
            .await
            .map_err(|e| IndexError::backend(format!("ChromaDB delete request failed: {}", e)))?;
        check_status(response, "ChromaDB delete").await?;

        Ok(())
    }

    /// Delete everything matching the filter via a `where`-scoped delete.
    pub async fn delete_where(&self, filter: &Filter) -> Result<()> {
        let request = DeleteRequest {
            ids: None,
            r#where: filter_to_where(filter),
        };

        let response = self
            .client
            .post(self.collection_url("delete"))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                IndexError::backend(format!("ChromaDB filtered delete request failed: {}", e))
            })?;
        check_status(response, "ChromaDB filtered delete").await?;

        Ok(())
    }

    /// All ids in the collection, fetched as a limit/offset page loop.
    pub async fn all_ids(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut offset = 0;

        loop {
            let request = GetRequest {
                limit: GET_PAGE_SIZE,
                offset,
                include: Vec::new(),
            };

            let response = self
                .client
                .post(self.collection_url("get"))
                .json(&request)
                .send()
                .await
                .map_err(|e| IndexError::backend(format!("ChromaDB get request failed: {}", e)))?;
            let response = check_status(response, "ChromaDB get").await?;

            let page: GetResponse = response.json().await.map_err(|e| {
                IndexError::backend(format!("Failed to parse ChromaDB get response: {}", e))
            })?;

            let fetched = page.ids.len();
            ids.extend(page.ids);

            if fetched < GET_PAGE_SIZE {
                break;
            }
            offset += fetched;
        }

        debug!(
            "Listed {} id(s) from ChromaDB collection '{}'",
            ids.len(),
            self.collection_name
        );
        Ok(ids)
    }

    /// Native collection count and name.
    pub async fn status(&self) -> Result<IndexStatus> {
        let response = self
            .client
            .get(self.collection_url("count"))
            .send()
            .await
            .map_err(|e| IndexError::backend(format!("ChromaDB count request failed: {}", e)))?;
        let response = check_status(response, "ChromaDB count").await?;

        let count: u64 = response.json().await.map_err(|e| {
            IndexError::backend(format!("Failed to parse ChromaDB count response: {}", e))
        })?;

        Ok(IndexStatus {
            count,
            name: self.collection_name.clone(),
        })
    }
}

/// Translate the flat equality filter into ChromaDB's `where` clause:
/// one `{key: {"$eq": value}}` term, or `$and` over the terms when the
/// filter has several keys. Empty filters translate to no clause.
pub fn filter_to_where(filter: &Filter) -> Option<Value> {
    let mut terms: Vec<Value> = filter
        .iter()
        .map(|(key, value)| serde_json::json!({ key: { "$eq": value } }))
        .collect();

    match terms.len() {
        0 => None,
        1 => terms.pop(),
        _ => Some(serde_json::json!({ "$and": terms })),
    }
}

/// Retain only string/number/boolean metadata values.
fn scalar_metadata(metadata: &Metadata) -> Metadata {
    metadata
        .iter()
        .filter(|(_, value)| {
            matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn normalize_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

fn first_row<T>(rows: Option<Vec<Vec<T>>>) -> Vec<T> {
    rows.and_then(|mut r| {
        if r.is_empty() {
            None
        } else {
            Some(r.swap_remove(0))
        }
    })
    .unwrap_or_default()
}

async fn check_status(response: reqwest::Response, context: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    Err(IndexError::backend(format!(
        "{} failed ({}): {}",
        context, status, body
    )))
}
