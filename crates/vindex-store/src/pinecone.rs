//! Thin adapter around the Pinecone REST API.
//!
//! Concentrates all Pinecone interactions behind a minimal API so the rest
//! of the crate never sees the service's request shapes or its `$eq` filter
//! vocabulary.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use vindex_core::{
    Chunk, Filter, IndexError, IndexStatus, IndexedItem, Metadata, QueryResult, Result,
};

const CONTROL_PLANE_URL: &str = "https://api.pinecone.io";

/// Remote API limit on vectors per upsert call.
const UPSERT_BATCH_SIZE: usize = 100;

/// Remote API limit on ids per delete call.
const DELETE_BATCH_SIZE: usize = 1000;

/// Page size for the id-listing endpoint.
const LIST_PAGE_SIZE: u32 = 100;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Adapter for a namespace-scoped Pinecone index.
///
/// Construction performs no remote calls; the data-plane host is resolved
/// through the control plane on first operation and cached for the adapter's
/// lifetime. Index existence is verified lazily by the remote service's own
/// error responses.
pub struct PineconeBackend {
    client: Client,
    api_key: String,
    index_name: String,
    namespace: String,
    host: OnceCell<String>,
}

#[derive(Serialize)]
struct VectorPayload<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: &'a Metadata,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<VectorPayload<'a>>,
    namespace: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    namespace: &'a str,
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Value>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Metadata>,
}

#[derive(Serialize)]
struct DeleteRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    ids: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Value>,
    namespace: &'a str,
}

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    vectors: Vec<ListVector>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Deserialize)]
struct ListVector {
    id: String,
}

#[derive(Deserialize)]
struct Pagination {
    #[serde(default)]
    next: Option<String>,
}

#[derive(Deserialize)]
struct StatsResponse {
    #[serde(default)]
    namespaces: HashMap<String, NamespaceStats>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceStats {
    #[serde(default)]
    vector_count: u64,
}

#[derive(Deserialize)]
struct DescribeIndexResponse {
    host: String,
}

impl PineconeBackend {
    /// Create an adapter bound to the named index and namespace.
    pub fn new(api_key: &str, index_name: &str, namespace: Option<&str>) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(IndexError::config("Pinecone requires a non-empty api_key"));
        }
        if index_name.trim().is_empty() {
            return Err(IndexError::config(
                "Pinecone requires a non-empty index_name",
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                IndexError::initialization(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            index_name: index_name.to_string(),
            namespace: namespace.unwrap_or_default().to_string(),
            host: OnceCell::new(),
        })
    }

    /// Filtered delete support is plan-dependent on Pinecone; the manager
    /// downgrades failures on this path to a warning.
    pub fn supports_filtered_delete(&self) -> bool {
        false
    }

    /// Index name, with the namespace bracketed when non-default.
    pub fn display_name(&self) -> String {
        if self.namespace.is_empty() {
            self.index_name.clone()
        } else {
            format!("{} [{}]", self.index_name, self.namespace)
        }
    }

    /// Resolve and cache the data-plane host for the bound index.
    async fn host(&self) -> Result<&str> {
        self.host
            .get_or_try_init(|| async {
                let url = format!("{}/indexes/{}", CONTROL_PLANE_URL, self.index_name);
                debug!("Resolving Pinecone host for index '{}'", self.index_name);

                let response = self
                    .client
                    .get(&url)
                    .header("Api-Key", &self.api_key)
                    .send()
                    .await
                    .map_err(|e| {
                        IndexError::backend(format!("Pinecone describe request failed: {}", e))
                    })?;
                let response = check_status(response, "Pinecone describe index").await?;

                let described: DescribeIndexResponse = response.json().await.map_err(|e| {
                    IndexError::backend(format!("Failed to parse Pinecone describe response: {}", e))
                })?;

                Ok(format!("https://{}", described.host))
            })
            .await
            .map(String::as_str)
    }

    /// Upsert items in batches of 100, passing metadata through as-is.
    pub async fn upsert(&self, items: &[IndexedItem]) -> Result<()> {
        let host = self.host().await?;

        for batch in items.chunks(UPSERT_BATCH_SIZE) {
            let request = UpsertRequest {
                vectors: batch
                    .iter()
                    .map(|item| VectorPayload {
                        id: &item.id,
                        values: &item.vector,
                        metadata: &item.chunk.metadata,
                    })
                    .collect(),
                namespace: &self.namespace,
            };

            let response = self
                .client
                .post(format!("{}/vectors/upsert", host))
                .header("Api-Key", &self.api_key)
                .json(&request)
                .send()
                .await
                .map_err(|e| IndexError::backend(format!("Pinecone upsert request failed: {}", e)))?;
            check_status(response, "Pinecone upsert").await?;

            debug!("Upserted batch of {} vector(s) to '{}'", batch.len(), self.index_name);
        }

        info!("Upserted {} vector(s) to Pinecone index '{}'", items.len(), self.index_name);
        Ok(())
    }

    /// Query the namespace. The remote API does not return vectors or raw
    /// content, so result items carry empty content and an empty vector;
    /// the score is the remote's own similarity metric, passed through.
    pub async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<QueryResult>> {
        let host = self.host().await?;

        let request = QueryRequest {
            vector,
            top_k,
            namespace: &self.namespace,
            include_metadata: true,
            filter: filter.map(eq_filter),
        };

        let response = self
            .client
            .post(format!("{}/query", host))
            .header("Api-Key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| IndexError::backend(format!("Pinecone query request failed: {}", e)))?;
        let response = check_status(response, "Pinecone query").await?;

        let parsed: QueryResponse = response.json().await.map_err(|e| {
            IndexError::backend(format!("Failed to parse Pinecone query response: {}", e))
        })?;

        Ok(parsed
            .matches
            .into_iter()
            .map(|m| QueryResult {
                item: IndexedItem {
                    id: m.id,
                    vector: Vec::new(),
                    chunk: Chunk {
                        content: String::new(),
                        metadata: m.metadata.unwrap_or_default(),
                    },
                },
                score: m.score,
            })
            .collect())
    }

    /// Delete by id in batches of 1000.
    pub async fn delete(&self, ids: &[String]) -> Result<()> {
        let host = self.host().await?;

        for batch in ids.chunks(DELETE_BATCH_SIZE) {
            let request = DeleteRequest {
                ids: Some(batch),
                filter: None,
                namespace: &self.namespace,
            };

            let response = self
                .client
                .post(format!("{}/vectors/delete", host))
                .header("Api-Key", &self.api_key)
                .json(&request)
                .send()
                .await
                .map_err(|e| IndexError::backend(format!("Pinecone delete request failed: {}", e)))?;
            check_status(response, "Pinecone delete").await?;
        }

        Ok(())
    }

    /// Delete everything matching the filter via the native filtered-delete
    /// API. Not supported on all plans; callers decide how to treat failure.
    pub async fn delete_where(&self, filter: &Filter) -> Result<()> {
        let host = self.host().await?;

        let request = DeleteRequest {
            ids: None,
            filter: Some(eq_filter(filter)),
            namespace: &self.namespace,
        };

        let response = self
            .client
            .post(format!("{}/vectors/delete", host))
            .header("Api-Key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                IndexError::backend(format!("Pinecone filtered delete request failed: {}", e))
            })?;
        check_status(response, "Pinecone filtered delete").await?;

        Ok(())
    }

    /// All ids in the namespace, accumulated across list pages by following
    /// the continuation token until the service reports no further page.
    pub async fn all_ids(&self) -> Result<Vec<String>> {
        let host = self.host().await?;
        let url = format!("{}/vectors/list", host);

        let mut ids = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(&url)
                .header("Api-Key", &self.api_key)
                .query(&[("namespace", self.namespace.as_str())])
                .query(&[("limit", LIST_PAGE_SIZE)]);
            if let Some(t) = &token {
                request = request.query(&[("paginationToken", t.as_str())]);
            }

            let response = request.send().await.map_err(|e| {
                IndexError::backend(format!("Pinecone list request failed: {}", e))
            })?;
            let response = check_status(response, "Pinecone list").await?;

            let page: ListResponse = response.json().await.map_err(|e| {
                IndexError::backend(format!("Failed to parse Pinecone list response: {}", e))
            })?;

            ids.extend(page.vectors.into_iter().map(|v| v.id));

            token = page.pagination.and_then(|p| p.next);
            if token.is_none() {
                break;
            }
        }

        debug!("Listed {} id(s) from Pinecone index '{}'", ids.len(), self.index_name);
        Ok(ids)
    }

    /// Per-namespace record count from index stats.
    pub async fn status(&self) -> Result<IndexStatus> {
        let host = self.host().await?;

        let response = self
            .client
            .post(format!("{}/describe_index_stats", host))
            .header("Api-Key", &self.api_key)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| IndexError::backend(format!("Pinecone stats request failed: {}", e)))?;
        let response = check_status(response, "Pinecone stats").await?;

        let stats: StatsResponse = response.json().await.map_err(|e| {
            IndexError::backend(format!("Failed to parse Pinecone stats response: {}", e))
        })?;

        let count = stats
            .namespaces
            .get(&self.namespace)
            .map(|ns| ns.vector_count)
            .unwrap_or(0);

        Ok(IndexStatus {
            count,
            name: self.display_name(),
        })
    }
}

/// Translate the flat equality filter into Pinecone's `$eq`-per-key shape.
/// Keys combine as AND, the native API's default.
fn eq_filter(filter: &Filter) -> Value {
    Value::Object(
        filter
            .iter()
            .map(|(key, value)| (key.clone(), serde_json::json!({ "$eq": value })))
            .collect(),
    )
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
