//! Process-local in-memory backend.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use vindex_core::{
    cosine_similarity, Filter, IndexError, IndexStatus, IndexedItem, QueryResult, Result,
};

/// Display name reported by [`MemoryBackend::status`].
pub const MEMORY_INDEX_NAME: &str = "in-memory";

/// Process-local associative store keyed by item id.
///
/// The store is owned by the backend instance; dropping the manager drops
/// the data. Concurrent writers race with undefined ordering of overlapping
/// upserts to the same id; last-write-wins is only well-defined for
/// sequential calls.
pub struct MemoryBackend {
    items: RwLock<HashMap<String, IndexedItem>>,
}

impl MemoryBackend {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, IndexedItem>>> {
        self.items
            .read()
            .map_err(|e| IndexError::backend(format!("in-memory store lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, IndexedItem>>> {
        self.items
            .write()
            .map_err(|e| IndexError::backend(format!("in-memory store lock poisoned: {}", e)))
    }

    /// Store each item by id, unconditionally overwriting existing entries.
    pub fn upsert(&self, items: &[IndexedItem]) -> Result<()> {
        let mut store = self.write()?;
        for item in items {
            store.insert(item.id.clone(), item.clone());
        }
        debug!("Upserted {} item(s), store size is now {}", items.len(), store.len());
        Ok(())
    }

    /// Linear scan: filter, score by cosine similarity, sort descending,
    /// truncate to `top_k`. Returns full stored items.
    pub fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<QueryResult>> {
        let store = self.read()?;

        let mut results: Vec<QueryResult> = store
            .values()
            .filter(|item| filter.map_or(true, |f| matches_filter(item, f)))
            .map(|item| QueryResult {
                score: cosine_similarity(vector, &item.vector),
                item: item.clone(),
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);

        Ok(results)
    }

    /// Delete by exact id match. Absent ids are ignored.
    pub fn delete(&self, ids: &[String]) -> Result<()> {
        let mut store = self.write()?;
        for id in ids {
            store.remove(id);
        }
        Ok(())
    }

    /// Collect the ids of all items matching the filter.
    pub fn matching_ids(&self, filter: &Filter) -> Result<Vec<String>> {
        let store = self.read()?;
        Ok(store
            .values()
            .filter(|item| matches_filter(item, filter))
            .map(|item| item.id.clone())
            .collect())
    }

    /// All stored ids.
    pub fn all_ids(&self) -> Result<Vec<String>> {
        Ok(self.read()?.keys().cloned().collect())
    }

    /// Item count plus the fixed sentinel name.
    pub fn status(&self) -> Result<IndexStatus> {
        Ok(IndexStatus {
            count: self.read()?.len() as u64,
            name: MEMORY_INDEX_NAME.to_string(),
        })
    }

    /// Remove everything. For test harnesses.
    pub fn clear(&self) -> Result<()> {
        self.write()?.clear();
        Ok(())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// True iff every filter key/value pair matches either a top-level item
/// field (`id`) or a metadata entry, by exact equality.
///
/// A key missing from the item never matches, so absent metadata cannot
/// spuriously equal a filter value.
pub fn matches_filter(item: &IndexedItem, filter: &Filter) -> bool {
    filter.iter().all(|(key, expected)| {
        if key == "id" {
            return expected.as_str().is_some_and(|s| s == item.id);
        }
        match item.chunk.metadata.get(key) {
            Some(actual) => actual == expected,
            None => false,
        }
    })
}
