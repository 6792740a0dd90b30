//! vindex-pipeline - Indexing and query orchestration
//!
//! This crate turns raw content into indexed items: chunk, embed, build
//! `{source}-chunk-{index}` ids, and upsert through the index manager. The
//! query path embeds the query text and delegates to the manager.

mod chunk;
mod embed;
mod indexer;

pub use chunk::TextChunker;
pub use embed::MockEmbedder;
pub use indexer::IndexingPipeline;
