//! vindex-store - Vector store backends behind one dispatch layer
//!
//! This crate provides the three backend adapters (in-memory, Pinecone,
//! ChromaDB) and the [`IndexManager`] that presents one backend-agnostic
//! interface over them.

mod chroma;
mod manager;
mod memory;
mod pinecone;

pub use chroma::{filter_to_where, ChromaBackend};
pub use manager::IndexManager;
pub use memory::{matches_filter, MemoryBackend, MEMORY_INDEX_NAME};
pub use pinecone::PineconeBackend;
