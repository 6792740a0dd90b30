//! Capability traits consumed by the index layer.
//!
//! Both capabilities are supplied by the host application; the core only
//! consumes their output shapes.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Chunk, Language};

/// Text embedding capability: one vector per input text, same order.
#[async_trait]
pub trait EmbeddingFunction: Send + Sync {
    /// Embed a batch of texts.
    async fn generate(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Dimensionality of the produced vectors.
    fn dimension(&self) -> usize;
}

/// Chunking capability: split raw content into labeled text chunks.
#[async_trait]
pub trait Chunker: Send + Sync {
    /// Chunk content into pieces, guided by the source language.
    async fn chunk(&self, content: &str, language: Language) -> Result<Vec<Chunk>>;
}
