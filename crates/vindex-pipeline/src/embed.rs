//! Deterministic mock embedding function.

use async_trait::async_trait;

use vindex_core::{EmbeddingFunction, Result};

/// Mock embedder producing deterministic, L2-normalized vectors from a text
/// hash. The same text always maps to the same vector, which makes it the
/// test workhorse and the default when no real embedding service is wired.
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    /// Create a mock embedder with the default dimension.
    pub fn new() -> Self {
        Self { dimension: 384 }
    }

    /// Create a mock embedder with a custom dimension.
    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingFunction for MockEmbedder {
    async fn generate(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let hash = text
                    .bytes()
                    .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
                let mut vector = vec![0.0f32; self.dimension];
                for (i, v) in vector.iter_mut().enumerate() {
                    *v = ((hash.wrapping_mul(i as u64 + 1)) as f32 % 1000.0) / 1000.0 - 0.5;
                }
                // L2 normalize
                let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm > 0.0 {
                    for x in &mut vector {
                        *x /= norm;
                    }
                }
                vector
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_embedder_shape_and_normalization() {
        let embedder = MockEmbedder::new();
        assert_eq!(embedder.dimension(), 384);

        let vectors = embedder
            .generate(&["Hello world", "Rust is great"])
            .await
            .unwrap();

        assert_eq!(vectors.len(), 2);
        for vector in &vectors {
            assert_eq!(vector.len(), 384);
            let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 0.01);
        }
    }

    #[tokio::test]
    async fn test_mock_embedder_is_deterministic() {
        let embedder = MockEmbedder::with_dimension(16);
        let a = embedder.generate(&["same text"]).await.unwrap();
        let b = embedder.generate(&["same text"]).await.unwrap();
        assert_eq!(a, b);

        let c = embedder.generate(&["different text"]).await.unwrap();
        assert_ne!(a, c);
    }
}
