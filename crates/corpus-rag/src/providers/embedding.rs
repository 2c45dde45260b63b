//! Embedding provider contract

use async_trait::async_trait;

use crate::error::Result;

/// Converts text to fixed-length vectors
///
/// Implementations surface provider failures as `Error::Upstream` (or
/// `Error::Timeout`) and never retry internally; retries belong to the
/// ingestion queue.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed multiple texts, preserving input order
    ///
    /// The default calls `embed` sequentially; implementations with a
    /// native batch endpoint should override it.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Vector dimensionality produced by this provider
    fn dimensions(&self) -> usize;

    /// Provider name for logging
    fn name(&self) -> &str;
}
