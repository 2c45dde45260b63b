//! Embedding with a content-addressed cache in front of the provider

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{keys, CacheStore};
use crate::config::EmbeddingConfig;
use crate::error::Result;
use crate::providers::EmbeddingProvider;
use crate::types::{Chunk, EmbeddedChunk};

/// Cache hit/miss counters
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct EmbedderMetrics {
    pub cache_hits: u64,
    pub cache_misses: u64,
}

/// Embedder with memoization and rate-limit aware batching
///
/// Provider failures surface unchanged; retrying is the ingestion queue's
/// responsibility, not the embedder's.
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    cache: Arc<dyn CacheStore>,
    model: String,
    batch_size: usize,
    batch_delay: Duration,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Embedder {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        cache: Arc<dyn CacheStore>,
        config: &EmbeddingConfig,
        ttl: Duration,
    ) -> Self {
        Self {
            provider,
            cache,
            model: config.model.clone(),
            batch_size: config.batch_size.max(1),
            batch_delay: config.batch_delay(),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// The underlying provider, for callers that score directly
    pub fn provider(&self) -> Arc<dyn EmbeddingProvider> {
        Arc::clone(&self.provider)
    }

    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    /// Embed a single text, consulting the cache first
    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let key = keys::embedding(&self.model, text);

        if let Some(cached) = self.cache.get(&key).await {
            if let Ok(vector) = serde_json::from_str::<Vec<f32>>(&cached) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Embedding cache hit");
                return Ok(vector);
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let vector = self.provider.embed(text).await?;
        self.cache
            .set(&key, serde_json::to_string(&vector)?, self.ttl)
            .await;
        Ok(vector)
    }

    /// Embed many texts, preserving input order
    ///
    /// Splits into sub-batches of the configured size, processed
    /// sequentially with a small delay between them; texts within a
    /// sub-batch run concurrently. A failure in any sub-batch fails the
    /// whole call.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());

        for (batch_num, batch) in texts.chunks(self.batch_size).enumerate() {
            if batch_num > 0 && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }

            let futures: Vec<_> = batch.iter().map(|text| self.embed_text(text)).collect();
            let batch_vectors = futures::future::try_join_all(futures).await?;
            embeddings.extend(batch_vectors);
        }

        Ok(embeddings)
    }

    /// Embed a query string
    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        tracing::debug!("Embedding query ({} chars)", query.chars().count());
        self.embed_text(query).await
    }

    /// Embed a document's chunks, pairing each with its vector
    pub async fn embed_chunks(&self, chunks: Vec<Chunk>) -> Result<Vec<EmbeddedChunk>> {
        tracing::info!("Embedding {} chunks", chunks.len());
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embed_batch(&texts).await?;
        Ok(chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| EmbeddedChunk { chunk, vector })
            .collect())
    }

    pub fn metrics(&self) -> EmbedderMetrics {
        EmbedderMetrics {
            cache_hits: self.hits.load(Ordering::Relaxed),
            cache_misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
