//! Second-pass relevance scoring with cache and graceful fallback

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::{keys, CacheStore};
use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::types::ScoredPoint;

use super::mmr::cosine_similarity;

/// Re-scores a small candidate pool against the query
///
/// Reranking failure must never fail the overall request: any provider
/// error is caught and replaced by the original similarity ordering.
pub struct Reranker {
    provider: Arc<dyn EmbeddingProvider>,
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
    version: String,
}

impl Reranker {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        cache: Arc<dyn CacheStore>,
        ttl: Duration,
        version: String,
    ) -> Self {
        Self {
            provider,
            cache,
            ttl,
            version,
        }
    }

    /// Rank candidates, returning the top `top_k`
    ///
    /// Inputs no larger than `top_k` are returned unchanged without
    /// touching the provider.
    pub async fn rank_documents(
        &self,
        query: &str,
        candidates: Vec<ScoredPoint>,
        top_k: usize,
    ) -> Vec<ScoredPoint> {
        if candidates.len() <= top_k {
            return candidates;
        }

        let pool_size = candidates.len();
        match self.rerank(query, &candidates, top_k, pool_size).await {
            Ok(ranked) => ranked,
            Err(e) => {
                tracing::warn!("Reranking failed, falling back to retrieval order: {}", e);
                Self::fallback(candidates, top_k)
            }
        }
    }

    async fn rerank(
        &self,
        query: &str,
        candidates: &[ScoredPoint],
        top_k: usize,
        pool_size: usize,
    ) -> Result<Vec<ScoredPoint>> {
        let start = Instant::now();
        let key = keys::rerank(query, pool_size, top_k, &self.version);

        if let Some(cached) = self.cache.get(&key).await {
            if let Ok(ranked) = serde_json::from_str::<Vec<ScoredPoint>>(&cached) {
                tracing::debug!("Rerank cache hit");
                return Ok(ranked);
            }
        }

        let query_vector = self
            .provider
            .embed(query)
            .await
            .map_err(|e| Error::Rerank(e.to_string()))?;

        let texts: Vec<String> = candidates.iter().map(|c| c.payload.text.clone()).collect();
        let doc_vectors = self
            .provider
            .embed_batch(&texts)
            .await
            .map_err(|e| Error::Rerank(e.to_string()))?;

        if doc_vectors.len() != candidates.len() {
            return Err(Error::Rerank(format!(
                "scoring returned {} vectors for {} candidates",
                doc_vectors.len(),
                candidates.len()
            )));
        }

        let mut scored: Vec<ScoredPoint> = candidates
            .iter()
            .cloned()
            .zip(doc_vectors)
            .map(|(mut candidate, vector)| {
                candidate.rerank_score = Some(cosine_similarity(&query_vector, &vector));
                candidate
            })
            .collect();

        // Stable sort keeps original relative order on ties
        scored.sort_by(|a, b| {
            b.rerank_score
                .partial_cmp(&a.rerank_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);

        if let Ok(json) = serde_json::to_string(&scored) {
            self.cache.set(&key, json, self.ttl).await;
        }

        tracing::info!(
            "Reranked {} candidates to top {} in {:.3}s",
            pool_size,
            top_k,
            start.elapsed().as_secs_f64()
        );
        Ok(scored)
    }

    /// Original top-K ordered by the pre-existing similarity score
    fn fallback(mut candidates: Vec<ScoredPoint>, top_k: usize) -> Vec<ScoredPoint> {
        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(top_k);
        candidates
    }
}
