//! Similarity search against the vector index

use std::sync::Arc;
use std::time::Instant;

use crate::error::Result;
use crate::providers::{IndexFilter, VectorIndex};
use crate::types::ScoredPoint;

/// Issues similarity searches for a query vector
///
/// Index failures surface unchanged as `Error::Upstream`; the caller
/// decides whether to degrade to an empty-context answer.
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
}

impl Retriever {
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self { index }
    }

    /// Retrieve up to `limit` candidates above `score_threshold`,
    /// ordered by descending similarity
    pub async fn retrieve(
        &self,
        query_vector: &[f32],
        limit: usize,
        score_threshold: f32,
        filter: Option<&IndexFilter>,
    ) -> Result<Vec<ScoredPoint>> {
        let start = Instant::now();
        let results = self
            .index
            .search(query_vector, limit, score_threshold, filter)
            .await?;
        tracing::debug!(
            "Retrieved {} candidates in {:.3}s",
            results.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(results)
    }
}
