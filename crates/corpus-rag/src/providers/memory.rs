//! In-memory vector index
//!
//! Brute-force cosine similarity over all stored points. Used by tests and
//! by embedded deployments that do not run an external index.

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::Result;
use crate::retrieval::cosine_similarity;
use crate::types::{IndexPoint, ScoredPoint};

use super::index::{CollectionInfo, IndexFilter, VectorIndex};

/// Vector index held entirely in process memory
pub struct MemoryIndex {
    points: DashMap<Uuid, IndexPoint>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self {
            points: DashMap::new(),
        }
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn ensure_collection(&self, _dimensions: usize) -> Result<()> {
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        limit: usize,
        score_threshold: f32,
        filter: Option<&IndexFilter>,
    ) -> Result<Vec<ScoredPoint>> {
        let mut hits: Vec<ScoredPoint> = self
            .points
            .iter()
            .filter(|entry| filter.map_or(true, |f| f.matches(&entry.payload)))
            .filter_map(|entry| {
                let score = cosine_similarity(vector, &entry.vector);
                if score >= score_threshold {
                    Some(ScoredPoint {
                        id: entry.id,
                        score,
                        payload: entry.payload.clone(),
                        vector: Some(entry.vector.clone()),
                        rerank_score: None,
                    })
                } else {
                    None
                }
            })
            .collect();

        // Descending score; chunk_id tiebreak keeps results deterministic
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.payload.chunk_id.cmp(&b.payload.chunk_id))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn upsert(&self, points: Vec<IndexPoint>) -> Result<()> {
        for point in points {
            self.points.insert(point.id, point);
        }
        Ok(())
    }

    async fn delete_by_doc(&self, doc_id: &Uuid) -> Result<()> {
        self.points.retain(|_, p| p.payload.doc_id != *doc_id);
        Ok(())
    }

    async fn collection_info(&self) -> Result<CollectionInfo> {
        Ok(CollectionInfo {
            points_count: self.points.len(),
        })
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn point(doc_id: Uuid, chunk_id: &str, vector: Vec<f32>) -> IndexPoint {
        IndexPoint {
            id: Uuid::new_v4(),
            vector,
            payload: crate::types::PointPayload {
                doc_id,
                chunk_id: chunk_id.to_string(),
                source: "upload".to_string(),
                title: "doc.pdf".to_string(),
                page: 1,
                text: "text".to_string(),
                mime: "application/pdf".to_string(),
                updated_at: Utc::now(),
            },
        }
    }

    #[tokio::test]
    async fn search_orders_by_similarity_and_honors_threshold() {
        let index = MemoryIndex::new();
        let doc = Uuid::new_v4();
        index
            .upsert(vec![
                point(doc, "a", vec![1.0, 0.0]),
                point(doc, "b", vec![0.7, 0.7]),
                point(doc, "c", vec![0.0, 1.0]),
            ])
            .await
            .expect("upsert");

        let hits = index
            .search(&[1.0, 0.0], 10, 0.5, None)
            .await
            .expect("search");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].payload.chunk_id, "a");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn upsert_is_idempotent_by_id() {
        let index = MemoryIndex::new();
        let doc = Uuid::new_v4();
        let p = point(doc, "a", vec![1.0, 0.0]);
        index.upsert(vec![p.clone()]).await.expect("upsert");
        index.upsert(vec![p]).await.expect("upsert again");
        assert_eq!(index.collection_info().await.expect("info").points_count, 1);
    }

    #[tokio::test]
    async fn search_with_doc_filter_restricts_results() {
        let index = MemoryIndex::new();
        let wanted = Uuid::new_v4();
        let other = Uuid::new_v4();
        index
            .upsert(vec![
                point(wanted, "a", vec![1.0, 0.0]),
                point(other, "b", vec![1.0, 0.0]),
            ])
            .await
            .expect("upsert");

        let filter = IndexFilter::doc(wanted);
        let hits = index
            .search(&[1.0, 0.0], 10, 0.0, Some(&filter))
            .await
            .expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].payload.doc_id, wanted);
    }

    #[tokio::test]
    async fn delete_by_doc_removes_only_that_document() {
        let index = MemoryIndex::new();
        let keep = Uuid::new_v4();
        let remove = Uuid::new_v4();
        index
            .upsert(vec![
                point(keep, "a", vec![1.0, 0.0]),
                point(remove, "b", vec![0.0, 1.0]),
                point(remove, "c", vec![0.5, 0.5]),
            ])
            .await
            .expect("upsert");

        index.delete_by_doc(&remove).await.expect("delete");
        let info = index.collection_info().await.expect("info");
        assert_eq!(info.points_count, 1);

        let hits = index.search(&[1.0, 0.0], 10, 0.0, None).await.expect("search");
        assert_eq!(hits[0].payload.doc_id, keep);
    }
}
