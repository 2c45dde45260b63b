//! Vector index contract

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::types::{IndexPoint, PointPayload, ScoredPoint};

/// Exact-match payload filter for searches and deletes
#[derive(Debug, Clone, Default)]
pub struct IndexFilter {
    pub doc_id: Option<Uuid>,
}

impl IndexFilter {
    /// Filter to a single document's points
    pub fn doc(doc_id: Uuid) -> Self {
        Self {
            doc_id: Some(doc_id),
        }
    }

    /// Whether a payload passes this filter
    pub fn matches(&self, payload: &PointPayload) -> bool {
        match self.doc_id {
            Some(id) => payload.doc_id == id,
            None => true,
        }
    }
}

/// Collection-level counters
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct CollectionInfo {
    pub points_count: usize,
}

/// Stores and retrieves passage vectors with metadata filters
///
/// Upserts must be idempotent by point id; deletes match payload fields
/// exactly. Failures surface as `Error::Upstream`.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create the collection if it does not exist yet
    async fn ensure_collection(&self, dimensions: usize) -> Result<()>;

    /// Approximate nearest-neighbor search, descending similarity
    async fn search(
        &self,
        vector: &[f32],
        limit: usize,
        score_threshold: f32,
        filter: Option<&IndexFilter>,
    ) -> Result<Vec<ScoredPoint>>;

    /// Insert or replace points by id
    async fn upsert(&self, points: Vec<IndexPoint>) -> Result<()>;

    /// Remove every point belonging to a document
    async fn delete_by_doc(&self, doc_id: &Uuid) -> Result<()>;

    /// Collection counters
    async fn collection_info(&self) -> Result<CollectionInfo>;

    /// Index name for logging
    fn name(&self) -> &str;
}
