//! Indexing service: the operations exposed upward by the ingestion
//! pipeline

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::cache::CacheStore;
use crate::error::{Error, Result};
use crate::providers::VectorIndex;

use super::queue::{DocStage, FailedJob, Job, JobPayload, JobQueue, ParseJob, QueueStats};

/// Acknowledgement returned by the ingestion-trigger operations
#[derive(Debug, Clone, Serialize)]
pub struct IngestReceipt {
    pub doc_id: Uuid,
    pub queued: bool,
}

/// Combined queue and collection counters
#[derive(Debug, Clone, Serialize)]
pub struct IndexingStats {
    pub queues: QueueStats,
    pub points_count: usize,
}

/// Queues documents for (re)indexing and reports pipeline state
pub struct Indexer {
    queue: JobQueue,
    index: Arc<dyn VectorIndex>,
    cache: Arc<dyn CacheStore>,
}

impl Indexer {
    pub fn new(queue: JobQueue, index: Arc<dyn VectorIndex>, cache: Arc<dyn CacheStore>) -> Self {
        Self {
            queue,
            index,
            cache,
        }
    }

    /// Queue a new document for indexing
    pub async fn index_document(&self, filename: &str, data: Vec<u8>) -> Result<IngestReceipt> {
        Self::validate(filename, &data)?;
        let doc_id = Uuid::new_v4();
        self.enqueue_parse(doc_id, filename, data).await?;
        tracing::info!("Document {} queued for indexing with id {}", filename, doc_id);
        Ok(IngestReceipt {
            doc_id,
            queued: true,
        })
    }

    /// Re-index an existing document under its original id
    ///
    /// All prior points for the id are deleted before parsing restarts, so
    /// no stale points survive; citations and cache keys stay stable
    /// because the id is reused. Ranking caches are flushed since their
    /// entries may cite the old text.
    pub async fn reindex_document(
        &self,
        doc_id: Uuid,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<IngestReceipt> {
        Self::validate(filename, &data)?;
        self.index.delete_by_doc(&doc_id).await?;
        self.cache.delete_by_pattern("rrk:").await;
        self.cache.delete_by_pattern("ans:").await;
        tracing::info!("Deleted existing points for document {}", doc_id);

        self.enqueue_parse(doc_id, filename, data).await?;
        tracing::info!("Document {} queued for reindexing with id {}", filename, doc_id);
        Ok(IngestReceipt {
            doc_id,
            queued: true,
        })
    }

    /// Remove a document's points and flush ranking caches
    pub async fn delete_document(&self, doc_id: Uuid) -> Result<()> {
        self.index.delete_by_doc(&doc_id).await?;
        self.cache.delete_by_pattern("rrk:").await;
        self.cache.delete_by_pattern("ans:").await;
        tracing::info!("Deleted document {}", doc_id);
        Ok(())
    }

    async fn enqueue_parse(&self, doc_id: Uuid, filename: &str, data: Vec<u8>) -> Result<()> {
        self.queue
            .enqueue(Job::new(
                doc_id,
                JobPayload::Parse(ParseJob {
                    filename: filename.to_string(),
                    data,
                }),
            ))
            .await
    }

    fn validate(filename: &str, data: &[u8]) -> Result<()> {
        if filename.trim().is_empty() {
            return Err(Error::validation("filename must not be empty"));
        }
        if data.is_empty() {
            return Err(Error::validation("file data must not be empty"));
        }
        Ok(())
    }

    /// Current pipeline state of a document
    pub fn status(&self, doc_id: &Uuid) -> Option<DocStage> {
        self.queue.status(doc_id)
    }

    /// Block until the document's pipeline reaches a terminal state
    pub async fn await_terminal(&self, doc_id: Uuid, timeout: Duration) -> Option<DocStage> {
        self.queue.await_terminal(doc_id, timeout).await
    }

    /// Dead-lettered jobs
    pub fn failed_jobs(&self) -> Vec<FailedJob> {
        self.queue.failed_jobs()
    }

    /// Queue counters plus the collection point count
    pub async fn stats(&self) -> Result<IndexingStats> {
        let info = self.index.collection_info().await?;
        Ok(IndexingStats {
            queues: self.queue.stats(),
            points_count: info.points_count,
        })
    }
}
