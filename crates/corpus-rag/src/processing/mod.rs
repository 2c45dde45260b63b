//! Asynchronous ingestion pipeline: staged queues, workers, and the
//! indexing service

mod indexer;
mod queue;
mod worker;

pub use indexer::{Indexer, IndexingStats, IngestReceipt};
pub use queue::{
    DocStage, EmbedJob, FailedJob, Job, JobPayload, JobQueue, ParseJob, QueueStats, RetryPolicy,
    Stage, StageReceivers, StageStats, UpsertJob,
};
pub use worker::{IngestContext, IngestWorkers};
