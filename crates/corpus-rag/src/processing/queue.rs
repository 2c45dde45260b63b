//! Staged job queue for background document processing
//!
//! Three bounded queues connect the parse, embed, and upsert stages. Each
//! document moves through the pipeline in order because a stage enqueues
//! the next one only after its own success. Failed jobs are retried with
//! exponential backoff and dead-lettered once attempts are exhausted.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::QueueConfig;
use crate::error::{Error, Result};
use crate::types::{Document, IndexPoint};

/// Ingestion stage identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Parse,
    Embed,
    Upsert,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parse => "parse",
            Self::Embed => "embed",
            Self::Upsert => "upsert",
        }
    }
}

/// Per-document pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocStage {
    QueuedParse,
    Parsing,
    QueuedEmbed,
    Embedding,
    QueuedUpsert,
    Upserting,
    Done,
    Failed,
}

impl DocStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    fn queued(stage: Stage) -> Self {
        match stage {
            Stage::Parse => Self::QueuedParse,
            Stage::Embed => Self::QueuedEmbed,
            Stage::Upsert => Self::QueuedUpsert,
        }
    }

    fn active(stage: Stage) -> Self {
        match stage {
            Stage::Parse => Self::Parsing,
            Stage::Embed => Self::Embedding,
            Stage::Upsert => Self::Upserting,
        }
    }
}

/// Parse stage payload: the raw uploaded file
#[derive(Debug, Clone)]
pub struct ParseJob {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Embed stage payload: the parsed document
#[derive(Debug, Clone)]
pub struct EmbedJob {
    pub document: Document,
}

/// Upsert stage payload: the finished index points
///
/// Point ids are fixed here, so a retried upsert after a partial failure
/// rewrites the same points.
#[derive(Debug, Clone)]
pub struct UpsertJob {
    pub filename: String,
    pub points: Vec<IndexPoint>,
}

#[derive(Debug, Clone)]
pub enum JobPayload {
    Parse(ParseJob),
    Embed(EmbedJob),
    Upsert(UpsertJob),
}

/// A unit of queued work
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub doc_id: Uuid,
    pub attempt: u32,
    pub payload: JobPayload,
}

impl Job {
    pub fn new(doc_id: Uuid, payload: JobPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            doc_id,
            attempt: 1,
            payload,
        }
    }

    pub fn stage(&self) -> Stage {
        match self.payload {
            JobPayload::Parse(_) => Stage::Parse,
            JobPayload::Embed(_) => Stage::Embed,
            JobPayload::Upsert(_) => Stage::Upsert,
        }
    }

    pub fn next_attempt(mut self) -> Self {
        self.attempt += 1;
        self
    }
}

/// Explicit retry policy shared by all stage queues
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &QueueConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }

    /// Exponential backoff: `base · 2^(attempt−1)`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }

    /// Validation errors are never retried; upstream/timeout failures are
    /// retried until attempts run out
    pub fn should_retry(&self, attempt: u32, error: &Error) -> bool {
        error.is_retryable() && attempt < self.max_attempts
    }
}

/// Dead-lettered job record, visible via stats
#[derive(Debug, Clone, Serialize)]
pub struct FailedJob {
    pub job_id: Uuid,
    pub doc_id: Uuid,
    pub stage: Stage,
    pub attempts: u32,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

#[derive(Default)]
struct StageCounters {
    waiting: AtomicUsize,
    active: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
}

impl StageCounters {
    fn snapshot(&self) -> StageStats {
        StageStats {
            waiting: self.waiting.load(Ordering::SeqCst),
            active: self.active.load(Ordering::SeqCst),
            completed: self.completed.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }
}

/// Point-in-time counters for one stage
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StageStats {
    pub waiting: usize,
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Point-in-time counters for the whole pipeline
#[derive(Debug, Clone, Copy, Serialize)]
pub struct QueueStats {
    pub parse: StageStats,
    pub embed: StageStats,
    pub upsert: StageStats,
}

struct QueueShared {
    statuses: DashMap<Uuid, DocStage>,
    dead_letters: DashMap<Uuid, FailedJob>,
    parse: StageCounters,
    embed: StageCounters,
    upsert: StageCounters,
}

/// Front end of the three stage queues
#[derive(Clone)]
pub struct JobQueue {
    parse_tx: mpsc::Sender<Job>,
    embed_tx: mpsc::Sender<Job>,
    upsert_tx: mpsc::Sender<Job>,
    shared: Arc<QueueShared>,
    retry: RetryPolicy,
}

/// Receiving ends handed to the worker pools
pub struct StageReceivers {
    pub parse: mpsc::Receiver<Job>,
    pub embed: mpsc::Receiver<Job>,
    pub upsert: mpsc::Receiver<Job>,
}

impl JobQueue {
    pub fn new(config: &QueueConfig) -> (Self, StageReceivers) {
        let capacity = config.queue_capacity.max(1);
        let (parse_tx, parse_rx) = mpsc::channel(capacity);
        let (embed_tx, embed_rx) = mpsc::channel(capacity);
        let (upsert_tx, upsert_rx) = mpsc::channel(capacity);

        let queue = Self {
            parse_tx,
            embed_tx,
            upsert_tx,
            shared: Arc::new(QueueShared {
                statuses: DashMap::new(),
                dead_letters: DashMap::new(),
                parse: StageCounters::default(),
                embed: StageCounters::default(),
                upsert: StageCounters::default(),
            }),
            retry: RetryPolicy::from_config(config),
        };

        (
            queue,
            StageReceivers {
                parse: parse_rx,
                embed: embed_rx,
                upsert: upsert_rx,
            },
        )
    }

    fn counters(&self, stage: Stage) -> &StageCounters {
        match stage {
            Stage::Parse => &self.shared.parse,
            Stage::Embed => &self.shared.embed,
            Stage::Upsert => &self.shared.upsert,
        }
    }

    fn sender(&self, stage: Stage) -> &mpsc::Sender<Job> {
        match stage {
            Stage::Parse => &self.parse_tx,
            Stage::Embed => &self.embed_tx,
            Stage::Upsert => &self.upsert_tx,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Queue a job for its stage and record the document as queued there
    pub async fn enqueue(&self, job: Job) -> Result<()> {
        let stage = job.stage();
        self.shared
            .statuses
            .insert(job.doc_id, DocStage::queued(stage));
        self.counters(stage).waiting.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(
            "Job {} queued on {} (attempt {})",
            job.id,
            stage.as_str(),
            job.attempt
        );
        self.sender(stage)
            .send(job)
            .await
            .map_err(|_| Error::internal("stage queue is closed"))
    }

    /// A worker picked up the job
    pub(crate) fn begin(&self, stage: Stage, doc_id: Uuid) {
        let counters = self.counters(stage);
        counters.waiting.fetch_sub(1, Ordering::SeqCst);
        counters.active.fetch_add(1, Ordering::SeqCst);
        self.shared.statuses.insert(doc_id, DocStage::active(stage));
    }

    /// The job's handler succeeded
    pub(crate) fn complete(&self, stage: Stage) {
        let counters = self.counters(stage);
        counters.active.fetch_sub(1, Ordering::SeqCst);
        counters.completed.fetch_add(1, Ordering::SeqCst);
    }

    /// The whole pipeline finished for a document
    pub(crate) fn mark_done(&self, doc_id: Uuid) {
        self.shared.statuses.insert(doc_id, DocStage::Done);
    }

    /// The job failed but will be re-enqueued
    pub(crate) fn requeued(&self, stage: Stage) {
        self.counters(stage).active.fetch_sub(1, Ordering::SeqCst);
    }

    /// The job exhausted its attempts: dead-letter it
    pub(crate) fn fail(&self, job: &Job, error: &Error) {
        let stage = job.stage();
        let counters = self.counters(stage);
        counters.active.fetch_sub(1, Ordering::SeqCst);
        counters.failed.fetch_add(1, Ordering::SeqCst);
        self.shared.statuses.insert(job.doc_id, DocStage::Failed);
        self.shared.dead_letters.insert(
            job.id,
            FailedJob {
                job_id: job.id,
                doc_id: job.doc_id,
                stage,
                attempts: job.attempt,
                error: error.to_string(),
                failed_at: Utc::now(),
            },
        );
        tracing::error!(
            "Job {} for document {} failed permanently on {} after {} attempts: {}",
            job.id,
            job.doc_id,
            stage.as_str(),
            job.attempt,
            error
        );
    }

    /// Current pipeline state of a document
    pub fn status(&self, doc_id: &Uuid) -> Option<DocStage> {
        self.shared.statuses.get(doc_id).map(|s| *s)
    }

    /// Dead-lettered jobs
    pub fn failed_jobs(&self) -> Vec<FailedJob> {
        self.shared
            .dead_letters
            .iter()
            .map(|e| e.value().clone())
            .collect()
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            parse: self.shared.parse.snapshot(),
            embed: self.shared.embed.snapshot(),
            upsert: self.shared.upsert.snapshot(),
        }
    }

    /// Poll until the document reaches `done` or `failed`
    pub async fn await_terminal(&self, doc_id: Uuid, timeout: Duration) -> Option<DocStage> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(stage) = self.status(&doc_id) {
                if stage.is_terminal() {
                    return Some(stage);
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
    }

    #[test]
    fn retry_only_retryable_errors_within_budget() {
        let policy = RetryPolicy::default();
        let upstream = Error::upstream("503");
        assert!(policy.should_retry(1, &upstream));
        assert!(policy.should_retry(2, &upstream));
        assert!(!policy.should_retry(3, &upstream));
        assert!(!policy.should_retry(1, &Error::validation("bad input")));
    }

    #[tokio::test]
    async fn enqueue_tracks_status_and_stats() {
        let (queue, mut receivers) = JobQueue::new(&QueueConfig::default());
        let doc_id = Uuid::new_v4();
        queue
            .enqueue(Job::new(
                doc_id,
                JobPayload::Parse(ParseJob {
                    filename: "a.txt".to_string(),
                    data: b"hello".to_vec(),
                }),
            ))
            .await
            .expect("enqueue");

        assert_eq!(queue.status(&doc_id), Some(DocStage::QueuedParse));
        assert_eq!(queue.stats().parse.waiting, 1);

        let job = receivers.parse.recv().await.expect("job");
        queue.begin(job.stage(), job.doc_id);
        assert_eq!(queue.status(&doc_id), Some(DocStage::Parsing));

        queue.complete(job.stage());
        queue.mark_done(job.doc_id);
        assert_eq!(queue.status(&doc_id), Some(DocStage::Done));
        let stats = queue.stats();
        assert_eq!(stats.parse.completed, 1);
        assert_eq!(stats.parse.waiting, 0);
        assert_eq!(stats.parse.active, 0);
    }

    #[tokio::test]
    async fn failed_jobs_are_dead_lettered() {
        let (queue, mut receivers) = JobQueue::new(&QueueConfig::default());
        let doc_id = Uuid::new_v4();
        queue
            .enqueue(Job::new(
                doc_id,
                JobPayload::Parse(ParseJob {
                    filename: "a.txt".to_string(),
                    data: b"hello".to_vec(),
                }),
            ))
            .await
            .expect("enqueue");

        let job = receivers.parse.recv().await.expect("job");
        queue.begin(job.stage(), job.doc_id);
        queue.fail(&job, &Error::upstream("provider down"));

        assert_eq!(queue.status(&doc_id), Some(DocStage::Failed));
        let failed = queue.failed_jobs();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].doc_id, doc_id);
        assert_eq!(queue.stats().parse.failed, 1);
    }
}
