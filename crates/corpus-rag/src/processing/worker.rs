//! Stage worker pools for the ingestion pipeline

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::config::QueueConfig;
use crate::embedder::Embedder;
use crate::error::Result;
use crate::ingestion::{FileParser, TextChunker};
use crate::providers::VectorIndex;

use super::queue::{EmbedJob, Job, JobPayload, JobQueue, Stage, StageReceivers, UpsertJob};

/// Shared dependencies for the stage workers
#[derive(Clone)]
pub struct IngestContext {
    pub chunker: Arc<TextChunker>,
    pub embedder: Arc<Embedder>,
    pub index: Arc<dyn VectorIndex>,
    pub queue: JobQueue,
}

/// Spawns and runs the per-stage worker pools
pub struct IngestWorkers;

impl IngestWorkers {
    /// Start every stage's workers; returned handles stop when the queue
    /// senders are dropped
    pub fn spawn(
        ctx: IngestContext,
        receivers: StageReceivers,
        config: &QueueConfig,
    ) -> Vec<JoinHandle<()>> {
        tracing::info!(
            "Ingest workers starting: parse={} embed={} upsert={}",
            config.parse_workers,
            config.embed_workers,
            config.upsert_workers
        );

        let mut handles = Vec::new();
        handles.extend(Self::stage_pool(
            ctx.clone(),
            receivers.parse,
            config.parse_workers.max(1),
            Stage::Parse,
        ));
        handles.extend(Self::stage_pool(
            ctx.clone(),
            receivers.embed,
            config.embed_workers.max(1),
            Stage::Embed,
        ));
        handles.extend(Self::stage_pool(
            ctx,
            receivers.upsert,
            config.upsert_workers.max(1),
            Stage::Upsert,
        ));
        handles
    }

    fn stage_pool(
        ctx: IngestContext,
        receiver: mpsc::Receiver<Job>,
        workers: usize,
        stage: Stage,
    ) -> Vec<JoinHandle<()>> {
        let receiver = Arc::new(Mutex::new(receiver));
        (0..workers)
            .map(|worker_id| {
                let ctx = ctx.clone();
                let receiver = Arc::clone(&receiver);
                tokio::spawn(async move {
                    tracing::debug!("{} worker {} started", stage.as_str(), worker_id);
                    loop {
                        let job = { receiver.lock().await.recv().await };
                        match job {
                            Some(job) => Self::run_job(&ctx, job).await,
                            None => break,
                        }
                    }
                    tracing::debug!("{} worker {} stopped", stage.as_str(), worker_id);
                })
            })
            .collect()
    }

    /// Process one job: success enqueues the next stage, retryable failure
    /// re-enqueues with backoff, exhausted failure dead-letters
    async fn run_job(ctx: &IngestContext, job: Job) {
        let stage = job.stage();
        ctx.queue.begin(stage, job.doc_id);

        match Self::process(ctx, &job).await {
            Ok(next) => {
                ctx.queue.complete(stage);
                match next {
                    Some(next_job) => {
                        if let Err(e) = ctx.queue.enqueue(next_job).await {
                            tracing::error!(
                                "Could not enqueue next stage for document {}: {}",
                                job.doc_id,
                                e
                            );
                        }
                    }
                    None => ctx.queue.mark_done(job.doc_id),
                }
            }
            Err(error) => {
                let policy = ctx.queue.retry_policy();
                if policy.should_retry(job.attempt, &error) {
                    let delay = policy.delay_for(job.attempt);
                    tracing::warn!(
                        "{} job for document {} failed (attempt {}/{}), retrying in {:?}: {}",
                        stage.as_str(),
                        job.doc_id,
                        job.attempt,
                        policy.max_attempts,
                        delay,
                        error
                    );
                    ctx.queue.requeued(stage);
                    let queue = ctx.queue.clone();
                    let retry_job = job.next_attempt();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        if let Err(e) = queue.enqueue(retry_job).await {
                            tracing::error!("Could not re-enqueue job: {}", e);
                        }
                    });
                } else {
                    ctx.queue.fail(&job, &error);
                }
            }
        }
    }

    /// Stage handlers; each returns the next stage's job, if any
    async fn process(ctx: &IngestContext, job: &Job) -> Result<Option<Job>> {
        match &job.payload {
            JobPayload::Parse(parse) => {
                let mut document = FileParser::parse(&parse.filename, &parse.data)?;
                // Keep the id assigned at enqueue time so reindexing can
                // reuse it
                document.id = job.doc_id;
                Ok(Some(Job::new(
                    job.doc_id,
                    JobPayload::Embed(EmbedJob { document }),
                )))
            }
            JobPayload::Embed(embed) => {
                let chunks = ctx.chunker.chunk_document(&embed.document);
                tracing::info!(
                    "[{}] Created {} chunks, generating embeddings",
                    embed.document.filename,
                    chunks.len()
                );
                let embedded = ctx.embedder.embed_chunks(chunks).await?;
                let points = embedded.into_iter().map(|ec| ec.into_point()).collect();
                Ok(Some(Job::new(
                    job.doc_id,
                    JobPayload::Upsert(UpsertJob {
                        filename: embed.document.filename.clone(),
                        points,
                    }),
                )))
            }
            JobPayload::Upsert(upsert) => {
                ctx.index.upsert(upsert.points.clone()).await?;
                tracing::info!(
                    "[{}] Indexed {} points",
                    upsert.filename,
                    upsert.points.len()
                );
                Ok(None)
            }
        }
    }
}
