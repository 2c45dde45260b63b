//! Shared test fakes: deterministic embedder, scripted/stalling/failing
//! chat models, and a pipeline assembly helper

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use corpus_rag::cache::MemoryCache;
use corpus_rag::config::RagConfig;
use corpus_rag::embedder::Embedder;
use corpus_rag::error::{Error, Result};
use corpus_rag::ingestion::TextChunker;
use corpus_rag::processing::{Indexer, IngestContext, IngestWorkers, JobQueue};
use corpus_rag::providers::{
    ChatModel, EmbeddingProvider, GenerationParams, MemoryIndex, TokenStream, VectorIndex,
};
use corpus_rag::types::ChatMessage;
use futures::StreamExt;

/// Deterministic embedding: identical text always maps to the identical
/// vector, so an exact-match query scores cosine 1.0 against its chunk
pub struct HashEmbedder {
    pub dims: usize,
}

pub fn hash_vector(text: &str, dims: usize) -> Vec<f32> {
    let mut v = vec![0.1f32; dims];
    for (i, b) in text.bytes().enumerate() {
        v[i % dims] += (b as f32) * (((i * 31 + 7) % 13 + 1) as f32) / 100.0;
    }
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    v.into_iter().map(|x| x / norm).collect()
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(hash_vector(text, self.dims))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// Embedder that fails its first `failures` calls, then behaves like
/// [`HashEmbedder`]
pub struct FlakyEmbedder {
    pub failures: usize,
    pub calls: AtomicUsize,
    pub dims: usize,
}

impl FlakyEmbedder {
    pub fn new(failures: usize, dims: usize) -> Self {
        Self {
            failures,
            calls: AtomicUsize::new(0),
            dims,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FlakyEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(Error::upstream("embedding provider unavailable"));
        }
        Ok(hash_vector(text, self.dims))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

/// Chat model that streams a fixed fragment script
pub struct ScriptedLlm {
    pub fragments: Vec<String>,
    pub calls: AtomicUsize,
}

impl ScriptedLlm {
    pub fn new(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|s| s.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ChatModel for ScriptedLlm {
    async fn stream_chat(
        &self,
        _messages: &[ChatMessage],
        _params: &GenerationParams,
    ) -> Result<TokenStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let fragments: Vec<Result<String>> = self.fragments.iter().cloned().map(Ok).collect();
        Ok(futures::stream::iter(fragments).boxed())
    }

    fn model(&self) -> &str {
        "scripted"
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Chat model that yields one fragment and then never completes
pub struct StallingLlm;

#[async_trait]
impl ChatModel for StallingLlm {
    async fn stream_chat(
        &self,
        _messages: &[ChatMessage],
        _params: &GenerationParams,
    ) -> Result<TokenStream> {
        let head = futures::stream::iter(vec![Ok("partial".to_string())]);
        Ok(head.chain(futures::stream::pending()).boxed())
    }

    fn model(&self) -> &str {
        "stalling"
    }

    fn name(&self) -> &str {
        "stalling"
    }
}

/// Chat model whose requests always fail
pub struct FailingLlm;

#[async_trait]
impl ChatModel for FailingLlm {
    async fn stream_chat(
        &self,
        _messages: &[ChatMessage],
        _params: &GenerationParams,
    ) -> Result<TokenStream> {
        Err(Error::upstream("model endpoint down"))
    }

    fn model(&self) -> &str {
        "failing"
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// A fully wired ingestion pipeline over in-memory collaborators
pub struct TestPipeline {
    pub indexer: Indexer,
    pub index: Arc<MemoryIndex>,
    pub cache: Arc<MemoryCache>,
    pub embedder: Arc<Embedder>,
    pub queue: JobQueue,
    pub config: RagConfig,
}

pub fn test_config() -> RagConfig {
    let mut config = RagConfig::default();
    config.chunking.chunk_size = 500;
    config.chunking.chunk_overlap = 100;
    config.embeddings.dimensions = 16;
    config.embeddings.batch_delay_ms = 0;
    config.queue.base_delay_ms = 10;
    config
}

/// Install a test subscriber once; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "corpus_rag=info".into()),
        )
        .with_test_writer()
        .try_init();
}

pub fn build_pipeline(provider: Arc<dyn EmbeddingProvider>, config: RagConfig) -> TestPipeline {
    init_tracing();
    let cache = Arc::new(MemoryCache::new());
    let index = Arc::new(MemoryIndex::new());
    let embedder = Arc::new(Embedder::new(
        provider,
        cache.clone(),
        &config.embeddings,
        config.cache.ttl(),
    ));

    let (queue, receivers) = JobQueue::new(&config.queue);
    let ctx = IngestContext {
        chunker: Arc::new(TextChunker::from_config(&config.chunking)),
        embedder: embedder.clone(),
        index: index.clone(),
        queue: queue.clone(),
    };
    IngestWorkers::spawn(ctx, receivers, &config.queue);

    let indexer = Indexer::new(queue.clone(), index.clone(), cache.clone());

    TestPipeline {
        indexer,
        index,
        cache,
        embedder,
        queue,
        config,
    }
}

/// A text document whose pages each produce multiple 500/100 chunks
pub fn three_page_text() -> Vec<u8> {
    let page = |topic: &str| -> String {
        (0..12)
            .map(|i| format!("{} fact number {} stated in a full sentence. ", topic, i))
            .collect()
    };
    format!(
        "{}\n---\n{}\n---\n{}",
        page("Warranty"),
        page("Shipping"),
        page("Returns")
    )
    .into_bytes()
}

/// Total points the current index holds
pub async fn point_count(index: &Arc<MemoryIndex>) -> usize {
    index
        .collection_info()
        .await
        .expect("collection info")
        .points_count
}
