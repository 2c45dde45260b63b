//! Query-time RAG service: retrieve, rank, assemble, generate
//!
//! Constructed once at process start with its collaborators injected, so
//! tests substitute fakes for every external dependency.

use futures_util::StreamExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::cache::{keys, CacheStore};
use crate::config::RagConfig;
use crate::embedder::Embedder;
use crate::error::{Error, Result};
use crate::generation::{ContextAssembler, PromptBuilder, PROMPT_VERSION};
use crate::providers::{ChatModel, GenerationParams, VectorIndex};
use crate::retrieval::{dedupe_by_doc_page, mmr_select, Reranker, Retriever, SnippetWindow};
use crate::types::{
    ChatMetadata, ChatRequest, ChatResponse, DoneInfo, ScoredPoint, StreamEvent,
};

/// The query-time pipeline behind the chat operations
pub struct RagService {
    embedder: Arc<Embedder>,
    retriever: Retriever,
    reranker: Reranker,
    snippets: SnippetWindow,
    assembler: ContextAssembler,
    llm: Arc<dyn ChatModel>,
    cache: Arc<dyn CacheStore>,
    config: crate::config::RetrievalConfig,
    params: GenerationParams,
    cache_ttl: Duration,
}

impl RagService {
    pub fn new(
        embedder: Arc<Embedder>,
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn ChatModel>,
        cache: Arc<dyn CacheStore>,
        config: &RagConfig,
    ) -> Self {
        let retrieval = config.retrieval.clone();
        Self {
            retriever: Retriever::new(index),
            reranker: Reranker::new(
                embedder.provider(),
                Arc::clone(&cache),
                config.cache.ttl(),
                retrieval.rerank_version.clone(),
            ),
            snippets: SnippetWindow::new(retrieval.snippet_min, retrieval.snippet_max),
            assembler: ContextAssembler::new(
                retrieval.context_max_tokens,
                retrieval.chars_per_token,
            ),
            params: GenerationParams {
                model: None,
                temperature: config.llm.temperature,
                max_tokens: config.llm.max_tokens,
            },
            cache_ttl: config.cache.ttl(),
            config: retrieval,
            embedder,
            llm,
            cache,
        }
    }

    fn validate(request: &ChatRequest) -> Result<()> {
        if request.message.trim().is_empty() {
            return Err(Error::validation("message must not be empty"));
        }
        Ok(())
    }

    /// Target model for this request: the caller's choice or the
    /// provider's default
    fn effective_model(&self, request: &ChatRequest) -> String {
        request
            .model
            .clone()
            .unwrap_or_else(|| self.llm.model().to_string())
    }

    fn generation_params(&self, request: &ChatRequest) -> GenerationParams {
        GenerationParams {
            model: request.model.clone(),
            ..self.params.clone()
        }
    }

    /// Diversify, dedupe, window, and rerank retrieved candidates
    async fn rank(&self, message: &str, retrieved: Vec<ScoredPoint>) -> Vec<ScoredPoint> {
        let diversified = mmr_select(retrieved, self.config.mmr_lambda, self.config.search_k);
        let deduped = dedupe_by_doc_page(diversified);
        let windowed = self.snippets.window_candidates(deduped);
        self.reranker
            .rank_documents(message, windowed, self.config.top_k)
            .await
    }

    /// Synchronous chat: runs the full pipeline and collects the answer
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let start = Instant::now();
        Self::validate(request)?;
        tracing::info!("Chat query: \"{}\"", preview(&request.message));

        let history =
            PromptBuilder::compact_history(&request.history, self.config.max_history_turns);
        let query_vector = self.embedder.embed_query(&request.message).await?;
        let retrieved = self
            .retriever
            .retrieve(
                &query_vector,
                self.config.search_k,
                self.config.score_threshold,
                None,
            )
            .await?;
        let retrieved_count = retrieved.len();

        let ranked = self.rank(&request.message, retrieved).await;
        let context = self.assembler.build_context(&ranked);
        let sources = ContextAssembler::extract_sources(&ranked);

        let model = self.effective_model(request);
        let answer_key = keys::answer(&model, &request.message, &context, PROMPT_VERSION);
        if request.use_cache {
            if let Some(cached) = self.cache.get(&answer_key).await {
                tracing::debug!("Answer cache hit");
                return Ok(ChatResponse {
                    response: cached,
                    sources,
                    metadata: ChatMetadata {
                        model,
                        retrieved_count,
                        final_count: ranked.len(),
                        duration_secs: start.elapsed().as_secs_f64(),
                    },
                });
            }
        }

        let messages = PromptBuilder::build_messages(&request.message, &context, &history);
        let params = self.generation_params(request);
        let mut stream = self.llm.stream_chat(&messages, &params).await?;
        let mut response = String::new();
        while let Some(fragment) = stream.next().await {
            response.push_str(&fragment?);
        }

        if request.use_cache {
            self.cache
                .set(&answer_key, response.clone(), self.cache_ttl)
                .await;
        }

        let duration_secs = start.elapsed().as_secs_f64();
        tracing::info!(
            "Chat completed in {:.2}s with {} sources",
            duration_secs,
            sources.len()
        );

        Ok(ChatResponse {
            response,
            sources,
            metadata: ChatMetadata {
                model,
                retrieved_count,
                final_count: ranked.len(),
                duration_secs,
            },
        })
    }

    /// Streaming chat: emits the typed event lifecycle
    ///
    /// The receiver gets `status` events per phase, one `sources` event
    /// after ranking, ordered `content` fragments, then exactly one
    /// terminal `done` or `error`. Cancelling the token (or dropping the
    /// receiver) stops generation promptly without a terminal event.
    pub fn stream_chat(
        self: Arc<Self>,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(32);
        let service = self;

        tokio::spawn(async move {
            let start = Instant::now();
            match service.run_stream(&request, &tx, &cancel, start).await {
                Ok(Some(done)) => {
                    let _ = tx.send(StreamEvent::Done(done)).await;
                }
                Ok(None) => {
                    tracing::debug!("Streaming chat stopped before completion");
                }
                Err(e) => {
                    tracing::error!("Streaming chat failed: {}", e);
                    let _ = tx.send(StreamEvent::Error(e.to_string())).await;
                }
            }
        });

        rx
    }

    async fn run_stream(
        &self,
        request: &ChatRequest,
        tx: &mpsc::Sender<StreamEvent>,
        cancel: &CancellationToken,
        start: Instant,
    ) -> Result<Option<DoneInfo>> {
        Self::validate(request)?;
        tracing::info!("Streaming chat query: \"{}\"", preview(&request.message));

        if !send(tx, StreamEvent::Status("Embedding query...".into())).await {
            return Ok(None);
        }
        let query_vector = self.embedder.embed_query(&request.message).await?;
        if cancel.is_cancelled() {
            return Ok(None);
        }

        if !send(tx, StreamEvent::Status("Searching documents...".into())).await {
            return Ok(None);
        }
        let retrieved = self
            .retriever
            .retrieve(
                &query_vector,
                self.config.search_k,
                self.config.score_threshold,
                None,
            )
            .await?;
        if cancel.is_cancelled() {
            return Ok(None);
        }

        if !send(tx, StreamEvent::Status("Processing results...".into())).await {
            return Ok(None);
        }
        let diversified = mmr_select(retrieved, self.config.mmr_lambda, self.config.search_k);
        let deduped = dedupe_by_doc_page(diversified);
        let windowed = self.snippets.window_candidates(deduped);

        if !send(tx, StreamEvent::Status("Reranking results...".into())).await {
            return Ok(None);
        }
        let ranked = self
            .reranker
            .rank_documents(&request.message, windowed, self.config.top_k)
            .await;
        if cancel.is_cancelled() {
            return Ok(None);
        }

        let context = self.assembler.build_context(&ranked);
        let sources = ContextAssembler::extract_sources(&ranked);

        if !send(tx, StreamEvent::Sources(sources.clone())).await {
            return Ok(None);
        }
        if !send(tx, StreamEvent::Status("Generating response...".into())).await {
            return Ok(None);
        }

        let history =
            PromptBuilder::compact_history(&request.history, self.config.max_history_turns);
        let messages = PromptBuilder::build_messages(&request.message, &context, &history);
        let params = self.generation_params(request);
        let mut stream = self.llm.stream_chat(&messages, &params).await?;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Generation cancelled by caller");
                    return Ok(None);
                }
                fragment = stream.next() => match fragment {
                    Some(Ok(text)) => {
                        if !text.is_empty() && !send(tx, StreamEvent::Content(text)).await {
                            return Ok(None);
                        }
                    }
                    Some(Err(e)) => return Err(e),
                    None => break,
                }
            }
        }

        Ok(Some(DoneInfo {
            duration_secs: start.elapsed().as_secs_f64(),
            sources,
        }))
    }
}

async fn send(tx: &mpsc::Sender<StreamEvent>, event: StreamEvent) -> bool {
    tx.send(event).await.is_ok()
}

fn preview(text: &str) -> String {
    text.chars().take(80).collect()
}
