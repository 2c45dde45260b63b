//! Configuration for the RAG core

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Main RAG configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagConfig {
    /// Embedding provider configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Generation model configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Vector index configuration
    #[serde(default)]
    pub index: IndexConfig,
    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Ingestion queue configuration
    #[serde(default)]
    pub queue: QueueConfig,
    /// Query-time retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&raw).map_err(|e| Error::Config(e.to_string()))
    }
}

/// Embedding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding model identifier
    pub model: String,
    /// Embedding dimensions
    pub dimensions: usize,
    /// Maximum texts per provider call
    pub batch_size: usize,
    /// Delay between sub-batches, to respect provider rate limits
    pub batch_delay_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-large".to_string(),
            dimensions: 3072,
            batch_size: 16,
            batch_delay_ms: 100,
        }
    }
}

impl EmbeddingConfig {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1200,
            chunk_overlap: 180,
        }
    }
}

/// Generation model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API
    pub base_url: String,
    /// API key sent as a bearer token
    pub api_key: String,
    /// Chat model identifier
    pub chat_model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum generated tokens
    pub max_tokens: u32,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            chat_model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 2000,
            timeout_secs: 30,
        }
    }
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Index server URL
    pub url: String,
    /// Optional API key
    pub api_key: Option<String>,
    /// Collection name
    pub collection: String,
    /// HNSW ef_construct parameter used when bootstrapping the collection
    pub hnsw_ef_construct: usize,
    /// HNSW m parameter used when bootstrapping the collection
    pub hnsw_m: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6333".to_string(),
            api_key: None,
            collection: "corpus_docs".to_string(),
            hnsw_ef_construct: 128,
            hnsw_m: 16,
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Time-to-live for cache entries in seconds
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 3600 }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Ingestion queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum attempts per job before dead-lettering
    pub max_attempts: u32,
    /// Base delay for exponential backoff in milliseconds
    pub base_delay_ms: u64,
    /// Parse stage worker count
    pub parse_workers: usize,
    /// Embed stage worker count
    pub embed_workers: usize,
    /// Upsert stage worker count (kept low to protect index write throughput)
    pub upsert_workers: usize,
    /// Bounded capacity of each stage queue
    pub queue_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2000,
            parse_workers: 4,
            embed_workers: 4,
            upsert_workers: 2,
            queue_capacity: 1000,
        }
    }
}

/// Query-time retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Final number of passages handed to the generator
    pub top_k: usize,
    /// Candidates requested from the index before ranking
    pub search_k: usize,
    /// MMR trade-off weight: 1.0 is pure relevance, 0.0 pure diversity
    pub mmr_lambda: f32,
    /// Minimum similarity for retrieved candidates
    pub score_threshold: f32,
    /// Conversation exchanges kept when compacting history
    pub max_history_turns: usize,
    /// Snippet window lower bound in characters
    pub snippet_min: usize,
    /// Snippet window upper bound in characters
    pub snippet_max: usize,
    /// Approximate token budget for the assembled context
    pub context_max_tokens: usize,
    /// Characters per token used for the budget estimate
    pub chars_per_token: usize,
    /// Ranking algorithm version, part of the rerank cache key
    pub rerank_version: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 6,
            search_k: 20,
            mmr_lambda: 0.3,
            score_threshold: 0.1,
            max_history_turns: 8,
            snippet_min: 400,
            snippet_max: 800,
            context_max_tokens: 4000,
            chars_per_token: 4,
            rerank_version: "v1".to_string(),
        }
    }
}
