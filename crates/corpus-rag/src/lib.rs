//! corpus-rag: retrieval-augmented question answering core
//!
//! Two pipelines share a document/chunk data model and a cache layer: an
//! asynchronous parse → embed → upsert ingestion pipeline staged through
//! retryable queues, and a query-time retrieve → diversify → dedupe →
//! window → rerank → assemble → generate chain with streaming output.
//! External collaborators (embedding provider, vector index, generative
//! model, cache store) are injected through narrow trait contracts.

pub mod cache;
pub mod config;
pub mod embedder;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod processing;
pub mod providers;
pub mod retrieval;
pub mod service;
pub mod types;

pub use config::RagConfig;
pub use embedder::Embedder;
pub use error::{Error, Result};
pub use processing::{Indexer, IngestContext, IngestWorkers, JobQueue};
pub use service::RagService;
pub use types::{ChatRequest, ChatResponse, StreamEvent};
