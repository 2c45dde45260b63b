//! Document, chunk, and index point types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A parsed document, owned by the ingestion pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Document id; stable across a reindex
    pub id: Uuid,
    /// Original filename, used as the citation title
    pub filename: String,
    /// Mime kind of the uploaded file
    pub mime: String,
    /// Where the document came from (e.g. "upload")
    pub source: String,
    /// Ordered pages; never mutated after parse
    pub pages: Vec<Page>,
    /// Total page count
    pub total_pages: u32,
    /// Parse timestamp
    pub parsed_at: DateTime<Utc>,
}

impl Document {
    /// Create a new document from parsed pages
    pub fn new(filename: String, mime: String, pages: Vec<Page>, source: String) -> Self {
        let total_pages = pages.len() as u32;
        Self {
            id: Uuid::new_v4(),
            filename,
            mime,
            source,
            pages,
            total_pages,
            parsed_at: Utc::now(),
        }
    }
}

/// A single page of raw text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// Page number, 1-based
    pub number: u32,
    /// Raw page text
    pub text: String,
}

/// A bounded span of page text, the unit of embedding and retrieval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk id, used as the index point id
    pub id: Uuid,
    /// Parent document id
    pub doc_id: Uuid,
    /// Stable chunk identifier: `{doc_id}_p{page}_c{index}`
    pub chunk_id: String,
    /// Citation title (the document filename)
    pub title: String,
    /// Source tag inherited from the document
    pub source: String,
    /// Parent page number, 1-based
    pub page: u32,
    /// Chunk text span
    pub text: String,
    /// Mime kind inherited from the document
    pub mime: String,
    /// Last-updated timestamp (the parse time)
    pub updated_at: DateTime<Utc>,
}

/// A chunk paired with its embedding vector; transient, persisted only as
/// an [`IndexPoint`]
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

impl EmbeddedChunk {
    /// Convert into the persisted index representation
    pub fn into_point(self) -> IndexPoint {
        let chunk = self.chunk;
        IndexPoint {
            id: chunk.id,
            vector: self.vector,
            payload: PointPayload {
                doc_id: chunk.doc_id,
                chunk_id: chunk.chunk_id,
                source: chunk.source,
                title: chunk.title,
                page: chunk.page,
                text: chunk.text,
                mime: chunk.mime,
                updated_at: chunk.updated_at,
            },
        }
    }
}

/// Payload stored alongside each vector in the index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointPayload {
    pub doc_id: Uuid,
    pub chunk_id: String,
    pub source: String,
    pub title: String,
    pub page: u32,
    pub text: String,
    pub mime: String,
    pub updated_at: DateTime<Utc>,
}

/// The persisted unit in the vector index; one per chunk, upserts are
/// idempotent by id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexPoint {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: PointPayload,
}

/// A retrieved candidate: index point plus similarity score, living only
/// for the duration of one query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub id: Uuid,
    /// Similarity score from the index search
    pub score: f32,
    pub payload: PointPayload,
    /// Retrieval vector, when the index returned one (needed for MMR)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
    /// Second-pass relevance score set by the reranker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
}

impl ScoredPoint {
    /// Human-readable citation string for this candidate
    pub fn citation(&self) -> String {
        format!("[{} p.{}]", self.payload.title, self.payload.page)
    }
}
