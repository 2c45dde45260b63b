//! Core data model: documents, chunks, index points, and chat types

pub mod chat;
pub mod document;

pub use chat::{
    ChatMessage, ChatMetadata, ChatRequest, ChatResponse, DoneInfo, SourceRef, StreamEvent,
};
pub use document::{Chunk, Document, EmbeddedChunk, IndexPoint, Page, PointPayload, ScoredPoint};
