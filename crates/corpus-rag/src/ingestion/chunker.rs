//! Text chunking with page tracking and stable chunk identifiers

use uuid::Uuid;

use crate::config::ChunkingConfig;
use crate::types::{Chunk, Document};

/// Text chunker with configurable size and overlap
///
/// Deterministic: the same text with the same settings always produces
/// identical chunk boundaries.
pub struct TextChunker {
    /// Target chunk size in characters
    size: usize,
    /// Overlap between consecutive chunks
    overlap: usize,
}

impl TextChunker {
    pub fn new(size: usize, overlap: usize) -> Self {
        Self {
            size: size.max(1),
            overlap,
        }
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Chunk every page of a document
    ///
    /// Chunk ids are `{doc_id}_p{page}_c{index}` with a strictly
    /// increasing index per page; overall ordering follows page
    /// concatenation order.
    pub fn chunk_document(&self, doc: &Document) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for page in &doc.pages {
            for (index, text) in self.split_text(&page.text).into_iter().enumerate() {
                chunks.push(Chunk {
                    id: Uuid::new_v4(),
                    doc_id: doc.id,
                    chunk_id: format!("{}_p{}_c{}", doc.id, page.number, index),
                    title: doc.filename.clone(),
                    source: doc.source.clone(),
                    page: page.number,
                    text,
                    mime: doc.mime.clone(),
                    updated_at: doc.parsed_at,
                });
            }
        }
        tracing::debug!("Created {} chunks for document {}", chunks.len(), doc.id);
        chunks
    }

    /// Split text into overlapping windows
    ///
    /// Windows prefer to break at the latest sentence, newline, or space
    /// boundary that falls after half the target size; otherwise they break
    /// at the hard limit. The window advances by `size − overlap`, always
    /// at least one character. Empty and whitespace-only windows are
    /// dropped.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();

        if chars.len() <= self.size {
            let trimmed = text.trim();
            return if trimmed.is_empty() {
                Vec::new()
            } else {
                vec![trimmed.to_string()]
            };
        }

        let mut chunks = Vec::new();
        let mut start = 0usize;

        while start < chars.len() {
            let mut end = (start + self.size).min(chars.len());

            if end < chars.len() {
                if let Some(boundary) = Self::break_point(&chars, start, end) {
                    if boundary > start + self.size / 2 {
                        end = boundary + 1;
                    }
                }
            }

            let window: String = chars[start..end].iter().collect();
            let trimmed = window.trim();
            if !trimmed.is_empty() {
                chunks.push(trimmed.to_string());
            }

            if end >= chars.len() {
                break;
            }
            // Overlap rewinds from the window end; the max() guarantees
            // forward progress even when overlap >= size.
            start = end.saturating_sub(self.overlap).max(start + 1);
        }

        chunks
    }

    /// Latest sentence, paragraph, or whitespace boundary in the window
    fn break_point(chars: &[char], start: usize, end: usize) -> Option<usize> {
        (start..end)
            .rev()
            .find(|&i| matches!(chars[i], '.' | '!' | '?' | '\n' | ' '))
    }
}
