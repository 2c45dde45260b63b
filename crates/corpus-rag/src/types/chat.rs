//! Chat request/response types and the streaming event model

use serde::{Deserialize, Serialize};

/// One conversation message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// A chat request against the indexed corpus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The question to answer
    pub message: String,
    /// Target model identifier; the provider's default when absent
    #[serde(default)]
    pub model: Option<String>,
    /// Prior conversation, oldest first
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    /// Whether the answer cache may be consulted
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
}

fn default_use_cache() -> bool {
    true
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            model: None,
            history: Vec::new(),
            use_cache: true,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }
}

/// A deduplicated source citation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub title: String,
    pub page: u32,
    pub score: f32,
    /// Display form: `[<title> p.<page>]`
    pub citation: String,
}

/// Metadata attached to a completed chat response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMetadata {
    pub model: String,
    /// Candidates returned by the index search
    pub retrieved_count: usize,
    /// Passages that survived ranking
    pub final_count: usize,
    pub duration_secs: f64,
}

/// Synchronous chat result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub sources: Vec<SourceRef>,
    pub metadata: ChatMetadata,
}

/// Payload of the terminal `done` event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoneInfo {
    pub duration_secs: f64,
    pub sources: Vec<SourceRef>,
}

/// Life-cycle events emitted by the streaming chat operation
///
/// Order: any number of `status`, exactly one `sources` (after ranking,
/// before generation), zero or more ordered `content` fragments, then
/// exactly one terminal `done` or `error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Progress narration
    Status(String),
    /// Citation list for the answer being generated
    Sources(Vec<SourceRef>),
    /// Incremental generated text, append-only and ordered
    Content(String),
    /// Successful completion
    Done(DoneInfo),
    /// Failed completion
    Error(String),
}

impl StreamEvent {
    /// Whether this event terminates the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Error(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = StreamEvent::Status("Searching documents...".to_string());
        let json = serde_json::to_value(&event).expect("serializable");
        assert_eq!(json["type"], "status");
        assert_eq!(json["content"], "Searching documents...");

        let done = StreamEvent::Done(DoneInfo {
            duration_secs: 1.5,
            sources: vec![],
        });
        let json = serde_json::to_value(&done).expect("serializable");
        assert_eq!(json["type"], "done");
        assert!(done.is_terminal());
    }
}
