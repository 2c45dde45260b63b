//! Generative model contract

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::types::ChatMessage;

/// Incremental text fragments from a generation request
pub type TokenStream = BoxStream<'static, Result<String>>;

/// Per-request generation parameters
#[derive(Debug, Clone)]
pub struct GenerationParams {
    /// Overrides the provider's configured model when set
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.7,
            max_tokens: 2000,
        }
    }
}

/// Drives a generative language model
///
/// The returned stream yields content fragments in generation order.
/// Dropping the stream cancels the underlying request.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Start a streaming generation for the given conversation
    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<TokenStream>;

    /// Model identifier for logging and cache keys
    fn model(&self) -> &str;

    /// Provider name for logging
    fn name(&self) -> &str;
}
