//! Provider contracts for external collaborators and their implementations
//!
//! The core never talks to a vendor directly: embedding, generation, and
//! vector storage all go through the traits here so deployments (and
//! tests) can substitute implementations.

pub mod embedding;
pub mod index;
pub mod llm;
pub mod memory;
pub mod openai;
pub mod qdrant;

pub use embedding::EmbeddingProvider;
pub use index::{CollectionInfo, IndexFilter, VectorIndex};
pub use llm::{ChatModel, GenerationParams, TokenStream};
pub use memory::MemoryIndex;
pub use openai::{OpenAiChat, OpenAiClient, OpenAiEmbedder};
pub use qdrant::QdrantIndex;
