//! Context assembly and prompt construction for generation

mod context;
mod prompt;

pub use context::ContextAssembler;
pub use prompt::PromptBuilder;

/// Bumped whenever the prompt templates change, to key the answer cache
pub const PROMPT_VERSION: &str = "v2.1";
