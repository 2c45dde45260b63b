//! Query-time retrieval and ranking

mod dedupe;
mod mmr;
mod rerank;
mod search;
mod snippet;

pub use dedupe::dedupe_by_doc_page;
pub use mmr::{cosine_similarity, mmr_select};
pub use rerank::Reranker;
pub use search::Retriever;
pub use snippet::SnippetWindow;
