//! Token-bounded context assembly with source citations

use std::collections::HashSet;

use crate::types::{ScoredPoint, SourceRef};

/// Builds the context block handed to the generator
///
/// The length budget is approximate: characters divided by a constant
/// stand in for tokens.
pub struct ContextAssembler {
    max_tokens: usize,
    chars_per_token: usize,
}

impl ContextAssembler {
    pub fn new(max_tokens: usize, chars_per_token: usize) -> Self {
        Self {
            max_tokens,
            chars_per_token: chars_per_token.max(1),
        }
    }

    /// Format candidates as citation lines joined by blank lines,
    /// truncated to the character budget
    pub fn build_context(&self, candidates: &[ScoredPoint]) -> String {
        let parts: Vec<String> = candidates
            .iter()
            .map(|c| {
                format!(
                    "- [{} p.{}] {}",
                    c.payload.title, c.payload.page, c.payload.text
                )
            })
            .collect();

        let context = parts.join("\n\n");
        let budget = self.max_tokens * self.chars_per_token;

        if context.chars().count() <= budget {
            return context;
        }

        let mut cut: String = context.chars().take(budget).collect();

        // Trim back to the last sentence terminator, but only when it
        // falls within the final 20% of the truncated text
        if let Some(pos) = cut.rfind(|c: char| matches!(c, '.' | '!' | '?')) {
            let terminator_chars = cut[..=pos].chars().count();
            if terminator_chars * 5 >= budget * 4 {
                cut.truncate(pos + 1);
            }
        }

        tracing::warn!(
            "Context truncated to {} chars (budget {} tokens)",
            cut.chars().count(),
            self.max_tokens
        );
        cut
    }

    /// Deduplicated source citations, unique by citation string,
    /// preserving first-seen order
    pub fn extract_sources(candidates: &[ScoredPoint]) -> Vec<SourceRef> {
        let mut seen = HashSet::new();
        let mut sources = Vec::new();

        for candidate in candidates {
            let citation = candidate.citation();
            if seen.insert(citation.clone()) {
                sources.push(SourceRef {
                    title: candidate.payload.title.clone(),
                    page: candidate.payload.page,
                    score: candidate.rerank_score.unwrap_or(candidate.score),
                    citation,
                });
            }
        }
        sources
    }
}
