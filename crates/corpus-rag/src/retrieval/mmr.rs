//! Maximal Marginal Relevance diversification
//!
//! Greedy selection balancing relevance against novelty:
//! `score = λ·relevance − (1−λ)·max_similarity_to_selected`.

use crate::types::ScoredPoint;

/// Cosine similarity, defined as 0 for mismatched lengths, empty inputs,
/// and zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Pairwise similarity used for the diversity term
///
/// Candidates without retrieval vectors contribute 0, so when the index
/// omits vectors the selection degrades toward pure relevance ranking.
fn pair_similarity(a: &ScoredPoint, b: &ScoredPoint) -> f32 {
    match (&a.vector, &b.vector) {
        (Some(va), Some(vb)) => cosine_similarity(va, vb),
        _ => 0.0,
    }
}

/// Re-order candidates to balance relevance and novelty
///
/// Seeds with the highest-scoring candidate, then repeatedly picks the
/// remaining candidate maximizing the MMR score. Ties keep the earliest
/// candidate in the original order. Inputs of 0 or 1 candidates are
/// returned unchanged.
pub fn mmr_select(candidates: Vec<ScoredPoint>, lambda: f32, limit: usize) -> Vec<ScoredPoint> {
    if candidates.len() <= 1 || limit == 0 {
        return candidates;
    }
    let lambda = lambda.clamp(0.0, 1.0);

    let mut remaining = candidates;
    let mut selected = Vec::with_capacity(limit.min(remaining.len()));

    // Seed with the single highest-scoring candidate (first wins ties)
    let mut seed_idx = 0;
    for (i, cand) in remaining.iter().enumerate() {
        if cand.score > remaining[seed_idx].score {
            seed_idx = i;
        }
    }
    selected.push(remaining.remove(seed_idx));

    while selected.len() < limit && !remaining.is_empty() {
        let mut best_idx = 0;
        let mut best_score = f32::NEG_INFINITY;

        for (i, cand) in remaining.iter().enumerate() {
            let max_similarity = selected
                .iter()
                .map(|s| pair_similarity(cand, s))
                .fold(0.0f32, f32::max);

            let mmr = lambda * cand.score - (1.0 - lambda) * max_similarity;
            if mmr > best_score {
                best_score = mmr;
                best_idx = i;
            }
        }

        selected.push(remaining.remove(best_idx));
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn candidate(chunk_id: &str, score: f32, vector: Option<Vec<f32>>) -> ScoredPoint {
        ScoredPoint {
            id: Uuid::new_v4(),
            score,
            payload: crate::types::PointPayload {
                doc_id: Uuid::new_v4(),
                chunk_id: chunk_id.to_string(),
                source: "upload".to_string(),
                title: "doc.pdf".to_string(),
                page: 1,
                text: "text".to_string(),
                mime: "application/pdf".to_string(),
                updated_at: Utc::now(),
            },
            vector,
            rerank_score: None,
        }
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn single_candidate_is_returned_unchanged() {
        let input = vec![candidate("a", 0.9, Some(vec![1.0, 0.0]))];
        let out = mmr_select(input.clone(), 0.5, 5);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].payload.chunk_id, "a");
        assert!(mmr_select(Vec::new(), 0.5, 5).is_empty());
    }

    #[test]
    fn lambda_one_reduces_to_score_order() {
        let input = vec![
            candidate("a", 0.9, Some(vec![1.0, 0.0])),
            candidate("b", 0.7, Some(vec![0.99, 0.01])),
            candidate("c", 0.8, Some(vec![0.98, 0.02])),
        ];
        let out = mmr_select(input, 1.0, 3);
        let ids: Vec<&str> = out.iter().map(|c| c.payload.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[test]
    fn lambda_zero_avoids_near_duplicates() {
        let input = vec![
            candidate("a", 0.95, Some(vec![1.0, 0.0, 0.0])),
            candidate("near_dup", 0.94, Some(vec![0.99, 0.01, 0.0])),
            candidate("diverse", 0.5, Some(vec![0.0, 0.0, 1.0])),
        ];
        let out = mmr_select(input, 0.0, 2);
        assert_eq!(out[0].payload.chunk_id, "a");
        assert_eq!(
            out[1].payload.chunk_id, "diverse",
            "pure diversity must avoid the near-duplicate"
        );
    }

    #[test]
    fn missing_vectors_degrade_to_relevance_order() {
        let input = vec![
            candidate("a", 0.9, None),
            candidate("b", 0.8, None),
            candidate("c", 0.7, None),
        ];
        let out = mmr_select(input, 0.3, 3);
        let ids: Vec<&str> = out.iter().map(|c| c.payload.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn stops_at_the_limit() {
        let input = vec![
            candidate("a", 0.9, Some(vec![1.0, 0.0])),
            candidate("b", 0.8, Some(vec![0.0, 1.0])),
            candidate("c", 0.7, Some(vec![0.5, 0.5])),
        ];
        assert_eq!(mmr_select(input, 0.5, 2).len(), 2);
    }

    #[test]
    fn ties_keep_original_order() {
        let input = vec![
            candidate("first", 0.8, None),
            candidate("second", 0.8, None),
            candidate("third", 0.8, None),
        ];
        let out = mmr_select(input, 0.5, 3);
        let ids: Vec<&str> = out.iter().map(|c| c.payload.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }
}
