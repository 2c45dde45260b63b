//! Collapse candidates referring to the same logical passage

use std::collections::HashMap;
use uuid::Uuid;

use crate::types::ScoredPoint;

/// Keep one candidate per `(doc_id, page)` group
///
/// The survivor is the highest-scoring member of its group; on a score
/// tie the first encountered wins. Survivors keep their first-seen order.
pub fn dedupe_by_doc_page(candidates: Vec<ScoredPoint>) -> Vec<ScoredPoint> {
    let before = candidates.len();
    let mut order: Vec<(Uuid, u32)> = Vec::new();
    let mut best: HashMap<(Uuid, u32), ScoredPoint> = HashMap::new();

    for candidate in candidates {
        let key = (candidate.payload.doc_id, candidate.payload.page);
        match best.entry(key) {
            std::collections::hash_map::Entry::Vacant(slot) => {
                order.push(key);
                slot.insert(candidate);
            }
            std::collections::hash_map::Entry::Occupied(mut slot) => {
                if candidate.score > slot.get().score {
                    slot.insert(candidate);
                }
            }
        }
    }

    let deduped: Vec<ScoredPoint> = order
        .into_iter()
        .filter_map(|key| best.remove(&key))
        .collect();

    if deduped.len() < before {
        tracing::debug!("Deduplicated: {} -> {} candidates", before, deduped.len());
    }
    deduped
}
