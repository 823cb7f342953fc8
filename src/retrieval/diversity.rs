//! Per-category result capping

use crate::retrieval::FusedResult;
use ahash::AHashMap;

pub const DEFAULT_MAX_PER_CATEGORY: usize = 6;

/// Keep at most `max_per_category` results per category.
///
/// Within a category the earliest results (in input order) are kept. The
/// survivors are re-sorted by score, descending and stable.
pub fn select_diverse(results: Vec<FusedResult>, max_per_category: usize) -> Vec<FusedResult> {
    let total = results.len();
    let mut groups: Vec<Vec<FusedResult>> = Vec::new();
    let mut slots: AHashMap<String, usize> = AHashMap::new();

    for result in results {
        let slot = match slots.get(result.category()) {
            Some(&slot) => slot,
            None => {
                slots.insert(result.category().to_string(), groups.len());
                groups.push(Vec::new());
                groups.len() - 1
            }
        };
        if groups[slot].len() < max_per_category {
            groups[slot].push(result);
        }
    }

    let mut selected: Vec<FusedResult> = groups.into_iter().flatten().collect();
    selected.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    if selected.len() < total {
        tracing::debug!(
            kept = selected.len(),
            dropped = total - selected.len(),
            categories = slots.len(),
            "diversity cap applied"
        );
    }
    selected
}
