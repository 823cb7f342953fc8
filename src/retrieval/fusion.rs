//! Merging title and page hit lists into one record per document

use crate::engine::MatchCandidate;
use crate::query::QueryKind;
use crate::retrieval::FusedResult;
use ahash::AHashMap;

/// Merges the two hit lists of one request
#[derive(Debug, Clone)]
pub struct Fusion {
    cover_url_template: String,
}

impl Fusion {
    /// `cover_url_template` must contain `{book_id}`
    pub fn new(cover_url_template: impl Into<String>) -> Self {
        Self {
            cover_url_template: cover_url_template.into(),
        }
    }

    /// Combine title and page hits keyed by document id.
    ///
    /// Each id appears once. A document seen in both lists becomes
    /// [`Provenance::Both`](crate::retrieval::Provenance::Both), keeps its
    /// title score and gains the page score and matched pages. Output keeps
    /// the order of first appearance (title hits first); no ranking happens
    /// here.
    pub fn fuse(
        &self,
        title_hits: Vec<MatchCandidate>,
        page_hits: Vec<MatchCandidate>,
    ) -> Vec<FusedResult> {
        let mut results: Vec<FusedResult> = Vec::with_capacity(title_hits.len() + page_hits.len());
        let mut index: AHashMap<String, usize> = AHashMap::new();

        for (kind, hits) in [(QueryKind::Title, title_hits), (QueryKind::Page, page_hits)] {
            for candidate in hits {
                match index.get(&candidate.id) {
                    Some(&at) => Self::merge(&mut results[at], candidate, kind),
                    None => {
                        index.insert(candidate.id.clone(), results.len());
                        results.push(FusedResult::from_candidate(
                            candidate,
                            kind,
                            &self.cover_url_template,
                        ));
                    }
                }
            }
        }

        tracing::debug!(fused = results.len(), "fused hit lists");
        results
    }

    fn merge(existing: &mut FusedResult, candidate: MatchCandidate, kind: QueryKind) {
        let merged = existing.provenance.merged_with(kind);
        if merged == existing.provenance {
            // Repeated id inside one list: first occurrence wins
            tracing::debug!(id = %candidate.id, query = %kind, "duplicate hit ignored");
            return;
        }

        existing.provenance = merged;
        match kind {
            QueryKind::Title => {
                existing.title_score = Some(candidate.score);
                for (field, fragments) in candidate.highlight {
                    existing.highlight.entry(field).or_insert(fragments);
                }
            }
            QueryKind::Page => {
                existing.page_score = Some(candidate.score);
                existing.attach_pages(&candidate.inner_hits);
            }
        }
        existing.score = existing.baseline();
    }
}
