//! Relevance rescoring
//!
//! A [`RescoringPolicy`] maps a fused record to its final score. Two
//! policies exist; the active one is chosen by `ranking.policy`.

use crate::config::PolicyKind;
use crate::error::{FolioError, Result};
use crate::retrieval::{FusedResult, Provenance};
use regex::Regex;
use std::collections::HashSet;

/// Fields whose highlights count toward the title bonus
const TITLE_FIELDS: &[&str] = &["title", "book_name"];

const MULTI_PAGE_BONUS: f64 = 40.0;
const PAGE_BONUS_CAP: f64 = 200.0;

/// Extracts the terms an engine wrapped in `<em>` highlight tags
#[derive(Debug, Clone)]
pub struct TermCounter {
    pattern: Regex,
}

impl TermCounter {
    pub fn new() -> Result<Self> {
        let pattern = Regex::new(r"(?is)<em>(.*?)</em>")
            .map_err(|e| FolioError::Config(format!("Invalid highlight pattern: {}", e)))?;
        Ok(Self { pattern })
    }

    /// Number of distinct highlighted terms across the fragments.
    /// Terms compare case-insensitively.
    pub fn distinct<'a>(&self, fragments: impl IntoIterator<Item = &'a String>) -> usize {
        let mut terms = HashSet::new();
        for fragment in fragments {
            for capture in self.pattern.captures_iter(fragment) {
                let term = capture[1].trim().to_lowercase();
                if !term.is_empty() {
                    terms.insert(term);
                }
            }
        }
        terms.len()
    }
}

/// Computes the final score of a fused record
pub trait RescoringPolicy: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    fn rescore(&self, result: &FusedResult) -> f64;
}

/// Baseline plus bonuses for highlighted terms and multiple matched pages
#[derive(Debug, Clone)]
pub struct AdditivePolicy {
    terms: TermCounter,
}

impl AdditivePolicy {
    pub fn new() -> Result<Self> {
        Ok(Self {
            terms: TermCounter::new()?,
        })
    }

    fn title_bonus(&self, result: &FusedResult) -> f64 {
        match self.terms.distinct(result.highlight_fragments(TITLE_FIELDS)) {
            0 => 0.0,
            1 => 30.0,
            _ => 80.0,
        }
    }

    fn page_bonus(&self, result: &FusedResult) -> f64 {
        let total: f64 = result
            .matched_pages
            .iter()
            .map(|page| match self.terms.distinct(&page.highlights) {
                0 => 0.0,
                1 => 40.0,
                _ => 100.0,
            })
            .sum();
        total.min(PAGE_BONUS_CAP)
    }
}

impl RescoringPolicy for AdditivePolicy {
    fn name(&self) -> &'static str {
        "additive"
    }

    fn rescore(&self, result: &FusedResult) -> f64 {
        let mut score = result.baseline();
        if result.matched_pages.len() >= 2 {
            score += MULTI_PAGE_BONUS;
        }
        score + self.title_bonus(result) + self.page_bonus(result)
    }
}

/// Baseline scaled by provenance
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiplicativePolicy;

impl RescoringPolicy for MultiplicativePolicy {
    fn name(&self) -> &'static str {
        "multiplicative"
    }

    fn rescore(&self, result: &FusedResult) -> f64 {
        let baseline = result.baseline();
        let factor = match result.provenance {
            Provenance::Page => 1.4,
            Provenance::Both => 1.6,
            Provenance::Title if baseline > 200.0 => 1.2,
            Provenance::Title => 0.9,
        };
        baseline * factor
    }
}

/// Applies a policy and orders results by the new score
#[derive(Debug)]
pub struct Rescorer {
    policy: Box<dyn RescoringPolicy>,
}

impl Rescorer {
    pub fn new(kind: PolicyKind) -> Result<Self> {
        let policy: Box<dyn RescoringPolicy> = match kind {
            PolicyKind::Additive => Box::new(AdditivePolicy::new()?),
            PolicyKind::Multiplicative => Box::new(MultiplicativePolicy),
        };
        Ok(Self::with_policy(policy))
    }

    pub fn with_policy(policy: Box<dyn RescoringPolicy>) -> Self {
        Self { policy }
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Rescore every record and sort descending. The sort is stable, so equal
    /// scores keep fusion order.
    pub fn rank(&self, mut results: Vec<FusedResult>) -> Vec<FusedResult> {
        for result in &mut results {
            result.score = self.policy.rescore(result);
        }
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::MatchedPage;

    fn result(provenance: Provenance, title_score: Option<f64>, page_score: Option<f64>) -> FusedResult {
        FusedResult {
            id: "doc".to_string(),
            provenance,
            score: 0.0,
            title_score,
            page_score,
            meta: Default::default(),
            highlight: Default::default(),
            matched_pages: Vec::new(),
            cover_page: None,
        }
    }

    fn page(n: i64, highlight: &str) -> MatchedPage {
        MatchedPage {
            page: Some(n),
            image: None,
            snippet: highlight.to_string(),
            highlights: vec![highlight.to_string()],
        }
    }

    #[test]
    fn counts_distinct_terms_case_insensitively() {
        let fragments = vec![
            "<em>Метро</em> и <em>метро</em>".to_string(),
            "<em>Москва</em>".to_string(),
            "без выделения".to_string(),
        ];
        let counter = TermCounter::new().unwrap();
        assert_eq!(counter.distinct(&fragments), 2);
        assert_eq!(counter.distinct(&Vec::<String>::new()), 0);
    }

    #[test]
    fn additive_title_bonus_steps() {
        let policy = AdditivePolicy::new().unwrap();
        let mut r = result(Provenance::Title, Some(10.0), None);
        assert_eq!(policy.rescore(&r), 10.0);

        r.highlight.insert("title".into(), vec!["<em>Палех</em>".into()]);
        assert_eq!(policy.rescore(&r), 40.0);

        r.highlight
            .insert("book_name".into(), vec!["<em>Палешане</em>".into()]);
        assert_eq!(policy.rescore(&r), 90.0);
    }

    #[test]
    fn additive_page_bonus_is_capped() {
        let policy = AdditivePolicy::new().unwrap();
        let mut r = result(Provenance::Page, None, Some(5.0));
        r.matched_pages = (1..=4).map(|n| page(n, "<em>игорь</em> <em>полк</em>")).collect();
        // 5 + 40 (multi-page) + min(400, 200)
        assert_eq!(policy.rescore(&r), 245.0);
    }

    #[test]
    fn additive_is_monotonic_in_highlights() {
        let policy = AdditivePolicy::new().unwrap();
        let mut r = result(Provenance::Both, Some(10.0), Some(8.0));
        let mut last = policy.rescore(&r);
        for term in ["метро", "москва", "станция"] {
            r.highlight
                .entry("title".into())
                .or_default()
                .push(format!("<em>{term}</em>"));
            r.matched_pages.push(page(r.matched_pages.len() as i64, &format!("<em>{term}</em>")));
            let next = policy.rescore(&r);
            assert!(next >= last);
            last = next;
        }
    }

    #[test]
    fn multiplicative_factors_by_provenance() {
        let policy = MultiplicativePolicy;
        assert_eq!(policy.rescore(&result(Provenance::Page, None, Some(10.0))), 14.0);
        assert_eq!(policy.rescore(&result(Provenance::Both, Some(5.0), Some(10.0))), 16.0);
        assert_eq!(policy.rescore(&result(Provenance::Title, Some(100.0), None)), 90.0);
        let high = policy.rescore(&result(Provenance::Title, Some(300.0), None));
        assert!((high - 360.0).abs() < 1e-9);
    }

    #[test]
    fn rank_sorts_descending_and_keeps_ties_in_order() {
        let mut a = result(Provenance::Title, Some(1.0), None);
        a.id = "a".into();
        let mut b = result(Provenance::Title, Some(3.0), None);
        b.id = "b".into();
        let mut c = result(Provenance::Title, Some(1.0), None);
        c.id = "c".into();

        let ranked = Rescorer::new(PolicyKind::Additive).unwrap().rank(vec![a, b, c]);
        let ids: Vec<&str> = ranked.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert_eq!(ranked[0].score, 3.0);
    }
}
