//! Information-retrieval metrics over a ranked list
//!
//! Relevance is graded per position by fuzzy title matching against the
//! expected titles of a test case. All metrics see at most the first
//! [`METRIC_WINDOW`] positions.

use crate::retrieval::{FusedResult, UNKNOWN_CATEGORY};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

/// Cutoffs reported for precision, recall and NDCG
pub const K_VALUES: [usize; 5] = [1, 3, 5, 10, 20];

/// Positions considered when grading
pub const METRIC_WINDOW: usize = 20;

/// Positions considered by the title match score
pub const TITLE_MATCH_WINDOW: usize = 10;

/// Composite weights: precision@5, ndcg@5, title match, mrr, diversity, speed
const WEIGHTS: [f64; 6] = [0.25, 0.25, 0.20, 0.15, 0.10, 0.05];

/// What the metric engine needs to know about a ranked item
pub trait RankedDoc {
    fn title(&self) -> &str;

    /// Alternative title, empty when absent
    fn alt_title(&self) -> &str;

    /// Diversity bucket
    fn category(&self) -> &str;
}

impl RankedDoc for FusedResult {
    fn title(&self) -> &str {
        FusedResult::title(self)
    }

    fn alt_title(&self) -> &str {
        FusedResult::alt_title(self)
    }

    fn category(&self) -> &str {
        FusedResult::category(self)
    }
}

/// Relevance grade of one ranked position
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Irrelevant = 0,
    Good = 1,
    Excellent = 2,
    Perfect = 3,
}

impl Grade {
    pub fn gain(self) -> f64 {
        f64::from(self as u8)
    }

    pub fn is_relevant(self) -> bool {
        self > Grade::Irrelevant
    }
}

struct Expected {
    text: String,
    words: HashSet<String>,
}

impl Expected {
    fn parse(titles: &[String]) -> Vec<Self> {
        titles
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .map(|text| Self {
                words: text.split_whitespace().map(str::to_string).collect(),
                text,
            })
            .collect()
    }
}

struct DocText {
    title: String,
    alt_title: String,
    words: HashSet<String>,
}

impl DocText {
    fn new<D: RankedDoc>(doc: &D) -> Self {
        let title = doc.title().to_lowercase();
        let alt_title = doc.alt_title().to_lowercase();
        let words = title
            .split_whitespace()
            .chain(alt_title.split_whitespace())
            .map(str::to_string)
            .collect();
        Self {
            title,
            alt_title,
            words,
        }
    }

    fn contains(&self, expected: &Expected) -> bool {
        self.title.contains(&expected.text) || self.alt_title.contains(&expected.text)
    }

    fn overlap(&self, expected: &Expected) -> usize {
        expected.words.intersection(&self.words).count()
    }
}

fn grade_text(doc: &DocText, expected: &[Expected]) -> Grade {
    expected
        .iter()
        .map(|e| {
            let overlap = doc.overlap(e) as f64;
            let needed = e.words.len() as f64;
            if doc.contains(e) {
                Grade::Perfect
            } else if overlap >= needed * 0.8 {
                Grade::Excellent
            } else if overlap >= needed * 0.5 {
                Grade::Good
            } else {
                Grade::Irrelevant
            }
        })
        .max()
        .unwrap_or(Grade::Irrelevant)
}

/// Grade one document against the expected titles (best match wins)
pub fn grade<D: RankedDoc>(doc: &D, expected_titles: &[String]) -> Grade {
    grade_text(&DocText::new(doc), &Expected::parse(expected_titles))
}

/// Grades for the first [`METRIC_WINDOW`] positions
pub fn grade_all<D: RankedDoc>(docs: &[D], expected_titles: &[String]) -> Vec<Grade> {
    let expected = Expected::parse(expected_titles);
    docs.iter()
        .take(METRIC_WINDOW)
        .map(|d| grade_text(&DocText::new(d), &expected))
        .collect()
}

/// Relevant items among the first `k`, divided by `k`
pub fn precision_at_k(relevant: &[bool], k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    let hits = relevant.iter().take(k).filter(|r| **r).count();
    hits as f64 / k as f64
}

/// Relevant items among the first `k`, divided by the expected-set size
pub fn recall_at_k(relevant: &[bool], total_expected: usize, k: usize) -> f64 {
    if k == 0 || total_expected == 0 {
        return 0.0;
    }
    let hits = relevant.iter().take(k).filter(|r| **r).count();
    (hits as f64 / total_expected as f64).min(1.0)
}

fn dcg(gains: impl Iterator<Item = f64>) -> f64 {
    gains
        .enumerate()
        .map(|(i, gain)| gain / (i as f64 + 2.0).log2())
        .sum()
}

/// DCG@k over the grades divided by DCG@k of the same grades sorted descending
pub fn ndcg_at_k(grades: &[Grade], k: usize) -> f64 {
    if k == 0 || grades.is_empty() {
        return 0.0;
    }
    let actual = dcg(grades.iter().take(k).map(|g| g.gain()));

    let mut ideal_order = grades.to_vec();
    ideal_order.sort_by(|a, b| b.cmp(a));
    let ideal = dcg(ideal_order.iter().take(k).map(|g| g.gain()));

    if ideal > 0.0 {
        (actual / ideal).min(1.0)
    } else {
        0.0
    }
}

/// 1 / rank of the first relevant item, 0 when none is relevant
pub fn reciprocal_rank(relevant: &[bool]) -> f64 {
    relevant
        .iter()
        .position(|r| *r)
        .map(|i| 1.0 / (i as f64 + 1.0))
        .unwrap_or(0.0)
}

/// Mean of precision at each relevant position
pub fn average_precision(relevant: &[bool]) -> f64 {
    let mut seen = 0usize;
    let mut sum = 0.0;
    for (i, is_relevant) in relevant.iter().enumerate() {
        if *is_relevant {
            seen += 1;
            sum += seen as f64 / (i as f64 + 1.0);
        }
    }
    if seen == 0 {
        0.0
    } else {
        sum / seen as f64
    }
}

/// Best positional match of every expected title within the top
/// [`TITLE_MATCH_WINDOW`], averaged over expected titles.
///
/// An exact substring at rank `r` scores `3 / r`; partial word overlap scores
/// `2 × overlap_ratio / r`.
pub fn title_match_score<D: RankedDoc>(docs: &[D], expected_titles: &[String]) -> f64 {
    let expected = Expected::parse(expected_titles);
    if expected.is_empty() || docs.is_empty() {
        return 0.0;
    }
    let texts: Vec<DocText> = docs
        .iter()
        .take(TITLE_MATCH_WINDOW)
        .map(DocText::new)
        .collect();

    let total: f64 = expected
        .iter()
        .map(|e| {
            texts
                .iter()
                .enumerate()
                .map(|(i, doc)| {
                    let rank = i as f64 + 1.0;
                    if doc.contains(e) {
                        3.0 / rank
                    } else {
                        let overlap = doc.overlap(e);
                        if overlap > 0 {
                            (overlap as f64 / e.words.len() as f64) * 2.0 / rank
                        } else {
                            0.0
                        }
                    }
                })
                .fold(0.0, f64::max)
        })
        .sum();

    total / expected.len() as f64
}

/// Normalized Shannon entropy of categories over the top [`METRIC_WINDOW`]
pub fn diversity_score<D: RankedDoc>(docs: &[D]) -> f64 {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for doc in docs.iter().take(METRIC_WINDOW) {
        let category = if doc.category().is_empty() {
            UNKNOWN_CATEGORY
        } else {
            doc.category()
        };
        *counts.entry(category).or_insert(0) += 1;
    }

    let total: usize = counts.values().sum();
    if total <= 1 {
        return 0.0;
    }

    let entropy: f64 = counts
        .values()
        .map(|&count| {
            let p = count as f64 / total as f64;
            -p * p.log2()
        })
        .sum();
    let max_entropy = (counts.len().min(total) as f64).log2();

    if max_entropy > 0.0 {
        entropy / max_entropy
    } else {
        0.0
    }
}

/// `1 / (1 + seconds)`, clipped to `[0, 1]`
pub fn speed_score(elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 1.0;
    }
    (1.0 / (1.0 + secs)).clamp(0.0, 1.0)
}

/// Metrics for one query, or the mean over a suite
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSet {
    pub precision_at_k: BTreeMap<usize, f64>,
    pub recall_at_k: BTreeMap<usize, f64>,
    pub ndcg_at_k: BTreeMap<usize, f64>,
    pub mrr: f64,
    #[serde(rename = "map_score")]
    pub map: f64,
    pub title_match_score: f64,
    pub diversity_score: f64,
    pub speed_score: f64,
    /// Category → mean of precision@5 and ndcg@5
    #[serde(default)]
    pub category_scores: BTreeMap<String, f64>,
}

impl MetricSet {
    /// Evaluate a ranked list against the expected titles of one query
    pub fn evaluate<D: RankedDoc>(
        docs: &[D],
        expected_titles: &[String],
        elapsed: Duration,
        category: &str,
    ) -> Self {
        let grades = grade_all(docs, expected_titles);
        let relevant: Vec<bool> = grades.iter().map(|g| g.is_relevant()).collect();
        let total_expected = expected_titles.len();

        let mut metrics = Self {
            mrr: reciprocal_rank(&relevant),
            map: average_precision(&relevant),
            title_match_score: title_match_score(docs, expected_titles),
            diversity_score: diversity_score(docs),
            speed_score: speed_score(elapsed),
            ..Default::default()
        };
        for k in K_VALUES {
            metrics.precision_at_k.insert(k, precision_at_k(&relevant, k));
            metrics
                .recall_at_k
                .insert(k, recall_at_k(&relevant, total_expected, k));
            metrics.ndcg_at_k.insert(k, ndcg_at_k(&grades, k));
        }
        let category_score = (metrics.precision(5) + metrics.ndcg(5)) / 2.0;
        metrics
            .category_scores
            .insert(category.to_string(), category_score);
        metrics
    }

    pub fn precision(&self, k: usize) -> f64 {
        self.precision_at_k.get(&k).copied().unwrap_or(0.0)
    }

    pub fn recall(&self, k: usize) -> f64 {
        self.recall_at_k.get(&k).copied().unwrap_or(0.0)
    }

    pub fn ndcg(&self, k: usize) -> f64 {
        self.ndcg_at_k.get(&k).copied().unwrap_or(0.0)
    }

    /// Weighted 0–100 quality figure
    pub fn composite_score(&self) -> f64 {
        let parts = [
            self.precision(5),
            self.ndcg(5),
            self.title_match_score,
            self.mrr,
            self.diversity_score,
            self.speed_score,
        ];
        let score: f64 = WEIGHTS.iter().zip(parts).map(|(w, v)| w * v * 100.0).sum();
        score.clamp(0.0, 100.0)
    }

    /// Arithmetic mean of every field; category scores average per category
    pub fn aggregate(sets: &[MetricSet]) -> MetricSet {
        if sets.is_empty() {
            return MetricSet::default();
        }
        let n = sets.len() as f64;
        let mean = |f: &dyn Fn(&MetricSet) -> f64| sets.iter().map(f).sum::<f64>() / n;

        let mut aggregated = MetricSet {
            mrr: mean(&|m| m.mrr),
            map: mean(&|m| m.map),
            title_match_score: mean(&|m| m.title_match_score),
            diversity_score: mean(&|m| m.diversity_score),
            speed_score: mean(&|m| m.speed_score),
            ..Default::default()
        };
        for k in K_VALUES {
            aggregated.precision_at_k.insert(k, mean(&|m| m.precision(k)));
            aggregated.recall_at_k.insert(k, mean(&|m| m.recall(k)));
            aggregated.ndcg_at_k.insert(k, mean(&|m| m.ndcg(k)));
        }

        let mut by_category: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for set in sets {
            for (category, score) in &set.category_scores {
                by_category.entry(category).or_default().push(*score);
            }
        }
        aggregated.category_scores = by_category
            .into_iter()
            .map(|(category, scores)| {
                let avg = scores.iter().sum::<f64>() / scores.len() as f64;
                (category.to_string(), avg)
            })
            .collect();

        aggregated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Doc {
        title: &'static str,
        alt: &'static str,
        category: &'static str,
    }

    impl RankedDoc for Doc {
        fn title(&self) -> &str {
            self.title
        }
        fn alt_title(&self) -> &str {
            self.alt
        }
        fn category(&self) -> &str {
            self.category
        }
    }

    fn doc(title: &'static str) -> Doc {
        Doc {
            title,
            alt: "",
            category: "books",
        }
    }

    fn expected(titles: &[&str]) -> Vec<String> {
        titles.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn exact_title_scenario() {
        let docs = vec![doc("Московское метро"), doc("Неизвестная книга")];
        let exp = expected(&["Московское метро"]);

        let grades = grade_all(&docs, &exp);
        assert_eq!(grades, vec![Grade::Perfect, Grade::Irrelevant]);

        let metrics = MetricSet::evaluate(&docs, &exp, Duration::from_millis(100), "metro");
        assert_eq!(metrics.mrr, 1.0);
        assert!((metrics.ndcg(1) - 1.0).abs() < 1e-12);
        assert_eq!(metrics.precision(1), 1.0);
        assert_eq!(metrics.recall(1), 1.0);
        assert!(metrics.category_scores.contains_key("metro"));
    }

    #[test]
    fn grades_by_word_overlap() {
        let exp = expected(&["архитектурные памятники москвы"]);
        // 2 of 3 words: below 80%, above 50%
        assert_eq!(grade(&doc("Памятники Москвы XIX века"), &exp), Grade::Good);
        // case-insensitive exact substring
        assert_eq!(
            grade(&doc("АРХИТЕКТУРНЫЕ ПАМЯТНИКИ МОСКВЫ. Альбом"), &exp),
            Grade::Perfect
        );
        let alt = Doc {
            title: "Альбом",
            alt: "москвы памятники архитектурные",
            category: "x",
        };
        assert_eq!(grade(&alt, &exp), Grade::Excellent);
        assert_eq!(grade(&doc("Пушкин"), &exp), Grade::Irrelevant);
    }

    #[test]
    fn precision_and_recall_stay_in_unit_range() {
        let relevant = [true, false, true, true, false];
        for k in K_VALUES {
            let p = precision_at_k(&relevant, k);
            let r = recall_at_k(&relevant, 2, k);
            assert!((0.0..=1.0).contains(&p), "p@{k} = {p}");
            assert!((0.0..=1.0).contains(&r), "r@{k} = {r}");
        }
        assert_eq!(precision_at_k(&relevant, 5), 0.6);
        assert_eq!(precision_at_k(&relevant, 0), 0.0);
        assert_eq!(recall_at_k(&relevant, 0, 5), 0.0);
    }

    #[test]
    fn ndcg_bounds_and_ideal_order() {
        use Grade::*;
        let sequences: Vec<Vec<Grade>> = vec![
            vec![Irrelevant, Perfect, Good],
            vec![Good, Good, Excellent, Irrelevant, Perfect],
            vec![Irrelevant, Irrelevant],
            vec![Perfect, Excellent, Good, Irrelevant],
        ];
        for grades in &sequences {
            for k in K_VALUES {
                let v = ndcg_at_k(grades, k);
                assert!((0.0..=1.0).contains(&v), "ndcg@{k} = {v} for {grades:?}");
            }
        }
        for k in K_VALUES {
            assert!((ndcg_at_k(&sequences[3], k) - 1.0).abs() < 1e-12);
        }
        assert_eq!(ndcg_at_k(&sequences[2], 5), 0.0);
    }

    #[test]
    fn reciprocal_rank_and_average_precision() {
        assert_eq!(reciprocal_rank(&[false, false, true]), 1.0 / 3.0);
        assert_eq!(reciprocal_rank(&[false, false]), 0.0);
        // relevant at 1 and 3: (1/1 + 2/3) / 2
        let ap = average_precision(&[true, false, true]);
        assert!((ap - (1.0 + 2.0 / 3.0) / 2.0).abs() < 1e-12);
        assert_eq!(average_precision(&[]), 0.0);
    }

    #[test]
    fn title_match_rewards_early_exact_matches() {
        let exp = expected(&["Палех"]);
        let first = vec![doc("Палех"), doc("Другое")];
        let second = vec![doc("Другое"), doc("Палех")];
        assert_eq!(title_match_score(&first, &exp), 3.0);
        assert_eq!(title_match_score(&second, &exp), 1.5);
        assert_eq!(title_match_score(&Vec::<Doc>::new(), &exp), 0.0);
    }

    #[test]
    fn diversity_entropy() {
        let same: Vec<Doc> = (0..4).map(|_| doc("x")).collect();
        assert_eq!(diversity_score(&same), 0.0);

        let even = vec![
            Doc { title: "a", alt: "", category: "A" },
            Doc { title: "b", alt: "", category: "B" },
        ];
        assert!((diversity_score(&even) - 1.0).abs() < 1e-12);
        assert_eq!(diversity_score(&even[..1]), 0.0);
    }

    #[test]
    fn speed_score_decreases_with_time() {
        assert_eq!(speed_score(Duration::ZERO), 1.0);
        assert_eq!(speed_score(Duration::from_secs(1)), 0.5);
        assert!(speed_score(Duration::from_secs(5)) < speed_score(Duration::from_secs(2)));
    }

    #[test]
    fn composite_is_clipped_to_100() {
        let mut metrics = MetricSet {
            mrr: 1.0,
            title_match_score: 3.0,
            diversity_score: 1.0,
            speed_score: 1.0,
            ..Default::default()
        };
        metrics.precision_at_k.insert(5, 1.0);
        metrics.ndcg_at_k.insert(5, 1.0);
        assert_eq!(metrics.composite_score(), 100.0);
        assert_eq!(MetricSet::default().composite_score(), 0.0);

        metrics.title_match_score = 0.5;
        // 25 + 25 + 10 + 15 + 10 + 5
        assert!((metrics.composite_score() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn aggregate_averages_fields_and_categories() {
        let docs = vec![doc("Палех")];
        let a = MetricSet::evaluate(&docs, &expected(&["Палех"]), Duration::ZERO, "art");
        let b = MetricSet::evaluate(&docs, &expected(&["Метро"]), Duration::ZERO, "metro");
        let agg = MetricSet::aggregate(&[a, b]);
        assert_eq!(agg.mrr, 0.5);
        assert_eq!(agg.precision(1), 0.5);
        assert_eq!(agg.category_scores.len(), 2);
        assert_eq!(MetricSet::aggregate(&[]), MetricSet::default());
    }
}
