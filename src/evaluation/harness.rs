//! Suite runner and aggregation

use crate::classifier::Classifier;
use crate::engine::SearchBackend;
use crate::error::Result;
use crate::evaluation::{MetricSet, TestCase, TestSuite};
use crate::normalize::{Normalizer, VariantSet};
use crate::retrieval::{FusedResult, SearchPipeline, SearchRequest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Results listed by single-query analysis
const ANALYSIS_DEPTH: usize = 10;

/// Outcome of one test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub query: String,
    pub description: String,
    pub category: String,
    pub passed: bool,
    /// Coverage score of expected titles within the window, 0–100
    pub score: f64,
    pub composite_score: f64,
    /// Expected title → first 1-based position it was located at
    pub found_positions: BTreeMap<String, usize>,
    pub total_results: usize,
    /// Seconds
    pub execution_time: f64,
    pub details: String,
    /// Search error, when the case ran against a failed search
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metrics: MetricSet,
}

/// Pass statistics for one query category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub passed: usize,
    pub total: usize,
    pub pass_rate: f64,
    pub avg_score: f64,
}

/// Short record of a failed case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedTest {
    pub query: String,
    pub description: String,
    pub score: f64,
    pub composite_score: f64,
    pub details: String,
}

/// Aggregated result of a suite run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub timestamp: String,
    pub total_tests: usize,
    pub passed_tests: usize,
    pub failed_tests: usize,
    pub pass_rate: f64,
    pub avg_score: f64,
    pub avg_composite_score: f64,
    pub avg_execution_time: f64,
    pub total_execution_time: f64,
    #[serde(default)]
    pub category_stats: BTreeMap<String, CategoryStats>,
    #[serde(default)]
    pub aggregated_metrics: MetricSet,
    #[serde(default)]
    pub failed_tests_details: Vec<FailedTest>,
    #[serde(default)]
    pub results: Vec<TestResult>,
}

/// Overall verdict derived from the pass rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityGrade {
    Excellent,
    Good,
    Satisfactory,
    Poor,
}

impl QualityGrade {
    pub fn from_pass_rate(pass_rate: f64) -> Self {
        if pass_rate >= 80.0 {
            QualityGrade::Excellent
        } else if pass_rate >= 70.0 {
            QualityGrade::Good
        } else if pass_rate >= 50.0 {
            QualityGrade::Satisfactory
        } else {
            QualityGrade::Poor
        }
    }

    /// Process exit code for CI
    pub fn exit_code(self) -> i32 {
        match self {
            QualityGrade::Excellent | QualityGrade::Good => 0,
            QualityGrade::Satisfactory => 1,
            QualityGrade::Poor => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QualityGrade::Excellent => "excellent",
            QualityGrade::Good => "good, room for improvement",
            QualityGrade::Satisfactory => "satisfactory, needs improvement",
            QualityGrade::Poor => "poor",
        }
    }
}

impl RunSummary {
    /// Aggregate per-case results; `total_time` is wall time of the whole run
    pub fn from_results(results: Vec<TestResult>, total_time: Duration) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        let mean = |f: fn(&TestResult) -> f64| {
            if total == 0 {
                0.0
            } else {
                results.iter().map(f).sum::<f64>() / total as f64
            }
        };

        let mut grouped: BTreeMap<String, Vec<&TestResult>> = BTreeMap::new();
        for result in &results {
            grouped.entry(result.category.clone()).or_default().push(result);
        }
        let category_stats = grouped
            .into_iter()
            .map(|(category, tests)| {
                let passed = tests.iter().filter(|t| t.passed).count();
                let stats = CategoryStats {
                    passed,
                    total: tests.len(),
                    pass_rate: passed as f64 / tests.len() as f64 * 100.0,
                    avg_score: tests.iter().map(|t| t.score).sum::<f64>() / tests.len() as f64,
                };
                (category, stats)
            })
            .collect();

        let metric_sets: Vec<MetricSet> = results.iter().map(|r| r.metrics.clone()).collect();
        let failed_tests_details = results
            .iter()
            .filter(|r| !r.passed)
            .map(|r| FailedTest {
                query: r.query.clone(),
                description: r.description.clone(),
                score: r.score,
                composite_score: r.composite_score,
                details: r.details.clone(),
            })
            .collect();

        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            total_tests: total,
            passed_tests: passed,
            failed_tests: total - passed,
            pass_rate: if total == 0 {
                0.0
            } else {
                passed as f64 / total as f64 * 100.0
            },
            avg_score: mean(|r| r.score),
            avg_composite_score: mean(|r| r.composite_score),
            avg_execution_time: mean(|r| r.execution_time),
            total_execution_time: total_time.as_secs_f64(),
            category_stats,
            aggregated_metrics: MetricSet::aggregate(&metric_sets),
            failed_tests_details,
            results,
        }
    }

    pub fn grade(&self) -> QualityGrade {
        QualityGrade::from_pass_rate(self.pass_rate)
    }
}

/// First 1-based position of every expected title found within `window`.
///
/// A title counts as found on an exact substring match against title or
/// alternative title, or when any of its words longer than three characters
/// occurs in either.
pub fn found_positions(
    results: &[FusedResult],
    expected_titles: &[String],
    window: usize,
) -> BTreeMap<String, usize> {
    let mut found = BTreeMap::new();
    for (i, result) in results.iter().take(window).enumerate() {
        let title = result.title().to_lowercase();
        let alt = result.alt_title().to_lowercase();
        for expected in expected_titles {
            if found.contains_key(expected) {
                continue;
            }
            let lower = expected.to_lowercase();
            let hit = title.contains(&lower)
                || alt.contains(&lower)
                || lower
                    .split_whitespace()
                    .filter(|w| w.chars().count() > 3)
                    .any(|w| title.contains(w) || alt.contains(w));
            if hit {
                found.insert(expected.clone(), i + 1);
            }
        }
    }
    found
}

/// Coverage of expected titles plus a bonus for early positions, capped at 100
pub fn coverage_score(
    expected_titles: &[String],
    found: &BTreeMap<String, usize>,
    window: usize,
) -> f64 {
    if expected_titles.is_empty() {
        return 100.0;
    }
    let base = found.len() as f64 / expected_titles.len() as f64 * 100.0;
    let bonus: f64 = found
        .values()
        .map(|&position| match position {
            p if p <= 3 => 20.0,
            p if p <= 5 => 10.0,
            p if p <= window => 5.0,
            _ => 0.0,
        })
        .sum();
    (base + bonus).min(100.0)
}

fn describe(expected_titles: &[String], found: &BTreeMap<String, usize>) -> String {
    let mut parts: Vec<String> = expected_titles
        .iter()
        .filter_map(|t| found.get(t).map(|p| format!("found '{}' at position {}", t, p)))
        .collect();
    parts.extend(
        expected_titles
            .iter()
            .filter(|t| !found.contains_key(*t))
            .map(|t| format!("'{}' not found", t)),
    );
    if parts.is_empty() {
        "no matches".to_string()
    } else {
        parts.join("; ")
    }
}

/// Ranked results and metrics for an ad-hoc query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryAnalysis {
    pub query: String,
    pub category: String,
    pub variants: Vec<String>,
    pub publication_types: Vec<String>,
    pub total_results: usize,
    pub execution_time: f64,
    pub top: Vec<FusedResult>,
    /// Present when expected titles were supplied
    pub metrics: Option<MetricSet>,
    pub composite_score: Option<f64>,
}

/// Runs test cases through the full search pipeline
pub struct Harness<'a, B> {
    pipeline: &'a SearchPipeline<B>,
    normalizer: &'a dyn Normalizer,
    classifier: &'a Classifier,
    pass_threshold: f64,
}

impl<'a, B: SearchBackend> Harness<'a, B> {
    pub fn new(
        pipeline: &'a SearchPipeline<B>,
        normalizer: &'a dyn Normalizer,
        classifier: &'a Classifier,
    ) -> Self {
        Self {
            pipeline,
            normalizer,
            classifier,
            pass_threshold: 70.0,
        }
    }

    pub fn with_pass_threshold(mut self, threshold: f64) -> Self {
        self.pass_threshold = threshold;
        self
    }

    fn prepare(&self, query: &str) -> Result<(VariantSet, Vec<String>)> {
        let publication_types = self.classifier.detect_publication_types(query);
        let cleaned = self.classifier.clean_query(query);
        Ok((self.normalizer.variants(&cleaned)?, publication_types))
    }

    async fn search(&self, query: &str) -> Result<(Vec<FusedResult>, VariantSet, Vec<String>)> {
        let (variants, types) = self.prepare(query)?;
        let outcome = self
            .pipeline
            .execute(&SearchRequest::new(variants.clone()))
            .await?;
        Ok((outcome.results, variants, types))
    }

    /// Run one case. A failed search is recorded as a zero-result failure.
    pub async fn run_case(&self, case: &TestCase) -> TestResult {
        tracing::info!("Running test: {}", case.description);
        let category = self.classifier.classify(&case.query).to_string();

        let start = Instant::now();
        let (results, error) = match self.search(&case.query).await {
            Ok((results, _, _)) => (results, None),
            Err(e) => {
                tracing::error!("Search failed for '{}': {}", case.query, e);
                (Vec::new(), Some(e.to_string()))
            }
        };
        let elapsed = start.elapsed();

        let found = found_positions(&results, &case.expected_titles, case.expected_in_top);
        let score = coverage_score(&case.expected_titles, &found, case.expected_in_top);
        let metrics = MetricSet::evaluate(&results, &case.expected_titles, elapsed, &category);
        let composite_score = metrics.composite_score();
        let passed = composite_score >= self.pass_threshold && !found.is_empty();

        let mut details = describe(&case.expected_titles, &found);
        if let Some(e) = &error {
            details = format!("search failed: {}; {}", e, details);
        }

        TestResult {
            query: case.query.clone(),
            description: case.description.clone(),
            category: self.classifier.label(&category).to_string(),
            passed,
            score,
            composite_score,
            found_positions: found,
            total_results: results.len(),
            execution_time: elapsed.as_secs_f64(),
            details,
            error,
            metrics,
        }
    }

    /// Run every case sequentially in declared order
    pub async fn run(&self, suite: &TestSuite) -> RunSummary {
        tracing::info!("Running {} search quality tests", suite.len());
        let start = Instant::now();

        let mut results = Vec::with_capacity(suite.len());
        for case in suite.cases() {
            results.push(self.run_case(case).await);
        }

        let summary = RunSummary::from_results(results, start.elapsed());
        tracing::info!(
            passed = summary.passed_tests,
            total = summary.total_tests,
            pass_rate = summary.pass_rate,
            "search quality run finished"
        );
        summary
    }

    /// Search one query and, when expected titles are given, score the ranking
    pub async fn analyze(&self, query: &str, expected_titles: &[String]) -> Result<QueryAnalysis> {
        let category = self.classifier.classify(query).to_string();
        let start = Instant::now();
        let (results, variants, publication_types) = self.search(query).await?;
        let elapsed = start.elapsed();

        let metrics = if expected_titles.is_empty() {
            None
        } else {
            Some(MetricSet::evaluate(&results, expected_titles, elapsed, &category))
        };

        Ok(QueryAnalysis {
            query: query.to_string(),
            composite_score: metrics.as_ref().map(MetricSet::composite_score),
            metrics,
            category,
            variants: variants.as_slice().to_vec(),
            publication_types,
            total_results: results.len(),
            execution_time: elapsed.as_secs_f64(),
            top: results.into_iter().take(ANALYSIS_DEPTH).collect(),
        })
    }
}
