//! Offline search quality evaluation
//!
//! A [`TestSuite`] of curated queries runs through the full search pipeline.
//! Every ranking is graded against expected titles, scored with standard IR
//! metrics and a weighted composite, then aggregated into a [`RunSummary`].

mod harness;
mod metrics;
mod report;
mod suite;

pub use harness::{
    coverage_score, found_positions, CategoryStats, FailedTest, Harness, QualityGrade,
    QueryAnalysis, RunSummary, TestResult,
};
pub use metrics::{
    average_precision, diversity_score, grade, grade_all, ndcg_at_k, precision_at_k,
    recall_at_k, reciprocal_rank, speed_score, title_match_score, Grade, MetricSet, RankedDoc,
    K_VALUES, METRIC_WINDOW, TITLE_MATCH_WINDOW,
};
pub use report::{analysis_report, metrics_report, summary_report};
pub use suite::{TestCase, TestSuite};
