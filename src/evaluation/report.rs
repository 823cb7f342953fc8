//! Plain-text reports

use crate::evaluation::{MetricSet, QueryAnalysis, RunSummary, K_VALUES};
use std::fmt::Write;

const RULE_WIDTH: usize = 72;

fn rule(c: char) -> String {
    std::iter::repeat(c).take(RULE_WIDTH).collect()
}

/// Metric breakdown for one query or an aggregate
pub fn metrics_report(metrics: &MetricSet, query: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(query) = query {
        let _ = writeln!(out, "Metrics for '{}'", query);
        let _ = writeln!(out, "{}", rule('='));
    }

    let _ = writeln!(out, "Precision@K:");
    for k in K_VALUES {
        let _ = writeln!(out, "  P@{:<2}    {:.3}", k, metrics.precision(k));
    }
    let _ = writeln!(out, "Recall@K:");
    for k in K_VALUES {
        let _ = writeln!(out, "  R@{:<2}    {:.3}", k, metrics.recall(k));
    }
    let _ = writeln!(out, "NDCG@K:");
    for k in K_VALUES {
        let _ = writeln!(out, "  NDCG@{:<2} {:.3}", k, metrics.ndcg(k));
    }

    let _ = writeln!(out, "MRR:         {:.3}", metrics.mrr);
    let _ = writeln!(out, "MAP:         {:.3}", metrics.map);
    let _ = writeln!(out, "Title match: {:.3}", metrics.title_match_score);
    let _ = writeln!(out, "Diversity:   {:.3}", metrics.diversity_score);
    let _ = writeln!(out, "Speed:       {:.3}", metrics.speed_score);
    let _ = writeln!(out, "Composite:   {:.1}/100", metrics.composite_score());

    if !metrics.category_scores.is_empty() {
        let _ = writeln!(out, "By category:");
        for (category, score) in &metrics.category_scores {
            let _ = writeln!(out, "  {}: {:.3}", category, score);
        }
    }
    out
}

/// Full report for a suite run
pub fn summary_report(summary: &RunSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", rule('='));
    let _ = writeln!(out, "SEARCH QUALITY RUN  {}", summary.timestamp);
    let _ = writeln!(out, "{}", rule('='));

    let _ = writeln!(out, "Tests:            {}", summary.total_tests);
    let _ = writeln!(out, "Passed:           {}", summary.passed_tests);
    let _ = writeln!(out, "Failed:           {}", summary.failed_tests);
    let _ = writeln!(out, "Pass rate:        {:.1}%", summary.pass_rate);
    let _ = writeln!(out, "Avg score:        {:.1}/100", summary.avg_score);
    let _ = writeln!(out, "Avg composite:    {:.1}/100", summary.avg_composite_score);
    let _ = writeln!(out, "Avg time:         {:.3}s", summary.avg_execution_time);
    let _ = writeln!(out, "Total time:       {:.1}s", summary.total_execution_time);

    let m = &summary.aggregated_metrics;
    let _ = writeln!(out, "\nAggregated metrics:");
    let _ = writeln!(out, "  Precision@5:    {:.3}", m.precision(5));
    let _ = writeln!(out, "  NDCG@5:         {:.3}", m.ndcg(5));
    let _ = writeln!(out, "  MRR:            {:.3}", m.mrr);
    let _ = writeln!(out, "  MAP:            {:.3}", m.map);
    let _ = writeln!(out, "  Title match:    {:.3}", m.title_match_score);
    let _ = writeln!(out, "  Diversity:      {:.3}", m.diversity_score);
    let _ = writeln!(out, "  Speed:          {:.3}", m.speed_score);

    if !summary.category_stats.is_empty() {
        let _ = writeln!(out, "\nBy category:");
        for (category, stats) in &summary.category_stats {
            let marker = if stats.pass_rate >= 70.0 {
                "ok"
            } else if stats.pass_rate >= 50.0 {
                "warn"
            } else {
                "FAIL"
            };
            let _ = writeln!(
                out,
                "  [{:<4}] {}: {}/{} ({:.1}%, score {:.1})",
                marker, category, stats.passed, stats.total, stats.pass_rate, stats.avg_score
            );
        }
    }

    if !summary.failed_tests_details.is_empty() {
        let _ = writeln!(out, "\nFailed tests:");
        for (i, test) in summary.failed_tests_details.iter().enumerate() {
            let _ = writeln!(
                out,
                "  {}. '{}' (score {:.1}, composite {:.1})",
                i + 1,
                test.query,
                test.score,
                test.composite_score
            );
            if !test.description.is_empty() {
                let _ = writeln!(out, "     {}", test.description);
            }
            let _ = writeln!(out, "     {}", test.details);
        }
    }

    let _ = writeln!(out, "\nOverall: {}", summary.grade().label());
    let _ = writeln!(out, "{}", rule('='));
    out
}

/// Top results of an ad-hoc query, with metrics when available
pub fn analysis_report(analysis: &QueryAnalysis) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Query:    '{}'", analysis.query);
    let _ = writeln!(out, "Category: {}", analysis.category);
    let _ = writeln!(out, "Variants: {}", analysis.variants.join(" | "));
    if !analysis.publication_types.is_empty() {
        let _ = writeln!(out, "Types:    {}", analysis.publication_types.join(", "));
    }
    let _ = writeln!(
        out,
        "Found {} results in {:.3}s",
        analysis.total_results, analysis.execution_time
    );
    let _ = writeln!(out, "{}", rule('-'));

    for (i, result) in analysis.top.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>2}. [{:>8.2}] {} ({}, {})",
            i + 1,
            result.score,
            result.preview(80),
            result.provenance,
            result.category()
        );
        if let Some(year) = &result.meta.book_year {
            let _ = writeln!(out, "      year: {}", year);
        }
        for fragment in result.highlight_fragments(&["title", "book_name"]) {
            let _ = writeln!(out, "      title: {}", fragment);
        }
        for page in result.matched_pages.iter().take(2) {
            let page_no = page
                .page
                .map(|p| p.to_string())
                .unwrap_or_else(|| "?".to_string());
            let snippet: String = page.snippet.chars().take(120).collect();
            let _ = writeln!(out, "      page {}: {}", page_no, snippet);
        }
    }

    if let Some(metrics) = &analysis.metrics {
        let _ = writeln!(out, "{}", rule('-'));
        out.push_str(&metrics_report(metrics, None));
    }
    out
}
