//! Comparison of two recorded runs and short-term trend analysis

use crate::evaluation::RunSummary;
use crate::history::HistoryEntry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Write;

/// Relative change between two values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "percent")]
pub enum Change {
    /// The old value was zero
    NotApplicable,
    Percent(f64),
}

impl Change {
    pub fn between(old: f64, new: f64) -> Self {
        if old == 0.0 {
            Change::NotApplicable
        } else {
            Change::Percent((new - old) / old * 100.0)
        }
    }

    /// +1 improved, -1 degraded, 0 neither
    fn direction(self, lower_is_better: bool) -> i8 {
        match self {
            Change::NotApplicable => 0,
            Change::Percent(p) if p == 0.0 => 0,
            Change::Percent(p) => {
                let up = p > 0.0;
                if up != lower_is_better {
                    1
                } else {
                    -1
                }
            }
        }
    }
}

impl std::fmt::Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Change::NotApplicable => write!(f, "N/A"),
            Change::Percent(p) if *p > 0.0 => write!(f, "+{:.1}%", p),
            Change::Percent(p) => write!(f, "{:.1}%", p),
        }
    }
}

/// One compared metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricComparison {
    pub name: String,
    pub old: f64,
    pub new: f64,
    pub change: Change,
    pub lower_is_better: bool,
}

impl MetricComparison {
    fn new(name: &str, old: f64, new: f64, lower_is_better: bool) -> Self {
        Self {
            name: name.to_string(),
            old,
            new,
            change: Change::between(old, new),
            lower_is_better,
        }
    }

    pub fn improved(&self) -> bool {
        self.change.direction(self.lower_is_better) > 0
    }

    pub fn degraded(&self) -> bool {
        self.change.direction(self.lower_is_better) < 0
    }
}

/// Overall direction of a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improved,
    Degraded,
    Unchanged,
}

impl Trend {
    fn from_counts(improvements: usize, degradations: usize) -> Self {
        match improvements.cmp(&degradations) {
            std::cmp::Ordering::Greater => Trend::Improved,
            std::cmp::Ordering::Less => Trend::Degraded,
            std::cmp::Ordering::Equal => Trend::Unchanged,
        }
    }
}

/// Summary-level and aggregated metrics of two runs, side by side
pub fn compare_summaries(old: &RunSummary, new: &RunSummary) -> Vec<MetricComparison> {
    let (o, n) = (&old.aggregated_metrics, &new.aggregated_metrics);
    vec![
        MetricComparison::new("pass_rate", old.pass_rate, new.pass_rate, false),
        MetricComparison::new("avg_score", old.avg_score, new.avg_score, false),
        MetricComparison::new(
            "avg_composite_score",
            old.avg_composite_score,
            new.avg_composite_score,
            false,
        ),
        MetricComparison::new(
            "avg_execution_time",
            old.avg_execution_time,
            new.avg_execution_time,
            true,
        ),
        MetricComparison::new("precision_at_5", o.precision(5), n.precision(5), false),
        MetricComparison::new("ndcg_at_5", o.ndcg(5), n.ndcg(5), false),
        MetricComparison::new("mrr", o.mrr, n.mrr, false),
        MetricComparison::new("title_match_score", o.title_match_score, n.title_match_score, false),
        MetricComparison::new("diversity_score", o.diversity_score, n.diversity_score, false),
        MetricComparison::new("speed_score", o.speed_score, n.speed_score, false),
    ]
}

/// Result of comparing two history entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub old_index: usize,
    pub new_index: usize,
    pub old_timestamp: String,
    pub new_timestamp: String,
    pub old_commit: String,
    pub new_commit: String,
    pub metrics: Vec<MetricComparison>,
    /// Per-category pass rates; not counted toward the trend
    pub categories: Vec<MetricComparison>,
    pub improvements: usize,
    pub degradations: usize,
    pub trend: Trend,
}

impl Comparison {
    pub fn between(
        old_index: usize,
        old: &HistoryEntry,
        new_index: usize,
        new: &HistoryEntry,
    ) -> Self {
        let metrics = compare_summaries(&old.summary, &new.summary);
        let improvements = metrics.iter().filter(|m| m.improved()).count();
        let degradations = metrics.iter().filter(|m| m.degraded()).count();

        let names: BTreeSet<&String> = old
            .summary
            .category_stats
            .keys()
            .chain(new.summary.category_stats.keys())
            .collect();
        let rate = |summary: &RunSummary, name: &str| {
            summary
                .category_stats
                .get(name)
                .map(|s| s.pass_rate)
                .unwrap_or(0.0)
        };
        let categories = names
            .into_iter()
            .map(|name| {
                let (old_rate, new_rate) = (rate(&old.summary, name), rate(&new.summary, name));
                MetricComparison::new(name, old_rate, new_rate, false)
            })
            .collect();

        Self {
            old_index,
            new_index,
            old_timestamp: old.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            new_timestamp: new.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            old_commit: old.short_commit().to_string(),
            new_commit: new.short_commit().to_string(),
            metrics,
            categories,
            improvements,
            degradations,
            trend: Trend::from_counts(improvements, degradations),
        }
    }
}

/// Change between the two most recent runs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub pass_rate_delta: f64,
    pub avg_score_delta: f64,
}

impl std::fmt::Display for TrendAnalysis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let describe = |delta: f64, what: &str, unit: &str| {
            if delta > 0.0 {
                format!("{} up {:.1}{}", what, delta, unit)
            } else if delta < 0.0 {
                format!("{} down {:.1}{}", what, delta.abs(), unit)
            } else {
                format!("{} unchanged", what)
            }
        };
        write!(
            f,
            "{}; {}",
            describe(self.pass_rate_delta, "pass rate", " pts"),
            describe(self.avg_score_delta, "avg score", "")
        )
    }
}

/// Deltas between the last two entries; `None` with fewer than two
pub fn analyze_trends(history: &[HistoryEntry]) -> Option<TrendAnalysis> {
    let [.., previous, current] = history else {
        return None;
    };
    Some(TrendAnalysis {
        pass_rate_delta: current.summary.pass_rate - previous.summary.pass_rate,
        avg_score_delta: current.summary.avg_score - previous.summary.avg_score,
    })
}

fn arrow(metric: &MetricComparison) -> &'static str {
    if metric.improved() {
        "↑"
    } else if metric.degraded() {
        "↓"
    } else {
        "→"
    }
}

/// Side-by-side report of two runs
pub fn comparison_report(comparison: &Comparison) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Comparing #{} ({}, {}) with #{} ({}, {})",
        comparison.old_index,
        comparison.old_timestamp,
        comparison.old_commit,
        comparison.new_index,
        comparison.new_timestamp,
        comparison.new_commit
    );
    let _ = writeln!(out, "\nMetrics:");
    for m in &comparison.metrics {
        let _ = writeln!(
            out,
            "  {} {:<20} {:>10.3} -> {:>10.3}  ({})",
            arrow(m),
            m.name,
            m.old,
            m.new,
            m.change
        );
    }
    if !comparison.categories.is_empty() {
        let _ = writeln!(out, "\nCategory pass rates:");
        for c in &comparison.categories {
            let _ = writeln!(
                out,
                "  {} {}: {:.1}% -> {:.1}%  ({})",
                arrow(c),
                c.name,
                c.old,
                c.new,
                c.change
            );
        }
    }
    let verdict = match comparison.trend {
        Trend::Improved => "overall improvement",
        Trend::Degraded => "overall degradation",
        Trend::Unchanged => "no overall change",
    };
    let _ = writeln!(
        out,
        "\nImprovements: {}  Degradations: {}  => {}",
        comparison.improvements, comparison.degradations, verdict
    );
    out
}

/// One line per recorded run, oldest first
pub fn history_report(history: &[HistoryEntry]) -> String {
    let mut out = String::new();
    for (i, entry) in history.iter().enumerate() {
        let summary = &entry.summary;
        let marker = if summary.pass_rate >= 80.0 {
            "ok"
        } else if summary.pass_rate >= 70.0 {
            "warn"
        } else {
            "FAIL"
        };
        let _ = writeln!(
            out,
            "{:>2}. [{:<4}] {} | {:>5.1}% | {:>5.1} | {} ({})",
            i,
            marker,
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            summary.pass_rate,
            summary.avg_composite_score,
            entry.short_commit(),
            entry.branch
        );
    }
    out
}
