//! Query composition
//!
//! Builds the two engine queries for a request from a [`VariantSet`]:
//! a tiered title query over top-level fields and a nested page query over
//! the page sub-documents. Composition is pure: the same inputs always give
//! structurally identical [`QuerySpec`]s.

mod tiers;

use crate::config::EngineConfig;
use crate::normalize::VariantSet;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub use tiers::{FieldBoost, MatchKind, MatchTier};

/// Stored fields requested for every hit
pub const SOURCE_FIELDS: &[&str] = &[
    "book_id",
    "title",
    "book_name",
    "description",
    "referat",
    "book_year",
    "lang",
    "filter_name",
    "path_index",
    "pdf_url",
    "pdf_opac_001",
    "pages",
    "book_code",
];

/// Nested collection holding page sub-documents
pub const PAGE_PATH: &str = "pages";

/// Name under which matched pages come back in `inner_hits`
pub const INNER_HITS_NAME: &str = "matched_pages";

/// Inclusive publication-year filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    /// A range exists only when both bounds are given
    pub fn from_bounds(start: Option<i32>, end: Option<i32>) -> Option<Self> {
        match (start, end) {
            (Some(start), Some(end)) => Some(Self { start, end }),
            _ => None,
        }
    }

    fn to_filter(self) -> Value {
        json!({
            "range": {
                "book_year": {
                    "gte": format!("{}-01-01", self.start),
                    "lte": format!("{}-12-31", self.end)
                }
            }
        })
    }
}

/// Request-shape knobs shared by both queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposerOptions {
    pub result_size: usize,
    pub fragment_size: usize,
    pub inner_hits: usize,
}

impl Default for ComposerOptions {
    fn default() -> Self {
        Self {
            result_size: 50,
            fragment_size: 150,
            inner_hits: 5,
        }
    }
}

impl From<&EngineConfig> for ComposerOptions {
    fn from(config: &EngineConfig) -> Self {
        Self {
            result_size: config.result_size,
            fragment_size: config.fragment_size,
            inner_hits: config.inner_hits,
        }
    }
}

/// Query against title/name/description fields
#[derive(Debug, Clone, PartialEq)]
pub struct TitleQuery {
    pub text: String,
    pub tiers: Vec<MatchTier>,
    pub years: Option<YearRange>,
    pub size: usize,
    pub highlight_fields: Vec<&'static str>,
    pub fragment_size: usize,
}

/// Nested query against page text, returning matched pages as inner hits
#[derive(Debug, Clone, PartialEq)]
pub struct PageQuery {
    pub text: String,
    pub tiers: Vec<MatchTier>,
    pub years: Option<YearRange>,
    pub size: usize,
    pub inner_hits: usize,
    pub fragment_size: usize,
}

/// One engine query
#[derive(Debug, Clone, PartialEq)]
pub enum QuerySpec {
    Title(TitleQuery),
    Page(PageQuery),
}

/// Which query a hit list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    Title,
    Page,
}

impl std::fmt::Display for QueryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryKind::Title => write!(f, "title"),
            QueryKind::Page => write!(f, "page"),
        }
    }
}

/// Both queries for one request
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedQueries {
    pub title: QuerySpec,
    pub page: QuerySpec,
}

/// Build the title and page queries for a variant set
pub fn compose(
    variants: &VariantSet,
    years: Option<YearRange>,
    options: ComposerOptions,
) -> ComposedQueries {
    ComposedQueries {
        title: QuerySpec::Title(title_query(variants, years, options)),
        page: QuerySpec::Page(page_query(variants, years, options)),
    }
}

pub fn title_query(
    variants: &VariantSet,
    years: Option<YearRange>,
    options: ComposerOptions,
) -> TitleQuery {
    TitleQuery {
        text: variants.joined(),
        tiers: tiers::title_tiers(),
        years,
        size: options.result_size,
        highlight_fields: vec!["title", "book_name", "book_page_text"],
        fragment_size: options.fragment_size,
    }
}

pub fn page_query(
    variants: &VariantSet,
    years: Option<YearRange>,
    options: ComposerOptions,
) -> PageQuery {
    PageQuery {
        text: variants.joined(),
        tiers: tiers::page_tiers(),
        years,
        size: options.result_size,
        inner_hits: options.inner_hits,
        fragment_size: options.fragment_size,
    }
}

impl QuerySpec {
    pub fn kind(&self) -> QueryKind {
        match self {
            QuerySpec::Title(_) => QueryKind::Title,
            QuerySpec::Page(_) => QueryKind::Page,
        }
    }

    /// Engine request body
    pub fn to_body(&self) -> Value {
        match self {
            QuerySpec::Title(q) => q.to_body(),
            QuerySpec::Page(q) => q.to_body(),
        }
    }
}

fn filters(years: Option<YearRange>) -> Vec<Value> {
    years.map(YearRange::to_filter).into_iter().collect()
}

impl TitleQuery {
    pub fn to_body(&self) -> Value {
        let should: Vec<Value> = self.tiers.iter().map(|t| t.to_clause(&self.text)).collect();
        let highlight: serde_json::Map<String, Value> = self
            .highlight_fields
            .iter()
            .map(|f| (f.to_string(), json!({})))
            .collect();

        json!({
            "size": self.size,
            "_source": SOURCE_FIELDS,
            "query": {
                "bool": {
                    "must": filters(self.years),
                    "should": should,
                    "minimum_should_match": 1
                }
            },
            "highlight": {
                "fields": highlight,
                "number_of_fragments": 1,
                "fragment_size": self.fragment_size
            }
        })
    }
}

impl PageQuery {
    pub fn to_body(&self) -> Value {
        let should: Vec<Value> = self.tiers.iter().map(|t| t.to_clause(&self.text)).collect();
        let mut highlight = serde_json::Map::new();
        highlight.insert(format!("{}.book_page_text", PAGE_PATH), json!({}));

        json!({
            "size": self.size,
            "_source": SOURCE_FIELDS,
            "query": {
                "bool": {
                    "must": filters(self.years),
                    "should": [{
                        "nested": {
                            "path": PAGE_PATH,
                            "query": {
                                "bool": {
                                    "should": should,
                                    "minimum_should_match": 1
                                }
                            },
                            "inner_hits": {
                                "name": INNER_HITS_NAME,
                                "size": self.inner_hits,
                                "highlight": {
                                    "fields": highlight,
                                    "number_of_fragments": 1,
                                    "fragment_size": self.fragment_size
                                }
                            }
                        }
                    }],
                    "minimum_should_match": 1
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variants() -> VariantSet {
        VariantSet::new(["Московское метро", "moskovskoe metro"]).unwrap()
    }

    #[test]
    fn title_query_has_four_tiers_in_boost_order() {
        let q = title_query(&variants(), None, ComposerOptions::default());
        let boosts: Vec<f64> = q.tiers.iter().map(|t| t.boost).collect();
        assert_eq!(boosts, vec![10.0, 5.0, 3.0, 1.0]);
        assert_eq!(q.tiers[0].kind, MatchKind::Phrase);
        assert_eq!(q.tiers[3].kind, MatchKind::AnyWords);

        let body = q.to_body();
        let should = body["query"]["bool"]["should"].as_array().unwrap();
        assert_eq!(should.len(), 4);
        assert_eq!(
            should[0]["multi_match"]["query"],
            "Московское метро moskovskoe metro"
        );
        assert_eq!(should[2]["multi_match"]["type"], "cross_fields");
        assert_eq!(should[2]["multi_match"]["operator"], "and");
        assert!(body["query"]["bool"]["must"].as_array().unwrap().is_empty());
    }

    #[test]
    fn year_filter_requires_both_bounds() {
        assert!(YearRange::from_bounds(Some(1930), None).is_none());

        let years = YearRange::from_bounds(Some(1930), Some(1950));
        let body = title_query(&variants(), years, ComposerOptions::default()).to_body();
        let must = body["query"]["bool"]["must"].as_array().unwrap();
        assert_eq!(must.len(), 1);
        assert_eq!(must[0]["range"]["book_year"]["gte"], "1930-01-01");
        assert_eq!(must[0]["range"]["book_year"]["lte"], "1950-12-31");
    }

    #[test]
    fn page_query_requests_inner_hits() {
        let spec = compose(&variants(), None, ComposerOptions::default()).page;
        assert_eq!(spec.kind(), QueryKind::Page);

        let body = spec.to_body();
        let nested = &body["query"]["bool"]["should"][0]["nested"];
        assert_eq!(nested["path"], "pages");
        assert_eq!(nested["inner_hits"]["name"], INNER_HITS_NAME);
        assert_eq!(nested["inner_hits"]["size"], 5);
        assert_eq!(
            nested["query"]["bool"]["should"].as_array().unwrap().len(),
            3
        );
        assert!(nested["inner_hits"]["highlight"]["fields"]
            .get("pages.book_page_text")
            .is_some());
    }

    #[test]
    fn composition_is_deterministic_and_leaves_input_alone() {
        let input = variants();
        let before = input.clone();
        let a = compose(&input, None, ComposerOptions::default());
        let b = compose(&input, None, ComposerOptions::default());
        assert_eq!(a, b);
        assert_eq!(a.title.to_body(), b.title.to_body());
        assert_eq!(input, before);
    }
}
