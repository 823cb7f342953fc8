//! Fused result records and their provenance

use crate::engine::{BookSource, HighlightMap, MatchCandidate, PageHit};
use crate::query::QueryKind;
use serde::{Deserialize, Serialize};

/// Category key used when a document carries no `path_index`
pub const UNKNOWN_CATEGORY: &str = "unknown";

const SNIPPET_CHARS: usize = 300;

/// Which query (or both) matched a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Title,
    Page,
    Both,
}

impl Provenance {
    /// Provenance after the same document is also seen in `kind`'s hit list
    pub fn merged_with(self, kind: QueryKind) -> Self {
        match (self, kind) {
            (Provenance::Title, QueryKind::Title) => Provenance::Title,
            (Provenance::Page, QueryKind::Page) => Provenance::Page,
            _ => Provenance::Both,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Title => "title",
            Provenance::Page => "page",
            Provenance::Both => "both",
        }
    }
}

impl From<QueryKind> for Provenance {
    fn from(kind: QueryKind) -> Self {
        match kind {
            QueryKind::Title => Provenance::Title,
            QueryKind::Page => Provenance::Page,
        }
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A page that matched the page query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedPage {
    pub page: Option<i64>,
    pub image: Option<String>,
    pub snippet: String,
    /// Highlight fragments for the page text
    #[serde(default)]
    pub highlights: Vec<String>,
}

impl MatchedPage {
    pub fn from_hit(hit: &PageHit) -> Self {
        let highlights: Vec<String> = hit
            .highlight
            .get("pages.book_page_text")
            .or_else(|| hit.highlight.get("book_page_text"))
            .cloned()
            .unwrap_or_default();

        let snippet = highlights.first().cloned().unwrap_or_else(|| {
            hit.source
                .book_page_text
                .as_deref()
                .unwrap_or_default()
                .chars()
                .take(SNIPPET_CHARS)
                .collect()
        });

        Self {
            page: hit.source.book_page,
            image: hit.source.book_page_image.clone(),
            snippet,
            highlights,
        }
    }

    fn same_page(&self, other: &MatchedPage) -> bool {
        if self.page.is_none() && self.image.is_none() {
            return self.snippet == other.snippet;
        }
        self.page == other.page && self.image == other.image
    }
}

/// Page shown as the document's cover
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverPage {
    pub page: Option<i64>,
    pub image: Option<String>,
}

impl CoverPage {
    /// First page flagged as cover, else the first page with an image
    pub fn select(source: &BookSource) -> Option<Self> {
        source
            .pages
            .iter()
            .find(|p| p.cover_book_page == Some(1))
            .or_else(|| source.pages.iter().find(|p| p.book_page_image.is_some()))
            .map(|p| Self {
                page: p.book_page,
                image: p.book_page_image.clone(),
            })
    }
}

/// Display metadata copied from the stored fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub book_id: Option<String>,
    pub title: Option<String>,
    pub book_name: Option<String>,
    pub description: Option<String>,
    pub book_year: Option<String>,
    pub lang: Option<String>,
    pub filter_name: Option<String>,
    pub path_index: Option<String>,
    pub pdf_url: Option<String>,
    pub pdf_opac_001: Option<String>,
    pub book_code: Option<String>,
    pub url: Option<String>,
}

impl DocumentMeta {
    pub fn from_source(source: &BookSource, cover_url_template: &str) -> Self {
        Self {
            url: source
                .book_id
                .as_ref()
                .map(|id| cover_url_template.replace("{book_id}", id)),
            book_id: source.book_id.clone(),
            title: source.title.clone(),
            book_name: source.book_name.clone(),
            description: source
                .description
                .clone()
                .filter(|d| !d.trim().is_empty())
                .or_else(|| source.referat.clone()),
            book_year: source.book_year.clone(),
            lang: source.lang.clone(),
            filter_name: source.filter_name.clone(),
            path_index: source.path_index.clone(),
            pdf_url: source.pdf_url.clone(),
            pdf_opac_001: source.pdf_opac_001.clone(),
            book_code: source.book_code.clone(),
        }
    }
}

/// One document after fusion, carrying everything ranking and display need
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedResult {
    pub id: String,
    pub provenance: Provenance,
    /// Rescored value; equals the baseline until a policy is applied
    pub score: f64,
    pub title_score: Option<f64>,
    pub page_score: Option<f64>,
    #[serde(flatten)]
    pub meta: DocumentMeta,
    #[serde(default)]
    pub highlight: HighlightMap,
    #[serde(default)]
    pub matched_pages: Vec<MatchedPage>,
    pub cover_page: Option<CoverPage>,
}

impl FusedResult {
    /// Create a record from the first hit seen for a document
    pub fn from_candidate(candidate: MatchCandidate, kind: QueryKind, cover_url_template: &str) -> Self {
        let meta = DocumentMeta::from_source(&candidate.source, cover_url_template);
        let cover_page = CoverPage::select(&candidate.source);
        let (title_score, page_score) = match kind {
            QueryKind::Title => (Some(candidate.score), None),
            QueryKind::Page => (None, Some(candidate.score)),
        };

        let mut result = Self {
            id: candidate.id,
            provenance: kind.into(),
            score: candidate.score,
            title_score,
            page_score,
            meta,
            highlight: candidate.highlight,
            matched_pages: Vec::new(),
            cover_page,
        };
        result.attach_pages(&candidate.inner_hits);
        result
    }

    /// Merge matched pages, skipping pages already attached
    pub fn attach_pages(&mut self, hits: &[PageHit]) {
        for hit in hits {
            let page = MatchedPage::from_hit(hit);
            if !self.matched_pages.iter().any(|p| p.same_page(&page)) {
                self.matched_pages.push(page);
            }
        }
    }

    /// Engine score before rescoring; the larger one when both queries matched
    pub fn baseline(&self) -> f64 {
        match (self.title_score, self.page_score) {
            (Some(t), Some(p)) => t.max(p),
            (Some(s), None) | (None, Some(s)) => s,
            (None, None) => 0.0,
        }
    }

    /// Diversity bucket
    pub fn category(&self) -> &str {
        self.meta
            .path_index
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(UNKNOWN_CATEGORY)
    }

    pub fn title(&self) -> &str {
        self.meta.title.as_deref().unwrap_or_default()
    }

    pub fn alt_title(&self) -> &str {
        self.meta.book_name.as_deref().unwrap_or_default()
    }

    /// Highlight fragments for the given fields, in field order
    pub fn highlight_fragments<'a>(&'a self, fields: &'a [&'a str]) -> impl Iterator<Item = &'a String> {
        fields
            .iter()
            .filter_map(|field| self.highlight.get(*field))
            .flatten()
    }

    /// Title for listings, truncated to `max_chars` characters
    pub fn preview(&self, max_chars: usize) -> String {
        let title = if self.title().is_empty() {
            self.alt_title()
        } else {
            self.title()
        };
        if title.chars().count() <= max_chars {
            title.to_string()
        } else {
            let cut: String = title.chars().take(max_chars).collect();
            format!("{}...", cut)
        }
    }
}
