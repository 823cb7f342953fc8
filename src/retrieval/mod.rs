//! Retrieval: fusion, rescoring and diversity over the two engine queries
//!
//! A request runs a title query and a page query, merges their hits into one
//! record per document, rescores every record with the active policy and
//! finally caps how many results a single collection may contribute.

mod diversity;
mod fusion;
mod pipeline;
mod provenance;
mod rescorer;

pub use diversity::{select_diverse, DEFAULT_MAX_PER_CATEGORY};
pub use fusion::Fusion;
pub use pipeline::{SearchOutcome, SearchPipeline};
pub use provenance::{
    CoverPage, DocumentMeta, FusedResult, MatchedPage, Provenance, UNKNOWN_CATEGORY,
};
pub use rescorer::{AdditivePolicy, MultiplicativePolicy, RescoringPolicy, Rescorer, TermCounter};

use crate::error::FolioError;
use crate::normalize::VariantSet;
use crate::query::YearRange;
use serde::{Deserialize, Serialize};

/// Which engine queries a request issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Title,
    Page,
    #[default]
    Both,
}

impl std::str::FromStr for SearchMode {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "title" => Ok(SearchMode::Title),
            "page" => Ok(SearchMode::Page),
            "both" => Ok(SearchMode::Both),
            other => Err(FolioError::InvalidQuery(format!(
                "Unknown search mode '{}' (expected title, page or both)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchMode::Title => write!(f, "title"),
            SearchMode::Page => write!(f, "page"),
            SearchMode::Both => write!(f, "both"),
        }
    }
}

/// One search request after normalization
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub variants: VariantSet,
    pub years: Option<YearRange>,
    pub mode: SearchMode,
    /// Apply the per-category cap
    pub diversity: bool,
    pub limit: Option<usize>,
}

impl SearchRequest {
    pub fn new(variants: VariantSet) -> Self {
        Self {
            variants,
            years: None,
            mode: SearchMode::default(),
            diversity: true,
            limit: None,
        }
    }

    pub fn with_years(mut self, years: Option<YearRange>) -> Self {
        self.years = years;
        self
    }

    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_diversity(mut self, enabled: bool) -> Self {
        self.diversity = enabled;
        self
    }

    pub fn without_diversity(self) -> Self {
        self.with_diversity(false)
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}
