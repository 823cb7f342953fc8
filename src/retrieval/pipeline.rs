//! Dual-query search pipeline: compose, execute, fuse, rescore, diversify

use crate::config::Config;
use crate::engine::{MatchCandidate, SearchBackend};
use crate::error::{FolioError, Result};
use crate::query::{compose, ComposerOptions, QueryKind};
use crate::retrieval::{select_diverse, Fusion, Rescorer, SearchMode, SearchRequest};
use crate::retrieval::FusedResult;

/// Ranked results for one request
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub results: Vec<FusedResult>,
    pub title_hits: usize,
    pub page_hits: usize,
    /// Query whose call failed while the other one succeeded
    pub degraded: Option<QueryKind>,
}

/// Runs requests against a [`SearchBackend`]
#[derive(Debug)]
pub struct SearchPipeline<B> {
    backend: B,
    composer: ComposerOptions,
    fusion: Fusion,
    rescorer: Rescorer,
    max_per_category: usize,
}

impl<B: SearchBackend> SearchPipeline<B> {
    pub fn new(backend: B, config: &Config) -> Result<Self> {
        Ok(Self {
            backend,
            composer: ComposerOptions::from(&config.engine),
            fusion: Fusion::new(config.engine.cover_url_template.clone()),
            rescorer: Rescorer::new(config.ranking.policy)?,
            max_per_category: config.ranking.max_per_category,
        })
    }

    /// Swap the rescorer, e.g. to compare policies on the same backend
    pub fn with_rescorer(mut self, rescorer: Rescorer) -> Self {
        self.rescorer = rescorer;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Execute one request.
    ///
    /// In [`SearchMode::Both`] the two engine calls run concurrently. When one
    /// of them fails the request continues with the other's hits.
    ///
    /// # Errors
    ///
    /// [`FolioError::EngineUnreachable`] when every issued call failed.
    pub async fn execute(&self, request: &SearchRequest) -> Result<SearchOutcome> {
        let queries = compose(&request.variants, request.years, self.composer);

        let (title, page) = match request.mode {
            SearchMode::Both => {
                let (title, page) = tokio::join!(
                    self.backend.search(&queries.title),
                    self.backend.search(&queries.page)
                );
                (Some(title), Some(page))
            }
            SearchMode::Title => (Some(self.backend.search(&queries.title).await), None),
            SearchMode::Page => (None, Some(self.backend.search(&queries.page).await)),
        };

        let (title_hits, page_hits, degraded) = settle(title, page)?;
        let title_count = title_hits.len();
        let page_count = page_hits.len();

        let fused = self.fusion.fuse(title_hits, page_hits);
        let ranked = self.rescorer.rank(fused);
        let mut results = if request.diversity {
            select_diverse(ranked, self.max_per_category)
        } else {
            ranked
        };
        if let Some(limit) = request.limit {
            results.truncate(limit);
        }

        tracing::info!(
            query = %request.variants.original(),
            mode = %request.mode,
            policy = self.rescorer.policy_name(),
            title_hits = title_count,
            page_hits = page_count,
            results = results.len(),
            "search completed"
        );

        Ok(SearchOutcome {
            results,
            title_hits: title_count,
            page_hits: page_count,
            degraded,
        })
    }
}

type CallResult = Result<Vec<MatchCandidate>>;

/// Decide between degraded success and total failure
fn settle(
    title: Option<CallResult>,
    page: Option<CallResult>,
) -> Result<(Vec<MatchCandidate>, Vec<MatchCandidate>, Option<QueryKind>)> {
    const NOT_ISSUED: &str = "not issued";

    match (title, page) {
        (Some(Err(t)), Some(Err(p))) => Err(FolioError::EngineUnreachable {
            title: t.to_string(),
            page: p.to_string(),
        }),
        (Some(Err(t)), None) => Err(FolioError::EngineUnreachable {
            title: t.to_string(),
            page: NOT_ISSUED.to_string(),
        }),
        (None, Some(Err(p))) => Err(FolioError::EngineUnreachable {
            title: NOT_ISSUED.to_string(),
            page: p.to_string(),
        }),
        (title, page) => {
            let mut degraded = None;
            let title_hits = match title {
                Some(Ok(hits)) => hits,
                Some(Err(e)) => {
                    tracing::warn!("Title query failed, continuing with page hits: {}", e);
                    degraded = Some(QueryKind::Title);
                    Vec::new()
                }
                None => Vec::new(),
            };
            let page_hits = match page {
                Some(Ok(hits)) => hits,
                Some(Err(e)) => {
                    tracing::warn!("Page query failed, continuing with title hits: {}", e);
                    degraded = Some(QueryKind::Page);
                    Vec::new()
                }
                None => Vec::new(),
            };
            Ok((title_hits, page_hits, degraded))
        }
    }
}
