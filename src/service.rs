//! Search service
//!
//! The operations exposed to callers: ranked search, feedback, and on-demand
//! quality runs. Owns the pipeline and the two persisted stores.

use crate::classifier::Classifier;
use crate::config::Config;
use crate::engine::{OpenSearchBackend, SearchBackend};
use crate::error::Result;
use crate::evaluation::{Harness, QueryAnalysis, RunSummary, TestSuite};
use crate::history::{HistoryEntry, HistoryStore};
use crate::interactions::{Interaction, InteractionLog};
use crate::normalize::{LayoutNormalizer, Normalizer};
use crate::query::{QueryKind, YearRange};
use crate::retrieval::{FusedResult, SearchMode, SearchPipeline, SearchRequest};
use serde::Serialize;

/// Caller-facing search parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub query: String,
    pub years: Option<YearRange>,
    pub mode: SearchMode,
    pub diversity: bool,
    pub limit: Option<usize>,
}

impl SearchParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            years: None,
            mode: SearchMode::default(),
            diversity: true,
            limit: None,
        }
    }

    pub fn with_years(mut self, start: Option<i32>, end: Option<i32>) -> Self {
        self.years = YearRange::from_bounds(start, end);
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

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

/// Ranked list plus summary counts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub original_query: String,
    pub variants: Vec<String>,
    pub publication_types: Vec<String>,
    pub total: usize,
    pub title_hits: usize,
    pub page_hits: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<QueryKind>,
    pub results: Vec<FusedResult>,
}

pub struct SearchService<B> {
    pipeline: SearchPipeline<B>,
    normalizer: Box<dyn Normalizer>,
    classifier: Classifier,
    suite: TestSuite,
    interactions: InteractionLog,
    history: HistoryStore,
    pass_threshold: f64,
    default_diversity: bool,
}

impl SearchService<OpenSearchBackend> {
    /// Service talking to the configured engine
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = OpenSearchBackend::new(&config.engine)?;
        Self::with_backend(backend, config)
    }
}

impl<B: SearchBackend> SearchService<B> {
    pub fn with_backend(backend: B, config: &Config) -> Result<Self> {
        let classifier = Classifier::load(config.evaluation.tables_file.as_deref())?;
        let suite = TestSuite::load(config.evaluation.suite_file.as_deref())?;
        let interactions = InteractionLog::open(config.storage.interaction_log_path())?;

        Ok(Self {
            pipeline: SearchPipeline::new(backend, config)?,
            normalizer: Box::new(LayoutNormalizer::new()),
            classifier,
            suite,
            interactions,
            history: HistoryStore::from_config(&config.storage),
            pass_threshold: config.evaluation.pass_threshold,
            default_diversity: config.ranking.diversity,
        })
    }

    /// Replace the query normalizer
    pub fn with_normalizer(mut self, normalizer: impl Normalizer + 'static) -> Self {
        self.normalizer = Box::new(normalizer);
        self
    }

    pub fn with_suite(mut self, suite: TestSuite) -> Self {
        self.suite = suite;
        self
    }

    pub fn pipeline(&self) -> &SearchPipeline<B> {
        &self.pipeline
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn interactions(&self) -> &InteractionLog {
        &self.interactions
    }

    pub fn suite(&self) -> &TestSuite {
        &self.suite
    }

    /// Whether searches diversify when the caller does not say
    pub fn default_diversity(&self) -> bool {
        self.default_diversity
    }

    /// Run a ranked search and log it.
    ///
    /// # Errors
    ///
    /// [`crate::FolioError::InvalidQuery`] for blank text,
    /// [`crate::FolioError::EngineUnreachable`] when no engine call succeeded.
    pub async fn search(&self, params: &SearchParams) -> Result<SearchResponse> {
        tracing::info!("Search: '{}' (mode {})", params.query, params.mode);

        let publication_types = self.classifier.detect_publication_types(&params.query);
        let cleaned = self.classifier.clean_query(&params.query);
        let variants = self.normalizer.variants(&cleaned)?;
        tracing::debug!(variants = ?variants.as_slice(), types = ?publication_types, "query prepared");

        let request = SearchRequest::new(variants.clone())
            .with_years(params.years)
            .with_mode(params.mode)
            .with_diversity(params.diversity)
            .with_limit(params.limit);
        let outcome = self.pipeline.execute(&request).await?;

        let ids = outcome.results.iter().map(|r| r.id.clone()).collect();
        if let Err(e) = self
            .interactions
            .append(&Interaction::search(params.query.clone(), ids))
        {
            tracing::warn!("Failed to log search interaction: {}", e);
        }

        Ok(SearchResponse {
            original_query: params.query.clone(),
            variants: variants.as_slice().to_vec(),
            publication_types,
            total: outcome.results.len(),
            title_hits: outcome.title_hits,
            page_hits: outcome.page_hits,
            degraded: outcome.degraded,
            results: outcome.results,
        })
    }

    /// Record that the user picked `doc_id` for `query`
    pub fn like(&self, query: &str, doc_id: &str) -> Result<()> {
        tracing::info!("Like: '{}' -> {}", query, doc_id);
        self.interactions.append(&Interaction::feedback(query, doc_id))
    }

    fn harness(&self) -> Harness<'_, B> {
        Harness::new(&self.pipeline, self.normalizer.as_ref(), &self.classifier)
            .with_pass_threshold(self.pass_threshold)
    }

    /// Run the quality suite
    pub async fn run_metrics(&self) -> RunSummary {
        self.harness().run(&self.suite).await
    }

    /// Store a run in the history, returning the stored entry
    pub fn record_run(&self, summary: RunSummary) -> Result<HistoryEntry> {
        let entry = HistoryEntry::new(summary);
        let len = self.history.append(entry.clone())?;
        tracing::info!("Saved run to {} ({} entries)", self.history.path().display(), len);
        Ok(entry)
    }

    /// Search one query and score it against `expected_titles` when given
    pub async fn analyze(&self, query: &str, expected_titles: &[String]) -> Result<QueryAnalysis> {
        self.harness().analyze(query, expected_titles).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MatchCandidate;
    use crate::error::FolioError;
    use crate::query::QuerySpec;
    use tempfile::TempDir;

    struct EmptyBackend;

    impl SearchBackend for EmptyBackend {
        async fn search(&self, _query: &QuerySpec) -> Result<Vec<MatchCandidate>> {
            Ok(Vec::new())
        }
    }

    fn config(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.storage.data_dir = dir.path().to_path_buf();
        config
    }

    #[test]
    fn params_builder() {
        let params = SearchParams::new("Палех")
            .with_years(Some(1920), Some(1950))
            .with_mode(SearchMode::Page)
            .with_diversity(false)
            .with_limit(Some(5));
        assert_eq!(params.years, Some(YearRange { start: 1920, end: 1950 }));
        assert_eq!(params.mode, SearchMode::Page);
        assert!(!params.diversity);

        // a lone bound is no filter
        assert_eq!(SearchParams::new("x").with_years(Some(1920), None).years, None);
    }

    #[tokio::test]
    async fn empty_result_is_success_and_logged() {
        let dir = TempDir::new().unwrap();
        let service = SearchService::with_backend(EmptyBackend, &config(&dir)).unwrap();

        let response = service.search(&SearchParams::new("метро")).await.unwrap();
        assert_eq!(response.total, 0);
        assert_eq!(response.original_query, "метро");

        let records = InteractionLog::read_all(service.interactions().path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].result_ids.as_deref(), Some(&[][..]));
    }

    #[tokio::test]
    async fn blank_query_is_rejected() {
        let dir = TempDir::new().unwrap();
        let service = SearchService::with_backend(EmptyBackend, &config(&dir)).unwrap();
        let err = service.search(&SearchParams::new("   ")).await.unwrap_err();
        assert!(matches!(err, FolioError::InvalidQuery(_)));
    }

    #[test]
    fn like_appends_feedback() {
        let dir = TempDir::new().unwrap();
        let service = SearchService::with_backend(EmptyBackend, &config(&dir)).unwrap();
        service.like("палех", "book-7").unwrap();

        let records = InteractionLog::read_all(service.interactions().path()).unwrap();
        assert_eq!(records[0].doc_id.as_deref(), Some("book-7"));
    }
}
