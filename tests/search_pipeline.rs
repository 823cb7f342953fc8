//! End-to-end ranking through the dual-query pipeline and the search service

mod common;

use ahash::AHashSet;
use common::{archive, ArchiveBackend, Book};
use folio::config::{Config, PolicyKind};
use folio::interactions::InteractionLog;
use folio::normalize::{LayoutNormalizer, Normalizer};
use folio::query::{QueryKind, YearRange};
use folio::retrieval::{Provenance, Rescorer, SearchMode, SearchPipeline, SearchRequest};
use folio::service::{SearchParams, SearchService};
use std::sync::atomic::Ordering;
use tempfile::TempDir;

fn request(query: &str) -> SearchRequest {
    SearchRequest::new(LayoutNormalizer::new().variants(query).unwrap())
}

fn pipeline(backend: ArchiveBackend) -> SearchPipeline<ArchiveBackend> {
    SearchPipeline::new(backend, &Config::default()).unwrap()
}

#[tokio::test]
async fn shared_hits_are_fused_once_with_pages() {
    let pipeline = pipeline(ArchiveBackend::new(archive()));
    let outcome = pipeline.execute(&request("метро")).await.unwrap();

    let ids: Vec<&str> = outcome.results.iter().map(|r| r.id.as_str()).collect();
    let unique: AHashSet<&str> = ids.iter().copied().collect();
    assert_eq!(ids.len(), unique.len(), "duplicate ids in {ids:?}");

    let metro = &outcome.results[0];
    assert_eq!(metro.id, "metro-1");
    assert_eq!(metro.provenance, Provenance::Both);
    assert_eq!(metro.matched_pages.len(), 2);
    assert!(metro.title_score.is_some() && metro.page_score.is_some());

    let map = outcome.results.iter().find(|r| r.id == "map-1").unwrap();
    assert_eq!(map.provenance, Provenance::Page);
    assert_eq!(outcome.degraded, None);
}

#[tokio::test]
async fn failed_page_query_falls_back_to_title_hits() {
    let pipeline = pipeline(ArchiveBackend::new(archive()).failing(QueryKind::Page));
    let outcome = pipeline.execute(&request("метро")).await.unwrap();

    assert_eq!(outcome.degraded, Some(QueryKind::Page));
    assert_eq!(outcome.page_hits, 0);
    let ids: Vec<&str> = outcome.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["metro-1", "metro-2"]);
    assert!(outcome
        .results
        .iter()
        .all(|r| r.provenance == Provenance::Title && r.matched_pages.is_empty()));
}

#[tokio::test]
async fn both_queries_failing_is_unreachable_not_empty() {
    let backend = ArchiveBackend::new(archive())
        .failing(QueryKind::Title)
        .failing(QueryKind::Page);
    let err = pipeline(backend)
        .execute(&request("метро"))
        .await
        .unwrap_err();
    assert!(err.is_unreachable());

    // a query with no matches is an ordinary empty success
    let outcome = pipeline(ArchiveBackend::new(archive()))
        .execute(&request("дирижабль"))
        .await
        .unwrap();
    assert!(outcome.results.is_empty());
}

#[tokio::test]
async fn one_category_is_capped_unless_diversity_is_off() {
    let books: Vec<Book> = (0..20)
        .map(|i| Book::new(&format!("a-{i}"), &format!("Метро, выпуск {i}"), "A", 1950))
        .collect();
    let pipeline = pipeline(ArchiveBackend::new(books));

    let capped = pipeline.execute(&request("метро")).await.unwrap();
    assert_eq!(capped.results.len(), 6);

    let all = pipeline
        .execute(&request("метро").without_diversity())
        .await
        .unwrap();
    assert_eq!(all.results.len(), 20);
}

#[tokio::test]
async fn year_range_reaches_the_engine() {
    let pipeline = pipeline(ArchiveBackend::new(archive()));
    let outcome = pipeline
        .execute(&request("метро").with_years(YearRange::from_bounds(Some(1930), Some(1940))))
        .await
        .unwrap();
    let ids: Vec<&str> = outcome.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["metro-1"]);
}

#[tokio::test]
async fn title_mode_issues_one_call() {
    let pipeline = pipeline(ArchiveBackend::new(archive()));
    let outcome = pipeline
        .execute(&request("метро").with_mode(SearchMode::Title))
        .await
        .unwrap();

    assert_eq!(pipeline.backend().calls.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.page_hits, 0);
    assert_eq!(outcome.degraded, None);
    assert!(outcome.results.iter().all(|r| r.provenance == Provenance::Title));
}

#[tokio::test]
async fn multiplicative_policy_favours_both_provenance() {
    let pipeline = pipeline(ArchiveBackend::new(archive()))
        .with_rescorer(Rescorer::new(PolicyKind::Multiplicative).unwrap());
    let outcome = pipeline.execute(&request("метро")).await.unwrap();

    let metro = outcome.results.iter().find(|r| r.id == "metro-1").unwrap();
    // baseline max(10, 10) scaled by 1.6
    assert!((metro.score - 16.0).abs() < 1e-9);
}

fn service(dir: &TempDir) -> SearchService<ArchiveBackend> {
    let mut config = Config::default();
    config.storage.data_dir = dir.path().to_path_buf();
    SearchService::with_backend(ArchiveBackend::new(archive()), &config).unwrap()
}

#[tokio::test]
async fn service_strips_publication_type_and_logs_search() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);

    let response = service
        .search(&SearchParams::new("карта Москвы"))
        .await
        .unwrap();
    assert_eq!(response.publication_types, vec!["map".to_string()]);
    assert_eq!(response.variants[0], "Москвы");
    assert_eq!(response.total, response.results.len());
    assert_eq!(response.results[0].id, "map-1");

    service.like("карта Москвы", "map-1").unwrap();

    let records = InteractionLog::read_all(service.interactions().path()).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].query.as_deref(), Some("карта Москвы"));
    assert_eq!(records[0].result_ids.as_ref().unwrap()[0], "map-1");
    assert_eq!(records[1].doc_id.as_deref(), Some("map-1"));
}

#[tokio::test]
async fn service_limit_and_mode_apply() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);

    let response = service
        .search(
            &SearchParams::new("метро")
                .with_mode(SearchMode::Page)
                .with_limit(Some(1)),
        )
        .await
        .unwrap();
    assert_eq!(response.total, 1);
    assert_eq!(response.title_hits, 0);
    assert_eq!(response.results[0].provenance, Provenance::Page);
}
