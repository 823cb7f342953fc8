//! In-memory archive used as a search engine stand-in

#![allow(dead_code)]

use folio::engine::{BookSource, HighlightMap, MatchCandidate, PageHit, PageSource, SearchBackend};
use folio::query::{QueryKind, QuerySpec};
use folio::{FolioError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub category: String,
    pub year: i32,
    pub pages: Vec<String>,
}

impl Book {
    pub fn new(id: &str, title: &str, category: &str, year: i32) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            category: category.to_string(),
            year,
            pages: Vec::new(),
        }
    }

    pub fn page(mut self, text: &str) -> Self {
        self.pages.push(text.to_string());
        self
    }

    fn source(&self) -> BookSource {
        BookSource {
            book_id: Some(self.id.clone()),
            title: Some(self.title.clone()),
            book_year: Some(self.year.to_string()),
            path_index: Some(self.category.clone()),
            pages: self
                .pages
                .iter()
                .enumerate()
                .map(|(i, text)| PageSource {
                    book_page: Some(i as i64 + 1),
                    book_page_text: Some(text.clone()),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }
}

/// Matches query words against titles (title query) or page text (page query)
pub struct ArchiveBackend {
    books: Vec<Book>,
    failing: Vec<QueryKind>,
    pub calls: AtomicUsize,
}

impl ArchiveBackend {
    pub fn new(books: Vec<Book>) -> Self {
        Self {
            books,
            failing: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Make calls of `kind` fail
    pub fn failing(mut self, kind: QueryKind) -> Self {
        self.failing.push(kind);
        self
    }

    fn matched<'a>(text: &str, words: &'a [String]) -> Vec<&'a str> {
        let lower = text.to_lowercase();
        words
            .iter()
            .filter(|w| lower.contains(w.as_str()))
            .map(String::as_str)
            .collect()
    }

    fn emphasize(words: &[&str]) -> String {
        words
            .iter()
            .map(|w| format!("<em>{}</em>", w))
            .collect::<Vec<_>>()
            .join(" … ")
    }
}

impl SearchBackend for ArchiveBackend {
    async fn search(&self, query: &QuerySpec) -> Result<Vec<MatchCandidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&query.kind()) {
            return Err(FolioError::Engine(format!("{} query timed out", query.kind())));
        }

        let (text, years) = match query {
            QuerySpec::Title(q) => (&q.text, q.years),
            QuerySpec::Page(q) => (&q.text, q.years),
        };
        let words: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();

        let mut hits = Vec::new();
        for book in &self.books {
            if let Some(range) = years {
                if book.year < range.start || book.year > range.end {
                    continue;
                }
            }

            match query.kind() {
                QueryKind::Title => {
                    let found = Self::matched(&book.title, &words);
                    if found.is_empty() {
                        continue;
                    }
                    let mut highlight = HighlightMap::new();
                    highlight.insert("title".to_string(), vec![Self::emphasize(&found)]);
                    hits.push(MatchCandidate {
                        id: book.id.clone(),
                        score: 10.0 * found.len() as f64,
                        source: book.source(),
                        highlight,
                        inner_hits: Vec::new(),
                    });
                }
                QueryKind::Page => {
                    let source = book.source();
                    let inner_hits: Vec<PageHit> = source
                        .pages
                        .iter()
                        .filter_map(|page| {
                            let text = page.book_page_text.as_deref().unwrap_or_default();
                            let found = Self::matched(text, &words);
                            if found.is_empty() {
                                return None;
                            }
                            let mut highlight = HighlightMap::new();
                            highlight.insert(
                                "pages.book_page_text".to_string(),
                                vec![Self::emphasize(&found)],
                            );
                            Some(PageHit {
                                source: page.clone(),
                                highlight,
                            })
                        })
                        .collect();
                    if inner_hits.is_empty() {
                        continue;
                    }
                    hits.push(MatchCandidate {
                        id: book.id.clone(),
                        score: 5.0 * inner_hits.len() as f64,
                        source,
                        highlight: HighlightMap::new(),
                        inner_hits,
                    });
                }
            }
        }

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(hits)
    }
}

/// A small archive with metro, Palekh and map material
pub fn archive() -> Vec<Book> {
    vec![
        Book::new("metro-1", "Московское метро", "transport", 1935)
            .page("Первая линия метро открыта в 1935 году")
            .page("Станции метро Сокольники и Красносельская"),
        Book::new("metro-2", "Путеводитель по метрополитену", "transport", 1952)
            .page("Схема линий метро"),
        Book::new("palekh-1", "Палехская миниатюра", "art", 1968)
            .page("Лаковая миниатюра Палеха"),
        Book::new("map-1", "Карта Москвы", "maps", 1900)
            .page("Трамвайные пути и будущее метро"),
        Book::new("novel-1", "Неизвестная книга", "fiction", 1910)
            .page("Роман без упоминаний транспорта"),
    ]
}
