//! Engine response model
//!
//! Parsing is strict at the envelope (a body that is not a hit list fails the
//! call) and permissive inside each hit: absent or oddly typed fields fall
//! back to empty values.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Highlight fragments keyed by field name
pub type HighlightMap = BTreeMap<String, Vec<String>>;

/// Top-level search response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineResponse {
    pub hits: HitsEnvelope,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HitsEnvelope {
    #[serde(default)]
    pub hits: Vec<RawHit>,
}

/// One hit as it arrives on the wire
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawHit {
    #[serde(rename = "_id", default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(rename = "_score", default, deserialize_with = "lenient_f64")]
    pub score: Option<f64>,
    #[serde(rename = "_source", default)]
    pub source: Value,
    #[serde(default)]
    pub highlight: Value,
    #[serde(default)]
    pub inner_hits: Value,
}

/// Stored fields of a book document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookSource {
    #[serde(default, deserialize_with = "lenient_string")]
    pub book_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    /// Alternative title
    #[serde(default, deserialize_with = "lenient_string")]
    pub book_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub referat: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub book_year: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub lang: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub filter_name: Option<String>,
    /// Source collection; the diversity bucket
    #[serde(default, deserialize_with = "lenient_string")]
    pub path_index: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub pdf_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub pdf_opac_001: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub book_code: Option<String>,
    #[serde(default)]
    pub pages: Vec<PageSource>,
}

/// Stored fields of a page sub-document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSource {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub book_page: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub book_page_image: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub book_page_text: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub cover_book_page: Option<i64>,
}

/// One matched page returned alongside its parent hit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageHit {
    pub source: PageSource,
    pub highlight: HighlightMap,
}

/// A parsed engine hit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchCandidate {
    pub id: String,
    pub score: f64,
    pub source: BookSource,
    pub highlight: HighlightMap,
    pub inner_hits: Vec<PageHit>,
}

impl EngineResponse {
    /// Convert raw hits, dropping only those without a document id
    pub fn into_candidates(self) -> Vec<MatchCandidate> {
        self.hits
            .hits
            .into_iter()
            .filter_map(|hit| {
                let candidate = MatchCandidate::from_raw(hit);
                if candidate.is_none() {
                    tracing::warn!("Dropping engine hit without _id");
                }
                candidate
            })
            .collect()
    }
}

impl MatchCandidate {
    pub fn from_raw(raw: RawHit) -> Option<Self> {
        let id = raw.id.filter(|id| !id.is_empty())?;

        let source = if raw.source.is_null() {
            BookSource::default()
        } else {
            serde_json::from_value(raw.source).unwrap_or_else(|e| {
                tracing::warn!("Malformed _source for hit {}: {}", id, e);
                BookSource::default()
            })
        };

        Some(Self {
            score: raw.score.unwrap_or(0.0),
            source,
            highlight: parse_highlight(&raw.highlight),
            inner_hits: parse_inner_hits(&raw.inner_hits),
            id,
        })
    }
}

fn parse_highlight(value: &Value) -> HighlightMap {
    let mut map = HighlightMap::new();
    if let Some(object) = value.as_object() {
        for (field, fragments) in object {
            let fragments: Vec<String> = fragments
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|f| f.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default();
            if !fragments.is_empty() {
                map.insert(field.clone(), fragments);
            }
        }
    }
    map
}

/// Flatten every named inner-hit collection into one page list
fn parse_inner_hits(value: &Value) -> Vec<PageHit> {
    let Some(collections) = value.as_object() else {
        return Vec::new();
    };

    collections
        .values()
        .filter_map(|collection| collection["hits"]["hits"].as_array())
        .flatten()
        .map(|page| PageHit {
            source: serde_json::from_value(page["_source"].clone()).unwrap_or_default(),
            highlight: parse_highlight(&page["highlight"]),
        })
        .collect()
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}
