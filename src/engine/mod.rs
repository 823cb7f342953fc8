//! Search engine boundary
//!
//! The engine is an opaque request/response service. [`SearchBackend`] is the
//! seam: the HTTP implementation talks to an OpenSearch-compatible cluster,
//! tests plug in canned hit lists.

mod http;
mod types;

pub use http::OpenSearchBackend;
pub use types::{
    BookSource, EngineResponse, HighlightMap, HitsEnvelope, MatchCandidate, PageHit, PageSource,
    RawHit,
};

use crate::error::Result;
use crate::query::QuerySpec;

/// A search engine that can execute composed queries.
///
/// Implementations must be `Send + Sync`; the title and page queries of one
/// request run concurrently against the same backend.
pub trait SearchBackend: Send + Sync {
    /// Execute one query and return its hits in engine order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FolioError::Engine`] when the call fails as a whole
    /// (transport error, timeout, non-success status, unparseable body).
    fn search(
        &self,
        query: &QuerySpec,
    ) -> impl std::future::Future<Output = Result<Vec<MatchCandidate>>> + Send;
}
