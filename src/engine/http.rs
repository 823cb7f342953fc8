//! HTTP backend for an OpenSearch-compatible engine

use crate::config::EngineConfig;
use crate::engine::{EngineResponse, MatchCandidate, SearchBackend};
use crate::error::{FolioError, Result};
use crate::query::QuerySpec;
use std::time::Duration;

/// Sends composed queries to `{url}/{index}/_search`
#[derive(Debug, Clone)]
pub struct OpenSearchBackend {
    client: reqwest::Client,
    search_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl OpenSearchBackend {
    /// Build a backend from configuration. The password is read from the
    /// environment variable named by `password_env`.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| FolioError::Engine(format!("failed to build HTTP client: {e}")))?;

        let password = std::env::var(&config.password_env).ok();
        if config.username.is_some() && password.is_none() {
            tracing::warn!(
                "Engine username configured but {} is not set; sending no password",
                config.password_env
            );
        }

        Ok(Self {
            client,
            search_url: format!(
                "{}/{}/_search",
                config.url.trim_end_matches('/'),
                config.index
            ),
            username: config.username.clone(),
            password,
        })
    }

    pub fn search_url(&self) -> &str {
        &self.search_url
    }
}

impl SearchBackend for OpenSearchBackend {
    async fn search(&self, query: &QuerySpec) -> Result<Vec<MatchCandidate>> {
        let kind = query.kind();
        let mut request = self.client.post(&self.search_url).json(&query.to_body());
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_deref());
        }

        let response = request
            .send()
            .await
            .map_err(|e| FolioError::Engine(format!("{kind} query request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(200).collect();
            return Err(FolioError::Engine(format!(
                "{kind} query returned {status}: {preview}"
            )));
        }

        let parsed: EngineResponse = response
            .json()
            .await
            .map_err(|e| FolioError::Engine(format!("{kind} query response malformed: {e}")))?;

        let candidates = parsed.into_candidates();
        tracing::debug!(query = %kind, hits = candidates.len(), "engine returned hits");
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn search_url_joins_base_and_index() {
        let mut config = Config::default().engine;
        config.url = "https://search.example.org:9200/".to_string();
        config.index = "books".to_string();
        let backend = OpenSearchBackend::new(&config).unwrap();
        assert_eq!(
            backend.search_url(),
            "https://search.example.org:9200/books/_search"
        );
    }
}
