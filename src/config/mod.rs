//! Configuration management for Folio
//!
//! Loads a TOML file, applies a named profile and `FOLIO_*` environment
//! overrides, then validates the result.

use crate::error::{FolioError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub engine: EngineConfig,
    pub ranking: RankingConfig,
    pub storage: StorageConfig,
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub profiles: HashMap<String, ProfileOverrides>,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Search engine connection and request shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Base URL, e.g. `https://search.example.org:9200`
    pub url: String,
    /// Index queried by both the title and the page query
    pub index: String,
    #[serde(default)]
    pub username: Option<String>,
    /// Name of the environment variable holding the password
    #[serde(default = "default_password_env")]
    pub password_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub accept_invalid_certs: bool,
    #[serde(default = "default_result_size")]
    pub result_size: usize,
    #[serde(default = "default_fragment_size")]
    pub fragment_size: usize,
    /// Matched pages requested per parent document
    #[serde(default = "default_inner_hits")]
    pub inner_hits: usize,
    /// Display URL for a document; `{book_id}` is substituted
    #[serde(default = "default_cover_url_template")]
    pub cover_url_template: String,
}

fn default_password_env() -> String {
    "FOLIO_ENGINE_PASSWORD".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_result_size() -> usize {
    50
}

fn default_fragment_size() -> usize {
    150
}

fn default_inner_hits() -> usize {
    5
}

fn default_cover_url_template() -> String {
    "https://api.electro.nekrasovka.ru/api/books/{book_id}/pages/1/img/medium".to_string()
}

/// Rescoring policy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    Additive,
    Multiplicative,
}

impl std::str::FromStr for PolicyKind {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "additive" => Ok(PolicyKind::Additive),
            "multiplicative" => Ok(PolicyKind::Multiplicative),
            other => Err(FolioError::InvalidConfigValue {
                path: "ranking.policy".to_string(),
                message: format!("Unknown rescoring policy '{}'", other),
            }),
        }
    }
}

impl std::fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyKind::Additive => write!(f, "additive"),
            PolicyKind::Multiplicative => write!(f, "multiplicative"),
        }
    }
}

/// Ranking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    pub policy: PolicyKind,
    /// Apply diversity selection unless the caller opts out
    #[serde(default = "default_true")]
    pub diversity: bool,
    pub max_per_category: usize,
}

fn default_true() -> bool {
    true
}

/// Persisted state locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    #[serde(default)]
    pub interaction_log: Option<PathBuf>,
    #[serde(default)]
    pub history_file: Option<PathBuf>,
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
}

fn default_history_cap() -> usize {
    50
}

impl StorageConfig {
    pub fn interaction_log_path(&self) -> PathBuf {
        self.interaction_log
            .clone()
            .unwrap_or_else(|| self.data_dir.join("interactions.jsonl"))
    }

    pub fn history_path(&self) -> PathBuf {
        self.history_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("search_quality_history.json"))
    }
}

/// Evaluation harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    pub pass_threshold: f64,
    /// TOML test suite; the built-in suite is used when absent
    #[serde(default)]
    pub suite_file: Option<PathBuf>,
    /// TOML classifier tables; the built-in tables are used when absent
    #[serde(default)]
    pub tables_file: Option<PathBuf>,
}

/// Profile-specific configuration overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<PolicyKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_per_category: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FolioError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| FolioError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| FolioError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Load configuration with a specific profile applied
    pub fn load_with_profile(path: &Path, profile: &str) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_profile(profile)?;
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Apply a profile's overrides to the configuration
    pub fn apply_profile(&mut self, profile: &str) -> Result<()> {
        let overrides = self
            .profiles
            .get(profile)
            .cloned()
            .ok_or_else(|| FolioError::Config(format!("Unknown profile '{}'", profile)))?;

        if let Some(policy) = overrides.policy {
            self.ranking.policy = policy;
        }
        if let Some(max) = overrides.max_per_category {
            self.ranking.max_per_category = max;
        }
        if let Some(index) = overrides.index {
            self.engine.index = index;
        }
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: FOLIO_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("FOLIO_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "ENGINE__URL" => self.engine.url = value.to_string(),
            "ENGINE__INDEX" => self.engine.index = value.to_string(),
            "ENGINE__USERNAME" => self.engine.username = Some(value.to_string()),
            "ENGINE__TIMEOUT_SECS" => {
                self.engine.timeout_secs =
                    value.parse().map_err(|_| FolioError::InvalidConfigValue {
                        path: path.to_string(),
                        message: format!("Cannot parse '{}' as seconds", value),
                    })?;
            }
            "RANKING__POLICY" => self.ranking.policy = value.parse()?,
            "RANKING__MAX_PER_CATEGORY" => {
                self.ranking.max_per_category =
                    value.parse().map_err(|_| FolioError::InvalidConfigValue {
                        path: path.to_string(),
                        message: format!("Cannot parse '{}' as integer", value),
                    })?;
            }
            "STORAGE__DATA_DIR" => self.storage.data_dir = PathBuf::from(value),
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| FolioError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("folio").join("config.toml"))
    }

    /// Get the default data directory
    pub fn default_data_dir() -> Result<PathBuf> {
        let home_dir = dirs::home_dir()
            .ok_or_else(|| FolioError::Config("Cannot determine home directory".to_string()))?;

        Ok(home_dir.join(".folio"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: "1.0.0".to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            engine: EngineConfig {
                url: "https://localhost:9200".to_string(),
                index: "my-books-index".to_string(),
                username: Some("admin".to_string()),
                password_env: default_password_env(),
                timeout_secs: default_timeout_secs(),
                accept_invalid_certs: false,
                result_size: default_result_size(),
                fragment_size: default_fragment_size(),
                inner_hits: default_inner_hits(),
                cover_url_template: default_cover_url_template(),
            },
            ranking: RankingConfig {
                policy: PolicyKind::Additive,
                diversity: true,
                max_per_category: 6,
            },
            storage: StorageConfig {
                data_dir: PathBuf::from("~/.folio"),
                interaction_log: None,
                history_file: None,
                history_cap: default_history_cap(),
            },
            evaluation: EvaluationConfig {
                pass_threshold: 70.0,
                suite_file: None,
                tables_file: None,
            },
            profiles: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.ranking.policy, PolicyKind::Additive);
        assert_eq!(parsed.ranking.max_per_category, 6);
        assert_eq!(parsed.storage.history_cap, 50);
    }

    #[test]
    fn profile_overrides_ranking() {
        let mut config = Config::default();
        config.profiles.insert(
            "legacy".to_string(),
            ProfileOverrides {
                policy: Some(PolicyKind::Multiplicative),
                max_per_category: Some(3),
                index: None,
            },
        );
        config.apply_profile("legacy").unwrap();
        assert_eq!(config.ranking.policy, PolicyKind::Multiplicative);
        assert_eq!(config.ranking.max_per_category, 3);
        assert!(config.apply_profile("missing").is_err());
    }

    #[test]
    fn storage_paths_default_under_data_dir() {
        let config = Config::default();
        assert!(config
            .storage
            .history_path()
            .ends_with("search_quality_history.json"));
        assert!(config
            .storage
            .interaction_log_path()
            .ends_with("interactions.jsonl"));
    }

    #[test]
    fn policy_parses_case_insensitively() {
        assert_eq!(
            "Multiplicative".parse::<PolicyKind>().unwrap(),
            PolicyKind::Multiplicative
        );
        assert!("weighted".parse::<PolicyKind>().is_err());
    }
}
