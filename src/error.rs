use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Folio
#[derive(Error, Debug)]
pub enum FolioError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// A single engine call failed (timeout, transport, malformed response)
    #[error("Search engine error: {0}")]
    Engine(String),

    /// Every engine call issued for a request failed
    #[error("Search engine unreachable (title query: {title}; page query: {page})")]
    EngineUnreachable { title: String, page: String },

    /// Query text rejected before reaching the engine
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// History index out of range
    #[error("History index {index} out of range (history has {len} entries)")]
    HistoryIndex { index: usize, len: usize },

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FolioError {
    /// True when the error means "the engine could not be reached at all",
    /// as opposed to a search that simply found nothing.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, FolioError::EngineUnreachable { .. })
    }
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for Folio operations
pub type Result<T> = std::result::Result<T, FolioError>;
