//! Test suite definitions

use crate::error::{FolioError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

const BUILTIN_SUITE: &str = include_str!("../../config-templates/suite.toml");

/// One curated query with the titles a good ranking should surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub query: String,
    #[serde(default)]
    pub description: String,
    pub expected_titles: Vec<String>,
    /// Ranking window searched for expected titles
    #[serde(default = "default_expected_in_top")]
    pub expected_in_top: usize,
    #[serde(default = "default_min_score_threshold")]
    pub min_score_threshold: f64,
}

fn default_expected_in_top() -> usize {
    10
}

fn default_min_score_threshold() -> f64 {
    100.0
}

impl TestCase {
    pub fn new(query: impl Into<String>, expected_titles: Vec<String>) -> Self {
        Self {
            query: query.into(),
            description: String::new(),
            expected_titles,
            expected_in_top: default_expected_in_top(),
            min_score_threshold: default_min_score_threshold(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_expected_in_top(mut self, window: usize) -> Self {
        self.expected_in_top = window;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SuiteFile {
    #[serde(default, rename = "case")]
    cases: Vec<TestCase>,
}

/// Ordered list of test cases
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestSuite {
    cases: Vec<TestCase>,
}

impl TestSuite {
    pub fn new(cases: Vec<TestCase>) -> Self {
        Self { cases }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let file: SuiteFile = toml::from_str(content)?;
        let suite = Self::new(file.cases);
        suite.validate()?;
        Ok(suite)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| FolioError::Io {
            source: e,
            context: format!("Failed to read test suite: {:?}", path),
        })?;
        Self::from_toml(&content)
    }

    pub fn builtin() -> Result<Self> {
        Self::from_toml(BUILTIN_SUITE)
    }

    /// Suite file when given, built-in suite otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::builtin(),
        }
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    fn validate(&self) -> Result<()> {
        for (i, case) in self.cases.iter().enumerate() {
            if case.query.trim().is_empty() {
                return Err(FolioError::InvalidConfigValue {
                    path: format!("case[{}].query", i),
                    message: "Query cannot be empty".to_string(),
                });
            }
            if case.expected_in_top == 0 {
                return Err(FolioError::InvalidConfigValue {
                    path: format!("case[{}].expected_in_top", i),
                    message: "Ranking window must be greater than 0".to_string(),
                });
            }
        }
        Ok(())
    }
}
