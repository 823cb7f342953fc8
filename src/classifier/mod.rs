//! Keyword lookup tables
//!
//! Query categorisation and publication-type detection are plain data:
//! lists of keyword stems loaded from TOML, with a built-in default table.

use crate::error::{FolioError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

const BUILTIN_TABLES: &str = include_str!("../../config-templates/tables.toml");

/// Category rule: a query belongs to the category when it contains any keyword
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    pub keywords: Vec<String>,
}

/// Publication type rule: query words containing a keyword name this type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicationTypeRule {
    pub name: String,
    pub keywords: Vec<String>,
}

/// Tables file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TablesConfig {
    #[serde(default = "default_category")]
    pub default_category: String,
    #[serde(default)]
    pub default_label: Option<String>,
    #[serde(default)]
    pub category: Vec<CategoryRule>,
    #[serde(default)]
    pub publication_type: Vec<PublicationTypeRule>,
}

fn default_category() -> String {
    "general".to_string()
}

/// Classifier over lowercased keyword tables
#[derive(Debug, Clone)]
pub struct Classifier {
    default_category: String,
    default_label: Option<String>,
    categories: Vec<CategoryRule>,
    publication_types: Vec<PublicationTypeRule>,
}

impl Classifier {
    /// Load tables from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| FolioError::Io {
            source: e,
            context: format!("Failed to read classifier tables: {:?}", path),
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let tables: TablesConfig = toml::from_str(content)?;
        Self::from_config(tables)
    }

    /// The tables shipped with the crate
    pub fn builtin() -> Result<Self> {
        Self::from_toml(BUILTIN_TABLES)
    }

    /// Load from `path` when given, the built-in tables otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::builtin(),
        }
    }

    pub fn from_config(tables: TablesConfig) -> Result<Self> {
        let lowercase = |keywords: &[String]| -> Vec<String> {
            keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect()
        };

        let mut categories = Vec::with_capacity(tables.category.len());
        for rule in tables.category {
            let keywords = lowercase(&rule.keywords);
            if keywords.is_empty() {
                return Err(FolioError::Config(format!(
                    "Category '{}' has no keywords",
                    rule.name
                )));
            }
            categories.push(CategoryRule { keywords, ..rule });
        }

        let publication_types = tables
            .publication_type
            .into_iter()
            .map(|rule| PublicationTypeRule {
                keywords: lowercase(&rule.keywords),
                name: rule.name,
            })
            .collect();

        Ok(Self {
            default_category: tables.default_category,
            default_label: tables.default_label,
            categories,
            publication_types,
        })
    }

    /// Category name for a query; first matching rule wins
    pub fn classify(&self, query: &str) -> &str {
        let query = query.to_lowercase();
        self.categories
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| query.contains(k.as_str())))
            .map(|rule| rule.name.as_str())
            .unwrap_or(&self.default_category)
    }

    /// Display label for a category name, falling back to the name itself
    pub fn label<'a>(&'a self, category: &'a str) -> &'a str {
        if category == self.default_category {
            return self.default_label.as_deref().unwrap_or(category);
        }
        self.categories
            .iter()
            .find(|rule| rule.name == category)
            .and_then(|rule| rule.label.as_deref())
            .unwrap_or(category)
    }

    /// Publication types named in the query, in table order
    pub fn detect_publication_types(&self, query: &str) -> Vec<String> {
        let words: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        self.publication_types
            .iter()
            .filter(|rule| {
                words
                    .iter()
                    .any(|w| rule.keywords.iter().any(|k| w.contains(k.as_str())))
            })
            .map(|rule| rule.name.clone())
            .collect()
    }

    /// Query with publication-type words removed. Returns the trimmed
    /// original when nothing else would remain.
    pub fn clean_query(&self, query: &str) -> String {
        let kept: Vec<&str> = query
            .split_whitespace()
            .filter(|word| {
                let word = word.to_lowercase();
                !self
                    .publication_types
                    .iter()
                    .flat_map(|rule| rule.keywords.iter())
                    .any(|k| word.contains(k.as_str()))
            })
            .collect();

        if kept.is_empty() {
            query.trim().to_string()
        } else {
            kept.join(" ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tables_parse() {
        let classifier = Classifier::builtin().unwrap();
        assert_eq!(classifier.classify("Московское метро"), "metro");
        assert_eq!(classifier.classify("Князь Игорь"), "literature");
        assert_eq!(classifier.classify("Палехская миниатюра"), "art");
        assert_eq!(classifier.classify("Маяковский открытка"), "system_test");
        assert_eq!(classifier.classify("Пушкин"), "general");
    }

    #[test]
    fn labels_fall_back_to_name() {
        let classifier = Classifier::builtin().unwrap();
        assert_eq!(classifier.label("metro"), "Московское метро");
        assert_eq!(classifier.label("general"), "Системные тесты");
        assert_eq!(classifier.label("nonexistent"), "nonexistent");
    }

    #[test]
    fn publication_type_is_detected_and_stripped() {
        let classifier = Classifier::builtin().unwrap();
        assert_eq!(
            classifier.detect_publication_types("Маяковский открытка"),
            vec!["postcard".to_string()]
        );
        assert_eq!(classifier.clean_query("Маяковский открытка"), "Маяковский");
        assert_eq!(classifier.clean_query("открытки"), "открытки");
        assert!(classifier.detect_publication_types("Палех").is_empty());
    }

    #[test]
    fn category_without_keywords_is_rejected() {
        let toml = r#"
            [[category]]
            name = "empty"
            keywords = []
        "#;
        assert!(Classifier::from_toml(toml).is_err());
    }
}
