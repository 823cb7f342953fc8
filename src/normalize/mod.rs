//! Query-text variants
//!
//! The composer consumes a [`VariantSet`] as-is. Producing the set is the
//! job of a [`Normalizer`]; the default one adds a transliteration and,
//! optionally, a keyboard-layout remap of the raw text.

mod layout;

use crate::error::{FolioError, Result};
use serde::{Deserialize, Serialize};

pub use layout::{remap_keyboard_layout, transliterate};

/// Ordered, deduplicated, non-empty set of query-text variants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSet(Vec<String>);

impl VariantSet {
    /// Build a set from candidate strings, dropping blanks and repeats while
    /// keeping first-seen order.
    pub fn new<I, S>(candidates: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut variants: Vec<String> = Vec::new();
        for candidate in candidates {
            let candidate = candidate.into().trim().to_string();
            if !candidate.is_empty() && !variants.contains(&candidate) {
                variants.push(candidate);
            }
        }

        if variants.is_empty() {
            return Err(FolioError::InvalidQuery(
                "Query text cannot be empty".to_string(),
            ));
        }
        Ok(Self(variants))
    }

    /// Single-variant set
    pub fn single(text: impl Into<String>) -> Result<Self> {
        Self::new([text.into()])
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The original query text (always the first variant)
    pub fn original(&self) -> &str {
        &self.0[0]
    }

    /// All variants joined by single spaces, the form sent to the engine
    pub fn joined(&self) -> String {
        self.0.join(" ")
    }
}

/// Turns raw query text into a variant set
pub trait Normalizer: Send + Sync {
    fn variants(&self, raw: &str) -> Result<VariantSet>;
}

/// Deterministic normalizer built from character tables
#[derive(Debug, Clone, Default)]
pub struct LayoutNormalizer {
    /// Also add the text as if typed with the wrong keyboard layout
    pub keyboard_remap: bool,
}

impl LayoutNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keyboard_remap(mut self, enabled: bool) -> Self {
        self.keyboard_remap = enabled;
        self
    }
}

impl Normalizer for LayoutNormalizer {
    fn variants(&self, raw: &str) -> Result<VariantSet> {
        let mut candidates = vec![raw.to_string(), transliterate(raw)];
        if self.keyboard_remap {
            candidates.push(remap_keyboard_layout(raw));
        }
        VariantSet::new(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_set_dedups_in_order() {
        let set = VariantSet::new(["метро", "metro", "метро", "  "]).unwrap();
        assert_eq!(set.as_slice(), &["метро".to_string(), "metro".to_string()]);
        assert_eq!(set.original(), "метро");
        assert_eq!(set.joined(), "метро metro");
    }

    #[test]
    fn empty_variant_set_is_rejected() {
        assert!(VariantSet::new(Vec::<String>::new()).is_err());
        assert!(VariantSet::single("   ").is_err());
    }

    #[test]
    fn layout_normalizer_adds_transliteration() {
        let set = LayoutNormalizer::new().variants("Палех").unwrap();
        assert_eq!(set.as_slice(), &["Палех".to_string(), "palekh".to_string()]);
    }

    #[test]
    fn layout_normalizer_with_remap() {
        let set = LayoutNormalizer::new()
            .with_keyboard_remap(true)
            .variants("ghbdtn")
            .unwrap();
        assert!(set.as_slice().contains(&"привет".to_string()));
    }
}
