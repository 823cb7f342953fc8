//! Match tiers: each tier is one `multi_match` clause with its own strictness
//! and boost. Stricter tiers carry larger boosts.

use serde_json::{json, Value};

/// How the words of the query must match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Exact phrase
    Phrase,
    /// Every word present in one field
    AllWords,
    /// Every word present across the listed fields
    CrossFieldsAll,
    /// Any word present
    AnyWords,
}

impl MatchKind {
    fn type_and_operator(self) -> (&'static str, Option<&'static str>) {
        match self {
            MatchKind::Phrase => ("phrase", None),
            MatchKind::AllWords => ("best_fields", Some("and")),
            MatchKind::CrossFieldsAll => ("cross_fields", Some("and")),
            MatchKind::AnyWords => ("best_fields", Some("or")),
        }
    }
}

/// Field name with its per-field boost
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldBoost {
    pub field: &'static str,
    pub boost: u32,
}

impl FieldBoost {
    const fn new(field: &'static str, boost: u32) -> Self {
        Self { field, boost }
    }

    fn render(self) -> String {
        format!("{}^{}", self.field, self.boost)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchTier {
    pub kind: MatchKind,
    pub fields: Vec<FieldBoost>,
    pub boost: f64,
}

impl MatchTier {
    fn new(kind: MatchKind, fields: &[FieldBoost], boost: f64) -> Self {
        Self {
            kind,
            fields: fields.to_vec(),
            boost,
        }
    }

    pub(crate) fn to_clause(&self, text: &str) -> Value {
        let (kind, operator) = self.kind.type_and_operator();
        let fields: Vec<String> = self.fields.iter().map(|f| f.render()).collect();

        let mut clause = json!({
            "query": text,
            "fields": fields,
            "type": kind,
            "boost": self.boost
        });
        if let Some(operator) = operator {
            clause["operator"] = json!(operator);
        }
        json!({ "multi_match": clause })
    }
}

pub(crate) fn title_tiers() -> Vec<MatchTier> {
    vec![
        MatchTier::new(
            MatchKind::Phrase,
            &[FieldBoost::new("title", 25), FieldBoost::new("book_name", 25)],
            10.0,
        ),
        MatchTier::new(
            MatchKind::AllWords,
            &[FieldBoost::new("title", 15), FieldBoost::new("book_name", 15)],
            5.0,
        ),
        MatchTier::new(
            MatchKind::CrossFieldsAll,
            &[
                FieldBoost::new("title", 8),
                FieldBoost::new("book_name", 8),
                FieldBoost::new("description", 4),
            ],
            3.0,
        ),
        MatchTier::new(
            MatchKind::AnyWords,
            &[
                FieldBoost::new("title", 4),
                FieldBoost::new("book_name", 4),
                FieldBoost::new("description", 2),
            ],
            1.0,
        ),
    ]
}

pub(crate) fn page_tiers() -> Vec<MatchTier> {
    vec![
        MatchTier::new(
            MatchKind::Phrase,
            &[FieldBoost::new("pages.book_page_text", 15)],
            3.0,
        ),
        MatchTier::new(
            MatchKind::AllWords,
            &[FieldBoost::new("pages.book_page_text", 10)],
            2.0,
        ),
        MatchTier::new(
            MatchKind::AnyWords,
            &[FieldBoost::new("pages.book_page_text", 5)],
            1.0,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phrase_clause_has_no_operator() {
        let clause = title_tiers()[0].to_clause("метро");
        assert_eq!(clause["multi_match"]["type"], "phrase");
        assert!(clause["multi_match"].get("operator").is_none());
        assert_eq!(clause["multi_match"]["fields"][0], "title^25");
    }

    #[test]
    fn any_words_clause_uses_or() {
        let clause = page_tiers()[2].to_clause("метро");
        assert_eq!(clause["multi_match"]["operator"], "or");
        assert_eq!(clause["multi_match"]["fields"][0], "pages.book_page_text^5");
    }
}
