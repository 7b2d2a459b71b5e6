//! Statements, qualifiers and references.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::value::{PropertyKey, Value};

/// Rank of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    Preferred,
    #[default]
    Normal,
    Deprecated,
}

impl Rank {
    pub fn label(&self) -> &'static str {
        match self {
            Rank::Preferred => "preferred",
            Rank::Normal => "normal",
            Rank::Deprecated => "deprecated",
        }
    }
}

/// Provenance attached to a statement, typically a source URL and a
/// retrieval date.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reference {
    pub snaks: IndexMap<PropertyKey, Value>,
}

impl Reference {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, property: impl Into<PropertyKey>, value: Value) -> Self {
        self.snaks.insert(property.into(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.snaks.is_empty()
    }
}

/// One fact attached to a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// Store-assigned statement id, present on statements read from the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub property: PropertyKey,

    pub value: Value,

    #[serde(default)]
    pub rank: Rank,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub qualifiers: IndexMap<PropertyKey, Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<Reference>,
}

impl Statement {
    /// Create a normal-rank statement without qualifiers or references.
    pub fn new(property: impl Into<PropertyKey>, value: Value) -> Self {
        Self {
            id: None,
            property: property.into(),
            value,
            rank: Rank::Normal,
            qualifiers: IndexMap::new(),
            references: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_rank(mut self, rank: Rank) -> Self {
        self.rank = rank;
        self
    }

    pub fn with_qualifier(mut self, property: impl Into<PropertyKey>, value: Value) -> Self {
        self.qualifiers.insert(property.into(), value);
        self
    }

    pub fn with_reference(mut self, reference: Reference) -> Self {
        if !reference.is_empty() {
            self.references.push(reference);
        }
        self
    }

    /// Value equality, ignoring id, rank, qualifiers and references.
    pub fn same_value(&self, other: &Statement) -> bool {
        self.value == other.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_value_ignores_qualifiers_and_references() {
        let a = Statement::new("P31", Value::item("Q3305213"))
            .with_qualifier("P580", Value::string("x"))
            .with_reference(Reference::new().with("P854", Value::string("https://a")));
        let b = Statement::new("P31", Value::item("Q3305213")).with_id("Q1$abc");

        assert!(a.same_value(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_reference_is_dropped() {
        let s = Statement::new("P31", Value::item("Q1")).with_reference(Reference::new());
        assert!(s.references.is_empty());
    }

    #[test]
    fn test_rank_defaults_to_normal() {
        let s: Statement =
            serde_json::from_str(r#"{"property":"P31","value":{"type":"item","value":"Q1"}}"#)
                .unwrap();
        assert_eq!(s.rank, Rank::Normal);
    }
}
