//! Field catalog: which observation keys exist and what they become.

use serde::{Deserialize, Serialize};

use crate::model::{PropertyKey, Rank};
use crate::temporal::TimeQualifiers;

/// How a raw field string is turned into a statement value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    /// Entity id such as `Q3305213`.
    Item,
    /// Plain string.
    String,
    /// Text in a fixed language.
    Text { language: String },
    /// Free-text date expression, run through the temporal parser.
    Temporal,
    /// Decimal amount, optionally with a unit item.
    Quantity {
        #[serde(default)]
        unit: Option<String>,
    },
    /// ISO calendar date (`YYYY-MM-DD`).
    Date,
    /// Binary asset; supplied as bytes, never as a string field.
    Asset,
}

/// One known observation field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub key: String,
    pub property: PropertyKey,
    #[serde(flatten)]
    pub kind: FieldKind,
    /// Report the field as missing when an observation lacks it.
    #[serde(default)]
    pub expected: bool,
    #[serde(default)]
    pub rank: Rank,
}

impl FieldSpec {
    pub fn new(key: &str, property: &str, kind: FieldKind) -> Self {
        Self {
            key: key.to_string(),
            property: PropertyKey::new(property),
            kind,
            expected: false,
            rank: Rank::Normal,
        }
    }

    pub fn expected(mut self) -> Self {
        self.expected = true;
        self
    }
}

/// The set of fields producers may fill, plus the reference and time
/// qualifier conventions used when building statements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldCatalog {
    pub fields: Vec<FieldSpec>,
    pub time: TimeQualifiers,
    /// Reference snak holding the source URL.
    pub reference_url: PropertyKey,
    /// Reference snak holding the retrieval date.
    pub retrieved: PropertyKey,
}

impl FieldCatalog {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self {
            fields,
            ..Self::artworks()
        }
    }

    /// Catalog for paintings and other collection objects.
    pub fn artworks() -> Self {
        let cm = Some("Q174728".to_string());
        Self {
            fields: vec![
                FieldSpec::new("instance_of", "P31", FieldKind::Item).expected(),
                FieldSpec::new("collection", "P195", FieldKind::Item).expected(),
                FieldSpec::new("inventory_number", "P217", FieldKind::String).expected(),
                FieldSpec::new("location", "P276", FieldKind::Item),
                FieldSpec::new("creator", "P170", FieldKind::Item),
                FieldSpec::new("title", "P1476", FieldKind::Text { language: "en".into() }),
                FieldSpec::new("inception", "P571", FieldKind::Temporal),
                FieldSpec::new("made_in", "P1071", FieldKind::Item),
                FieldSpec::new("height_cm", "P2048", FieldKind::Quantity { unit: cm.clone() }),
                FieldSpec::new("width_cm", "P2049", FieldKind::Quantity { unit: cm }),
                FieldSpec::new("described_at_url", "P973", FieldKind::String),
                FieldSpec::new("image", "P18", FieldKind::Asset),
            ],
            time: TimeQualifiers::default(),
            reference_url: PropertyKey::new("P854"),
            retrieved: PropertyKey::new("P813"),
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn expected_keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().filter(|f| f.expected).map(|f| f.key.as_str())
    }
}

impl Default for FieldCatalog {
    fn default() -> Self {
        Self::artworks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artwork_catalog_lookup() {
        let catalog = FieldCatalog::artworks();
        assert_eq!(catalog.get("inception").unwrap().property, PropertyKey::new("P571"));
        assert!(catalog.get("medium").is_none());
        let expected: Vec<_> = catalog.expected_keys().collect();
        assert_eq!(expected, vec!["instance_of", "collection", "inventory_number"]);
    }

    #[test]
    fn test_field_spec_from_toml() {
        let spec: FieldSpec = toml::from_str(
            r#"
            key = "height"
            property = "P2048"
            kind = "quantity"
            unit = "Q174728"
            expected = true
            "#,
        )
        .unwrap();
        assert_eq!(spec.kind, FieldKind::Quantity { unit: Some("Q174728".into()) });
        assert!(spec.expected);
        assert_eq!(spec.rank, Rank::Normal);
    }
}
