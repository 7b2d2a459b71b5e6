//! Raw producer observations and their normalization.

use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::identity::AssetCandidate;
use crate::temporal::TemporalParser;

use super::{FactSetBuilder, FieldCatalog, NormalizedFacts};

/// A binary asset referenced from an observation file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetFile {
    /// Name to upload under.
    pub name: String,
    /// Local path of the downloaded bytes.
    pub path: PathBuf,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// What a producer saw for one subject, before normalization.
///
/// Serialized as one JSON object per line in observation files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawObservation {
    pub external_id: String,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub retrieved: Option<NaiveDate>,
    #[serde(default)]
    pub fields: IndexMap<String, String>,
    #[serde(default)]
    pub asset_files: IndexMap<String, AssetFile>,
    /// Assets already held in memory, for producers that download directly.
    #[serde(skip)]
    pub assets: IndexMap<String, AssetCandidate>,
}

impl RawObservation {
    pub fn new(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            ..Self::default()
        }
    }

    pub fn with_source(mut self, url: impl Into<String>, retrieved: Option<NaiveDate>) -> Self {
        self.source_url = Some(url.into());
        self.retrieved = retrieved;
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_asset(mut self, key: impl Into<String>, candidate: AssetCandidate) -> Self {
        self.assets.insert(key.into(), candidate);
        self
    }
}

/// Turns a raw observation into desired facts.
pub trait Normalize {
    fn normalize(&self, raw: &RawObservation) -> Result<NormalizedFacts>;
}

/// Normalizer driven by a [`FieldCatalog`].
#[derive(Debug, Clone, Default)]
pub struct CatalogNormalizer {
    catalog: FieldCatalog,
    parser: TemporalParser,
}

impl CatalogNormalizer {
    pub fn new(catalog: FieldCatalog) -> Self {
        Self {
            catalog,
            parser: TemporalParser::new(),
        }
    }

    pub fn with_parser(mut self, parser: TemporalParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }
}

impl Normalize for CatalogNormalizer {
    fn normalize(&self, raw: &RawObservation) -> Result<NormalizedFacts> {
        let mut builder = FactSetBuilder::new(&self.catalog, raw.external_id.as_str())
            .with_parser(self.parser)
            .with_source(raw.source_url.as_deref(), raw.retrieved);

        for (key, value) in &raw.fields {
            builder.field(key, value)?;
        }

        for (key, candidate) in &raw.assets {
            builder.asset(key, candidate.clone())?;
        }

        for (key, file) in &raw.asset_files {
            let bytes = fs::read(&file.path).map_err(|e| SyncError::io(&file.path, e))?;
            let mut candidate = AssetCandidate::new(&file.name, bytes);
            if let Some(url) = &file.source_url {
                candidate = candidate.with_source_url(url.as_str());
            }
            if let Some(description) = &file.description {
                candidate = candidate.with_description(description.as_str());
            }
            builder.asset(key, candidate)?;
        }

        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PropertyKey, Value};
    use tempfile::TempDir;

    #[test]
    fn test_observation_from_json_line() {
        let line = r#"{"external_id":"SK-A-1","source_url":"https://museum.example/SK-A-1","retrieved":"2024-03-01","fields":{"instance_of":"Q3305213","inception":"circa 1650"}}"#;
        let raw: RawObservation = serde_json::from_str(line).unwrap();
        assert_eq!(raw.fields.len(), 2);
        assert_eq!(raw.retrieved, NaiveDate::from_ymd_opt(2024, 3, 1));

        let normalized = CatalogNormalizer::default().normalize(&raw).unwrap();
        assert_eq!(normalized.facts.len(), 2);
        assert_eq!(normalized.facts.external_id(), "SK-A-1");
    }

    #[test]
    fn test_asset_file_is_read_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("painting.jpg");
        fs::write(&path, b"jpeg-bytes").unwrap();

        let mut raw = RawObservation::new("SK-A-2");
        raw.asset_files.insert(
            "image".to_string(),
            AssetFile {
                name: "Painting SK-A-2.jpg".to_string(),
                path,
                source_url: Some("https://museum.example/img/2.jpg".to_string()),
                description: None,
            },
        );

        let normalized = CatalogNormalizer::default().normalize(&raw).unwrap();
        let fact = normalized.facts.get(&PropertyKey::new("P18")).unwrap();
        assert_eq!(fact.statement.value, Value::asset("Painting SK-A-2.jpg"));
        assert_eq!(fact.asset.as_ref().unwrap().bytes, b"jpeg-bytes");
    }

    #[test]
    fn test_missing_asset_file_is_io_error() {
        let mut raw = RawObservation::new("SK-A-3");
        raw.asset_files.insert(
            "image".to_string(),
            AssetFile {
                name: "Missing.jpg".to_string(),
                path: PathBuf::from("/nonexistent/claimsync/missing.jpg"),
                source_url: None,
                description: None,
            },
        );
        let err = CatalogNormalizer::default().normalize(&raw).unwrap_err();
        assert!(matches!(err, SyncError::Io { .. }));
    }

    #[test]
    fn test_two_digit_range_uses_configured_century() {
        let raw = RawObservation::new("SK-A-4").with_field("inception", "23-34");
        let plain = CatalogNormalizer::default().normalize(&raw).unwrap();
        assert_eq!(plain.issues.len(), 1);

        let normalized = CatalogNormalizer::default()
            .with_parser(TemporalParser::new().with_century(1900))
            .normalize(&raw)
            .unwrap();
        assert!(normalized.issues.is_empty());
        assert_eq!(normalized.facts.len(), 1);
    }
}
