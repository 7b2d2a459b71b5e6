//! Run configuration.
//!
//! Everything a run needs except credentials, which come from the
//! environment (see [`Credentials::from_env`](crate::store::Credentials::from_env)).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::facts::FieldCatalog;
use crate::identity::FingerprintAlgorithm;
use crate::ledger::ReportFormat;
use crate::reconcile::{EngineConfig, ReplacePolicy};
use crate::store::{BulkFilter, StoreConfig};
use crate::submit::SubmitterConfig;
use crate::temporal::TemporalParser;

/// Where and how the duplicate report is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub format: ReportFormat,
    pub path: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: ReportFormat::Tsv,
            path: PathBuf::from("duplicates.tsv"),
        }
    }
}

/// Per-run behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Create subjects the store does not have yet.
    pub create_missing: bool,
    /// Bulk query used to seed the subject cache. Without it every subject
    /// is resolved by point lookup.
    pub collection: Option<BulkFilter>,
    /// Century for fully two-digit date ranges such as `23-34`.
    pub century: Option<i32>,
    /// Edit summary for each subject's mutation.
    pub summary: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            create_missing: false,
            collection: None,
            century: None,
            summary: "Adding statements from source metadata".to_string(),
        }
    }
}

impl RunConfig {
    pub fn parser(&self) -> TemporalParser {
        match self.century {
            Some(century) => TemporalParser::new().with_century(century),
            None => TemporalParser::new(),
        }
    }
}

/// Complete configuration for a sync run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    pub run: RunConfig,
    pub store: StoreConfig,
    pub submitter: SubmitterConfig,
    pub engine: EngineConfig,
    pub fingerprint: FingerprintAlgorithm,
    pub report: ReportConfig,
    pub catalog: FieldCatalog,
}

impl SyncConfig {
    /// Load and validate a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: SyncConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let mut keys = HashSet::new();
        let mut properties = HashSet::new();
        for field in &self.catalog.fields {
            if !keys.insert(field.key.as_str()) {
                return Err(SyncError::Config(format!("Duplicate catalog field '{}'", field.key)));
            }
            if !properties.insert(&field.property) {
                return Err(SyncError::Config(format!(
                    "Catalog maps two fields to {}",
                    field.property
                )));
            }
        }

        for (property, policy) in &self.engine.replace_policies {
            let ReplacePolicy::LargerAsset { factor } = policy;
            if !factor.is_finite() || *factor < 1.0 {
                return Err(SyncError::Config(format!(
                    "Replace factor for {} must be at least 1, got {}",
                    property, factor
                )));
            }
        }

        Ok(())
    }
}
