//! Validated construction of a [`FactSet`] from raw field strings.

use std::collections::HashSet;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::{Result, SyncError};
use crate::identity::AssetCandidate;
use crate::model::{Quantity, Reference, Statement, Value};
use crate::temporal::{Temporal, TemporalParser, TimeQualifiers};

use super::{FactSet, FieldCatalog, FieldKind, FieldSpec};

static ITEM_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Q\d+$").unwrap());

/// A field that was dropped while building, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub key: String,
    pub reason: String,
}

/// Builder output: the facts plus what was missing or dropped.
#[derive(Debug, Clone)]
pub struct NormalizedFacts {
    pub facts: FactSet,
    /// Expected catalog keys the observation did not provide.
    pub missing: Vec<String>,
    /// Fields that were present but could not be used.
    pub issues: Vec<FieldIssue>,
}

impl NormalizedFacts {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.issues.is_empty()
    }
}

/// Turns catalog fields into desired statements.
///
/// Unknown keys are an error: the catalog is the contract with producers.
/// Values that fail to parse are logged and left out, and the subject's
/// other fields still go through.
pub struct FactSetBuilder<'a> {
    catalog: &'a FieldCatalog,
    parser: TemporalParser,
    facts: FactSet,
    reference: Reference,
    seen: HashSet<String>,
    issues: Vec<FieldIssue>,
}

impl<'a> FactSetBuilder<'a> {
    pub fn new(catalog: &'a FieldCatalog, external_id: impl Into<String>) -> Self {
        Self {
            catalog,
            parser: TemporalParser::new(),
            facts: FactSet::new(external_id),
            reference: Reference::new(),
            seen: HashSet::new(),
            issues: Vec::new(),
        }
    }

    pub fn with_parser(mut self, parser: TemporalParser) -> Self {
        self.parser = parser;
        self
    }

    /// Attach a source reference to every statement built from here on.
    pub fn with_source(mut self, url: Option<&str>, retrieved: Option<NaiveDate>) -> Self {
        let mut reference = Reference::new();
        if let Some(url) = url {
            reference = reference.with(self.catalog.reference_url.clone(), Value::string(url));
            self.facts = self.facts.with_source_url(url);
        }
        if let Some(date) = retrieved {
            reference = reference.with(self.catalog.retrieved.clone(), Value::Date(date));
        }
        self.reference = reference;
        self
    }

    /// Add one string field.
    pub fn field(&mut self, key: &str, raw: &str) -> Result<()> {
        let spec = self.spec(key)?;
        if spec.kind == FieldKind::Asset {
            return Err(SyncError::InvalidValue {
                key: key.to_string(),
                message: "asset fields take file bytes, not text".to_string(),
            });
        }

        let raw = raw.trim();
        if raw.is_empty() {
            self.issue(key, "empty value".to_string());
            return Ok(());
        }

        match self.statement_for(spec, raw) {
            Ok(statement) => self.accept(key, statement, None),
            Err(reason) => {
                warn!(
                    subject = self.facts.external_id(),
                    field = key,
                    input = raw,
                    "Could not parse field: {}",
                    reason
                );
                self.issue(key, reason);
                Ok(())
            }
        }
    }

    /// Add one asset field with downloaded bytes.
    pub fn asset(&mut self, key: &str, candidate: AssetCandidate) -> Result<()> {
        let spec = self.spec(key)?;
        if spec.kind != FieldKind::Asset {
            return Err(SyncError::InvalidValue {
                key: key.to_string(),
                message: format!("field '{}' is not an asset field", key),
            });
        }
        if candidate.bytes.is_empty() {
            self.issue(key, "asset has no content".to_string());
            return Ok(());
        }

        let statement = Statement::new(spec.property.clone(), Value::Asset(candidate.name.clone()))
            .with_rank(spec.rank)
            .with_reference(self.reference.clone());
        self.accept(key, statement, Some(candidate))
    }

    pub fn build(self) -> NormalizedFacts {
        let missing = self
            .catalog
            .expected_keys()
            .filter(|key| !self.seen.contains(*key))
            .map(str::to_string)
            .collect::<Vec<_>>();

        if !missing.is_empty() {
            debug!(subject = self.facts.external_id(), missing = ?missing, "Expected fields missing");
        }

        NormalizedFacts {
            facts: self.facts,
            missing,
            issues: self.issues,
        }
    }

    fn spec(&self, key: &str) -> Result<&'a FieldSpec> {
        self.catalog.get(key).ok_or_else(|| SyncError::UnknownField {
            subject: self.facts.external_id().to_string(),
            key: key.to_string(),
        })
    }

    fn accept(&mut self, key: &str, statement: Statement, asset: Option<AssetCandidate>) -> Result<()> {
        if self.facts.contains(&statement.property) {
            self.issue(key, format!("another field already set {}", statement.property));
            return Ok(());
        }
        match asset {
            Some(candidate) => self.facts.insert_asset(statement, candidate)?,
            None => self.facts.insert(statement)?,
        }
        self.seen.insert(key.to_string());
        Ok(())
    }

    fn issue(&mut self, key: &str, reason: String) {
        self.issues.push(FieldIssue {
            key: key.to_string(),
            reason,
        });
    }

    fn statement_for(&self, spec: &FieldSpec, raw: &str) -> std::result::Result<Statement, String> {
        let statement = match &spec.kind {
            FieldKind::Item => {
                if !ITEM_ID.is_match(raw) {
                    return Err(format!("'{}' is not an item id", raw));
                }
                Statement::new(spec.property.clone(), Value::item(raw))
            }
            FieldKind::String => Statement::new(spec.property.clone(), Value::string(raw)),
            FieldKind::Text { language } => Statement::new(
                spec.property.clone(),
                Value::Text {
                    text: raw.to_string(),
                    language: language.clone(),
                },
            ),
            FieldKind::Quantity { unit } => {
                let quantity = Quantity::parse(raw, unit.as_deref())
                    .ok_or_else(|| format!("'{}' is not a number", raw))?;
                Statement::new(spec.property.clone(), Value::Quantity(quantity))
            }
            FieldKind::Date => {
                let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| e.to_string())?;
                Statement::new(spec.property.clone(), Value::Date(date))
            }
            FieldKind::Temporal => {
                let temporal = self.parser.parse(raw).map_err(|e| e.to_string())?;
                temporal_statement(spec, temporal, &self.catalog.time)
            }
            FieldKind::Asset => return Err("asset fields take file bytes".to_string()),
        };

        Ok(statement
            .with_rank(spec.rank)
            .with_reference(self.reference.clone()))
    }
}

/// Statement for a parsed date: the main value plus circa or range qualifiers.
fn temporal_statement(spec: &FieldSpec, temporal: Temporal, time: &TimeQualifiers) -> Statement {
    let mut statement = Statement::new(spec.property.clone(), Value::Time(temporal.main_value()));

    if let Some((start, end)) = temporal.bounds() {
        statement = statement
            .with_qualifier(time.earliest.clone(), Value::Time(start))
            .with_qualifier(time.latest.clone(), Value::Time(end));
    }
    if temporal.is_circa() {
        statement = statement.with_qualifier(time.sourcing.clone(), Value::item(&time.circa_item));
    }

    statement
}
