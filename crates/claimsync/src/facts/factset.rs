//! Desired state for one subject.

use indexmap::IndexMap;

use crate::error::{Result, SyncError};
use crate::identity::AssetCandidate;
use crate::model::{PropertyKey, Statement, Value};

/// One desired statement, with the asset bytes when the value is a media file.
#[derive(Debug, Clone)]
pub struct DesiredFact {
    pub statement: Statement,
    pub asset: Option<AssetCandidate>,
}

impl DesiredFact {
    pub fn property(&self) -> &PropertyKey {
        &self.statement.property
    }
}

/// What should be true about a subject after this run.
///
/// Holds at most one desired statement per property, in declaration order.
#[derive(Debug, Clone)]
pub struct FactSet {
    external_id: String,
    source_url: Option<String>,
    facts: IndexMap<PropertyKey, DesiredFact>,
}

impl FactSet {
    pub fn new(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            source_url: None,
            facts: IndexMap::new(),
        }
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }

    /// Declare a desired statement. A second statement for the same
    /// property is refused.
    pub fn insert(&mut self, statement: Statement) -> Result<()> {
        self.insert_fact(DesiredFact {
            statement,
            asset: None,
        })
    }

    /// Declare a desired media statement backed by candidate bytes.
    ///
    /// The statement's value is set to the candidate's name.
    pub fn insert_asset(&mut self, mut statement: Statement, candidate: AssetCandidate) -> Result<()> {
        statement.value = Value::Asset(candidate.name.clone());
        self.insert_fact(DesiredFact {
            statement,
            asset: Some(candidate),
        })
    }

    /// Builder-style [`FactSet::insert`].
    pub fn with(mut self, statement: Statement) -> Result<Self> {
        self.insert(statement)?;
        Ok(self)
    }

    fn insert_fact(&mut self, fact: DesiredFact) -> Result<()> {
        let property = fact.property().clone();
        if self.facts.contains_key(&property) {
            return Err(SyncError::InvalidValue {
                key: property.to_string(),
                message: format!("a desired statement for {} already exists", property),
            });
        }
        self.facts.insert(property, fact);
        Ok(())
    }

    pub fn contains(&self, property: &PropertyKey) -> bool {
        self.facts.contains_key(property)
    }

    pub fn get(&self, property: &PropertyKey) -> Option<&DesiredFact> {
        self.facts.get(property)
    }

    /// Desired facts in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &DesiredFact> {
        self.facts.values()
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}
