//! Subject snapshots.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::statement::Statement;
use super::value::PropertyKey;

/// The store's record for one real-world entity or file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    /// Identifier the producing source uses (inventory number, media id, ...).
    pub external_id: String,

    /// Store identifier, absent until the subject has been created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Statements by property, in store order.
    #[serde(default)]
    pub statements: IndexMap<PropertyKey, Vec<Statement>>,
}

impl Subject {
    /// A subject the store does not know yet.
    pub fn empty(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            id: None,
            statements: IndexMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_statement(mut self, statement: Statement) -> Self {
        self.push(statement);
        self
    }

    /// Whether the store holds this subject.
    pub fn exists(&self) -> bool {
        self.id.is_some()
    }

    /// Statements for one property; empty when the property is absent.
    pub fn statements_for(&self, property: &PropertyKey) -> &[Statement] {
        self.statements
            .get(property)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn push(&mut self, statement: Statement) {
        self.statements
            .entry(statement.property.clone())
            .or_default()
            .push(statement);
    }

    /// Total number of statements across all properties.
    pub fn statement_count(&self) -> usize {
        self.statements.values().map(Vec::len).sum()
    }

    /// Identifier to use in logs: the store id if known, else the external id.
    pub fn label(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.external_id)
    }
}
