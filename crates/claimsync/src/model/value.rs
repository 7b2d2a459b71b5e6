//! Statement values and the keys they hang off.

use std::fmt;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::temporal::TemporalValue;

static DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?\d+(\.\d+)?$").unwrap());

/// Identifier of a property in the store (e.g. `P571`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyKey(String);

impl PropertyKey {
    /// Create a property key, trimming surrounding whitespace.
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(key.as_ref().trim().to_string())
    }

    /// The raw key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PropertyKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for PropertyKey {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

/// Reference to a media file held by the store.
///
/// Names are kept in canonical form: no `File:` namespace prefix and spaces
/// instead of underscores, so two spellings of one title compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetRef(String);

impl AssetRef {
    pub fn new(name: impl AsRef<str>) -> Self {
        let name = name.as_ref().trim();
        let name = name
            .strip_prefix("File:")
            .or_else(|| name.strip_prefix("file:"))
            .unwrap_or(name);
        Self(name.replace('_', " ").trim().to_string())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Title including the `File:` namespace, as the wiki API expects it.
    pub fn title(&self) -> String {
        format!("File:{}", self.0)
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A decimal amount with an optional unit item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quantity {
    /// Normalized decimal string (`.` separator, no trailing zeros).
    pub amount: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Quantity {
    /// Parse an amount such as `"12,50"` or `"73"`.
    ///
    /// Returns `None` when the text is not a plain decimal number.
    pub fn parse(amount: &str, unit: Option<&str>) -> Option<Self> {
        let amount = amount.trim().replace(',', ".");
        if !DECIMAL.is_match(&amount) {
            return None;
        }
        let amount = amount.trim_start_matches('+');
        let amount = if amount.contains('.') {
            amount.trim_end_matches('0').trim_end_matches('.')
        } else {
            amount
        };

        Some(Self {
            amount: amount.to_string(),
            unit: unit.map(str::to_string),
        })
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.unit {
            Some(unit) => write!(f, "{} {}", self.amount, unit),
            None => f.write_str(&self.amount),
        }
    }
}

/// The value carried by a statement, qualifier or reference snak.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Reference to another entity (e.g. `Q3305213`).
    Item(String),
    /// Plain string, also used for URLs and identifiers.
    String(String),
    /// Text in a given language (titles).
    Text { text: String, language: String },
    /// Year-precision temporal value.
    Time(TemporalValue),
    /// Calendar date, used for retrieval dates in references.
    Date(NaiveDate),
    /// Decimal quantity.
    Quantity(Quantity),
    /// Media file in the store.
    Asset(AssetRef),
    /// A value read from the store that this crate does not model (unknown
    /// value, no value, coarser time precision, ...). Kept so the statement
    /// still counts, never equal to anything the engine proposes.
    Opaque(String),
}

impl Value {
    pub fn item(id: impl Into<String>) -> Self {
        Value::Item(id.into())
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn asset(name: impl AsRef<str>) -> Self {
        Value::Asset(AssetRef::new(name))
    }

    /// The asset reference, if this is an asset value.
    pub fn as_asset(&self) -> Option<&AssetRef> {
        match self {
            Value::Asset(asset) => Some(asset),
            _ => None,
        }
    }

    /// Short lowercase name of the variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Item(_) => "item",
            Value::String(_) => "string",
            Value::Text { .. } => "text",
            Value::Time(_) => "time",
            Value::Date(_) => "date",
            Value::Quantity(_) => "quantity",
            Value::Asset(_) => "asset",
            Value::Opaque(_) => "opaque",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Item(id) => f.write_str(id),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Text { text, language } => write!(f, "{}@{}", text, language),
            Value::Time(t) => write!(f, "{}", t),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Quantity(q) => write!(f, "{}", q),
            Value::Asset(a) => write!(f, "File:{}", a),
            Value::Opaque(raw) => write!(f, "<{}>", raw),
        }
    }
}
