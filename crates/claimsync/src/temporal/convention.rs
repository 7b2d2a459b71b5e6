//! How circa dates and ranges are expressed as statement qualifiers.

use serde::{Deserialize, Serialize};

use crate::model::PropertyKey;

/// Qualifier keys used to encode the shapes a bare year value cannot hold.
///
/// A circa year carries `sourcing = circa_item`. A range is stored as its
/// start year with `earliest` and `latest` qualifiers holding the bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeQualifiers {
    pub earliest: PropertyKey,
    pub latest: PropertyKey,
    pub sourcing: PropertyKey,
    pub circa_item: String,
}

impl Default for TimeQualifiers {
    fn default() -> Self {
        Self {
            earliest: PropertyKey::new("P1319"),
            latest: PropertyKey::new("P1326"),
            sourcing: PropertyKey::new("P1480"),
            circa_item: "Q5727902".to_string(),
        }
    }
}
