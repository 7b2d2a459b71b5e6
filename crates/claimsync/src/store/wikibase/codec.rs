//! Wikibase JSON <-> statement model.
//!
//! Years are written with precision 9 and calendar dates with precision 11.
//! Circa and range shapes live in qualifiers (see [`TimeQualifiers`]), so the
//! precision tag of a decoded year depends on the qualifiers next to it.
//! Anything the model cannot express decodes to [`Value::Opaque`].

use chrono::NaiveDate;
use serde_json::{json, Map, Value as Json};

use crate::model::{AssetRef, PropertyKey, Quantity, Rank, Reference, Statement, Subject, Value};
use crate::temporal::{TemporalValue, TimeQualifiers};

const GREGORIAN: &str = "http://www.wikidata.org/entity/Q1985727";

const PRECISION_YEAR: u64 = 9;
const PRECISION_DAY: u64 = 11;

/// Encoding and decoding settings.
#[derive(Debug, Clone)]
pub struct Codec {
    /// Concept URI prefix used for quantity units.
    pub concept_base: String,
    pub time: TimeQualifiers,
}

impl Codec {
    pub fn new(concept_base: impl Into<String>, time: TimeQualifiers) -> Self {
        Self {
            concept_base: concept_base.into(),
            time,
        }
    }

    // =========================================================================
    // ENCODING
    // =========================================================================

    /// Full claim JSON for `wbeditentity`.
    pub fn encode_statement(&self, statement: &Statement) -> Json {
        let mut claim = Map::new();
        if let Some(id) = &statement.id {
            claim.insert("id".into(), json!(id));
        }
        claim.insert("type".into(), json!("statement"));
        claim.insert("rank".into(), json!(statement.rank.label()));
        claim.insert("mainsnak".into(), self.encode_snak(&statement.property, &statement.value));

        if !statement.qualifiers.is_empty() {
            let mut qualifiers = Map::new();
            for (property, value) in &statement.qualifiers {
                qualifiers.insert(property.to_string(), json!([self.encode_snak(property, value)]));
            }
            claim.insert("qualifiers".into(), Json::Object(qualifiers));
        }

        if !statement.references.is_empty() {
            let references: Vec<Json> = statement
                .references
                .iter()
                .map(|reference| {
                    let mut snaks = Map::new();
                    for (property, value) in &reference.snaks {
                        snaks.insert(property.to_string(), json!([self.encode_snak(property, value)]));
                    }
                    json!({ "snaks": snaks })
                })
                .collect();
            claim.insert("references".into(), json!(references));
        }

        Json::Object(claim)
    }

    fn encode_snak(&self, property: &PropertyKey, value: &Value) -> Json {
        let (datavalue, datatype) = match value {
            Value::Item(id) => {
                let numeric = id.trim_start_matches('Q').parse::<u64>().ok();
                let mut entity = json!({ "entity-type": "item", "id": id });
                if let Some(n) = numeric {
                    entity["numeric-id"] = json!(n);
                }
                (json!({ "type": "wikibase-entityid", "value": entity }), "wikibase-item")
            }
            Value::String(s) => (json!({ "type": "string", "value": s }), "string"),
            Value::Text { text, language } => (
                json!({ "type": "monolingualtext", "value": { "text": text, "language": language } }),
                "monolingualtext",
            ),
            Value::Time(t) => (time_value(&year_timestamp(t.year), PRECISION_YEAR), "time"),
            Value::Date(d) => (time_value(&date_timestamp(d), PRECISION_DAY), "time"),
            Value::Quantity(q) => {
                let unit = match &q.unit {
                    Some(unit) => format!("{}{}", self.concept_base, unit),
                    None => "1".to_string(),
                };
                let amount = if q.amount.starts_with('-') {
                    q.amount.clone()
                } else {
                    format!("+{}", q.amount)
                };
                (
                    json!({ "type": "quantity", "value": { "amount": amount, "unit": unit } }),
                    "quantity",
                )
            }
            Value::Asset(asset) => (json!({ "type": "string", "value": asset.name() }), "commonsMedia"),
            // Only ever read from the store; never proposed by the engine.
            Value::Opaque(_) => return json!({ "snaktype": "somevalue", "property": property }),
        };

        json!({
            "snaktype": "value",
            "property": property,
            "datavalue": datavalue,
            "datatype": datatype,
        })
    }

    // =========================================================================
    // DECODING
    // =========================================================================

    /// Subject from one `wbgetentities` entity. `None` for missing entities.
    pub fn decode_entity(&self, external_id: &str, entity: &Json) -> Option<Subject> {
        if entity.get("missing").is_some() {
            return None;
        }
        let id = entity.get("id").and_then(Json::as_str)?;
        let mut subject = Subject::empty(external_id).with_id(id);

        let claims = entity
            .get("claims")
            .or_else(|| entity.get("statements"))
            .and_then(Json::as_object);
        if let Some(claims) = claims {
            for statements in claims.values() {
                for claim in statements.as_array().into_iter().flatten() {
                    if let Some(statement) = self.decode_statement(claim) {
                        subject.push(statement);
                    }
                }
            }
        }

        Some(subject)
    }

    fn decode_statement(&self, claim: &Json) -> Option<Statement> {
        let mainsnak = claim.get("mainsnak")?;
        let property = PropertyKey::new(mainsnak.get("property").and_then(Json::as_str)?);

        let mut statement = Statement::new(property, decode_snak(mainsnak, &self.concept_base));
        if let Some(id) = claim.get("id").and_then(Json::as_str) {
            statement = statement.with_id(id);
        }
        statement = statement.with_rank(match claim.get("rank").and_then(Json::as_str) {
            Some("preferred") => Rank::Preferred,
            Some("deprecated") => Rank::Deprecated,
            _ => Rank::Normal,
        });

        if let Some(qualifiers) = claim.get("qualifiers").and_then(Json::as_object) {
            for (property, snaks) in qualifiers {
                // One value per qualifier key; extra values are dropped.
                if let Some(snak) = snaks.as_array().and_then(|s| s.first()) {
                    statement = statement.with_qualifier(property.as_str(), decode_snak(snak, &self.concept_base));
                }
            }
        }

        for reference in claim.get("references").and_then(Json::as_array).into_iter().flatten() {
            let mut decoded = Reference::new();
            if let Some(snaks) = reference.get("snaks").and_then(Json::as_object) {
                for (property, values) in snaks {
                    if let Some(snak) = values.as_array().and_then(|s| s.first()) {
                        decoded = decoded.with(property.as_str(), decode_snak(snak, &self.concept_base));
                    }
                }
            }
            statement = statement.with_reference(decoded);
        }

        self.tag_time_precision(&mut statement);
        Some(statement)
    }

    /// Retag year values according to the circa and range qualifiers.
    fn tag_time_precision(&self, statement: &mut Statement) {
        let Value::Time(main) = statement.value else {
            return;
        };
        let circa = statement.qualifiers.get(&self.time.sourcing) == Some(&Value::item(&self.time.circa_item));
        let earliest = statement.qualifiers.get(&self.time.earliest).cloned();
        let latest = statement.qualifiers.get(&self.time.latest).cloned();

        match (earliest, latest) {
            (Some(Value::Time(start)), Some(Value::Time(end))) => {
                statement.value = Value::Time(TemporalValue::range_start(main.year, circa));
                statement
                    .qualifiers
                    .insert(self.time.earliest.clone(), Value::Time(TemporalValue::range_start(start.year, circa)));
                statement
                    .qualifiers
                    .insert(self.time.latest.clone(), Value::Time(TemporalValue::range_end(end.year, circa)));
            }
            _ if circa => statement.value = Value::Time(TemporalValue::circa(main.year)),
            _ => {}
        }
    }
}

fn time_value(timestamp: &str, precision: u64) -> Json {
    json!({
        "type": "time",
        "value": {
            "time": timestamp,
            "timezone": 0,
            "before": 0,
            "after": 0,
            "precision": precision,
            "calendarmodel": GREGORIAN,
        }
    })
}

fn year_timestamp(year: i32) -> String {
    let sign = if year < 0 { '-' } else { '+' };
    format!("{}{:04}-00-00T00:00:00Z", sign, year.unsigned_abs())
}

fn date_timestamp(date: &NaiveDate) -> String {
    format!("+{}T00:00:00Z", date.format("%Y-%m-%d"))
}

/// Year and date parts of a `+YYYY-MM-DDT00:00:00Z` timestamp.
fn parse_timestamp(timestamp: &str) -> Option<(i32, u32, u32)> {
    let (negative, rest) = match timestamp.chars().next()? {
        '-' => (true, &timestamp[1..]),
        '+' => (false, &timestamp[1..]),
        _ => (false, timestamp),
    };
    let date = rest.split('T').next()?;
    let mut parts = date.splitn(3, '-');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u32 = parts.next()?.parse().ok()?;
    let day: u32 = parts.next()?.parse().ok()?;
    Some((if negative { -year } else { year }, month, day))
}

fn decode_snak(snak: &Json, concept_base: &str) -> Value {
    let snaktype = snak.get("snaktype").and_then(Json::as_str).unwrap_or("value");
    if snaktype != "value" {
        return Value::Opaque(snaktype.to_string());
    }
    let Some(datavalue) = snak.get("datavalue") else {
        return Value::Opaque("no datavalue".to_string());
    };
    let datatype = snak.get("datatype").and_then(Json::as_str).unwrap_or_default();
    let kind = datavalue.get("type").and_then(Json::as_str).unwrap_or_default();
    let value = &datavalue["value"];

    let decoded = match kind {
        "wikibase-entityid" => value.get("id").and_then(Json::as_str).map(Value::item),
        "string" if datatype == "commonsMedia" => value.as_str().map(|s| Value::Asset(AssetRef::new(s))),
        "string" => value.as_str().map(Value::string),
        "monolingualtext" => match (
            value.get("text").and_then(Json::as_str),
            value.get("language").and_then(Json::as_str),
        ) {
            (Some(text), Some(language)) => Some(Value::Text {
                text: text.to_string(),
                language: language.to_string(),
            }),
            _ => None,
        },
        "time" => decode_time(value),
        "quantity" => {
            let amount = value.get("amount").and_then(Json::as_str).unwrap_or_default();
            let unit = value
                .get("unit")
                .and_then(Json::as_str)
                .filter(|u| *u != "1")
                .map(|u| u.strip_prefix(concept_base).unwrap_or(u));
            Quantity::parse(amount, unit).map(Value::Quantity)
        }
        _ => None,
    };

    decoded.unwrap_or_else(|| Value::Opaque(datavalue.to_string()))
}

fn decode_time(value: &Json) -> Option<Value> {
    let timestamp = value.get("time").and_then(Json::as_str)?;
    let precision = value.get("precision").and_then(Json::as_u64)?;
    let (year, month, day) = parse_timestamp(timestamp)?;

    match precision {
        PRECISION_YEAR => Some(Value::Time(TemporalValue::year(year))),
        PRECISION_DAY => NaiveDate::from_ymd_opt(year, month, day).map(Value::Date),
        _ => None,
    }
}
