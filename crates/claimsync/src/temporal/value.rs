//! Typed temporal values with an explicit precision tag.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// How a year should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    /// An exact year.
    Year,
    /// Circa a year.
    CircaYear,
    /// Lower bound of a range.
    RangeStart,
    /// Upper bound of a range.
    RangeEnd,
}

impl Precision {
    pub fn label(&self) -> &'static str {
        match self {
            Precision::Year => "year",
            Precision::CircaYear => "circa year",
            Precision::RangeStart => "range start",
            Precision::RangeEnd => "range end",
        }
    }
}

/// A year with a precision tag.
///
/// Equality and hashing look at `precision` and `year` only. A circa value
/// therefore never equals an exact value of the same year, because the two
/// carry different precisions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TemporalValue {
    pub precision: Precision,
    pub year: i32,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub approximate: bool,
}

impl TemporalValue {
    pub fn year(year: i32) -> Self {
        Self {
            precision: Precision::Year,
            year,
            approximate: false,
        }
    }

    pub fn circa(year: i32) -> Self {
        Self {
            precision: Precision::CircaYear,
            year,
            approximate: true,
        }
    }

    pub fn range_start(year: i32, approximate: bool) -> Self {
        Self {
            precision: Precision::RangeStart,
            year,
            approximate,
        }
    }

    pub fn range_end(year: i32, approximate: bool) -> Self {
        Self {
            precision: Precision::RangeEnd,
            year,
            approximate,
        }
    }

    pub fn is_circa(&self) -> bool {
        self.precision == Precision::CircaYear || self.approximate
    }
}

impl PartialEq for TemporalValue {
    fn eq(&self, other: &Self) -> bool {
        self.precision == other.precision && self.year == other.year
    }
}

impl Eq for TemporalValue {}

impl Hash for TemporalValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.precision.hash(state);
        self.year.hash(state);
    }
}

impl fmt::Display for TemporalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.precision {
            Precision::Year => write!(f, "{}", self.year),
            Precision::CircaYear => write!(f, "circa {}", self.year),
            Precision::RangeStart | Precision::RangeEnd => {
                let circa = if self.approximate { "circa " } else { "" };
                write!(f, "{}{} ({})", circa, self.year, self.precision.label())
            }
        }
    }
}

/// A closed range between two temporal values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval<T> {
    pub start: T,
    pub end: T,
}

/// Outcome of a successful parse: a single point or a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Temporal {
    Point(TemporalValue),
    Interval(Interval<TemporalValue>),
}

impl Temporal {
    /// Range with both bounds tagged as range start/end.
    pub fn range(start: i32, end: i32, approximate: bool) -> Self {
        Temporal::Interval(Interval {
            start: TemporalValue::range_start(start, approximate),
            end: TemporalValue::range_end(end, approximate),
        })
    }

    /// Value that a statement would carry as its main value.
    pub fn main_value(&self) -> TemporalValue {
        match self {
            Temporal::Point(value) => *value,
            Temporal::Interval(interval) => interval.start,
        }
    }

    /// Range bounds, if this is an interval.
    pub fn bounds(&self) -> Option<(TemporalValue, TemporalValue)> {
        match self {
            Temporal::Point(_) => None,
            Temporal::Interval(interval) => Some((interval.start, interval.end)),
        }
    }

    pub fn is_circa(&self) -> bool {
        match self {
            Temporal::Point(value) => value.is_circa(),
            Temporal::Interval(interval) => interval.start.approximate,
        }
    }
}

impl fmt::Display for Temporal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Temporal::Point(value) => write!(f, "{}", value),
            Temporal::Interval(interval) => {
                let circa = if interval.start.approximate { "circa " } else { "" };
                write!(f, "{}{}-{}", circa, interval.start.year, interval.end.year)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circa_never_equals_exact() {
        assert_ne!(TemporalValue::circa(1780), TemporalValue::year(1780));
        assert_eq!(TemporalValue::year(1780), TemporalValue::year(1780));
    }

    #[test]
    fn test_equality_ignores_approximate_flag() {
        assert_eq!(
            TemporalValue::range_start(1780, true),
            TemporalValue::range_start(1780, false)
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Temporal::range(1780, 1790, true).to_string(), "circa 1780-1790");
        assert_eq!(Temporal::Point(TemporalValue::circa(1650)).to_string(), "circa 1650");
    }
}
