//! Free-text date normalization.
//!
//! Museum sites write dates in a handful of recurring shapes: `1780`,
//! `circa 1780`, `c. 1780-1790`, `1923-34`. The parser recognizes those
//! shapes in a fixed precedence order and reports everything else as a
//! [`ParseFailure`]. A failure is an expected outcome: the caller logs it and
//! leaves the date out.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use thiserror::Error;

use super::value::{Temporal, TemporalValue};

// =============================================================================
// PATTERNS
// =============================================================================
// Checked in this order; the first match wins.

static EXACT_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:dated\s+)?(\d{4})$").unwrap());

static CIRCA_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:circa|about|ca?\.)\s*(\d{4})$").unwrap());

static YEAR_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})\s*[-–]\s*(\d{4})$").unwrap());

static CIRCA_YEAR_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:circa|about|ca?\.)\s*(\d{4})\s*[-–]\s*(\d{4})$").unwrap()
});

static SHORT_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2})?(\d{2})\s*[-–]\s*(\d{2})$").unwrap());

static CIRCA_SHORT_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:circa|about|ca?\.)\s*(\d{2})?(\d{2})\s*[-–]\s*(\d{2})$").unwrap()
});

/// Input that did not match any recognized date shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Could not parse date \"{input}\": {reason}")]
pub struct ParseFailure {
    pub input: String,
    pub reason: String,
}

impl ParseFailure {
    fn new(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Parses free-text date expressions into [`Temporal`] values.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemporalParser {
    /// Century base (e.g. 1900) for fully two-digit ranges like `23-34`.
    century: Option<i32>,
}

impl TemporalParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve fully two-digit ranges against this century.
    ///
    /// Any year inside the century works: `1900` and `1955` both mean the
    /// 1900s.
    pub fn with_century(mut self, century: i32) -> Self {
        self.century = Some(century - century.rem_euclid(100));
        self
    }

    /// Parse a date expression.
    pub fn parse(&self, text: &str) -> Result<Temporal, ParseFailure> {
        let input = text.trim();
        if input.is_empty() {
            return Err(ParseFailure::new(text, "empty input"));
        }

        if let Some(caps) = EXACT_YEAR.captures(input) {
            return Ok(Temporal::Point(TemporalValue::year(year(&caps, 1))));
        }
        if let Some(caps) = CIRCA_YEAR.captures(input) {
            return Ok(Temporal::Point(TemporalValue::circa(year(&caps, 1))));
        }
        if let Some(caps) = YEAR_RANGE.captures(input) {
            return checked_range(text, year(&caps, 1), year(&caps, 2), false);
        }
        if let Some(caps) = CIRCA_YEAR_RANGE.captures(input) {
            return checked_range(text, year(&caps, 1), year(&caps, 2), true);
        }
        if let Some(caps) = SHORT_RANGE.captures(input) {
            return self.short_range(text, &caps, false);
        }
        if let Some(caps) = CIRCA_SHORT_RANGE.captures(input) {
            return self.short_range(text, &caps, true);
        }

        Err(ParseFailure::new(text, "unrecognized date format"))
    }

    /// `1923-34`: the end year inherits the start's century.
    fn short_range(
        &self,
        text: &str,
        caps: &Captures<'_>,
        approximate: bool,
    ) -> Result<Temporal, ParseFailure> {
        let century = match caps.get(1) {
            Some(m) => m.as_str().parse::<i32>().unwrap_or_default() * 100,
            None => self
                .century
                .ok_or_else(|| ParseFailure::new(text, "two-digit range without century context"))?,
        };

        let start = century + year(caps, 2);
        let end = century + year(caps, 3);
        checked_range(text, start, end, approximate)
    }
}

fn year(caps: &Captures<'_>, group: usize) -> i32 {
    // Groups only ever capture ASCII digits.
    caps.get(group)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or_default()
}

fn checked_range(
    text: &str,
    start: i32,
    end: i32,
    approximate: bool,
) -> Result<Temporal, ParseFailure> {
    if end < start {
        return Err(ParseFailure::new(
            text,
            format!("range ends before it starts ({} > {})", start, end),
        ));
    }
    Ok(Temporal::range(start, end, approximate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temporal::Precision;

    fn parse(text: &str) -> Result<Temporal, ParseFailure> {
        TemporalParser::new().parse(text)
    }

    #[test]
    fn test_exact_year() {
        assert_eq!(parse("1780").unwrap(), Temporal::Point(TemporalValue::year(1780)));
        assert_eq!(parse(" Dated 1642 ").unwrap(), Temporal::Point(TemporalValue::year(1642)));
    }

    #[test]
    fn test_circa_year_variants() {
        for text in ["circa 1780", "Circa 1780", "about 1780", "c. 1780", "ca. 1780", "ca.1780"] {
            let parsed = parse(text).unwrap();
            assert_eq!(parsed, Temporal::Point(TemporalValue::circa(1780)), "{}", text);
        }
    }

    #[test]
    fn test_year_range() {
        assert_eq!(parse("1780-1790").unwrap(), Temporal::range(1780, 1790, false));
        assert_eq!(parse("1780 – 1790").unwrap(), Temporal::range(1780, 1790, false));
    }

    #[test]
    fn test_circa_range_is_approximate() {
        let parsed = parse("circa 1780-1790").unwrap();
        let (start, end) = parsed.bounds().unwrap();
        assert_eq!((start.year, end.year), (1780, 1790));
        assert!(start.approximate && end.approximate);
        assert!(parsed.is_circa());
    }

    #[test]
    fn test_short_range_inherits_century() {
        assert_eq!(parse("1923-34").unwrap(), Temporal::range(1923, 1934, false));
        assert_eq!(parse("c. 1923-34").unwrap(), Temporal::range(1923, 1934, true));
    }

    #[test]
    fn test_two_digit_range_needs_century() {
        assert!(parse("23-34").is_err());

        let parser = TemporalParser::new().with_century(1900);
        assert_eq!(parser.parse("23-34").unwrap(), Temporal::range(1923, 1934, false));
        assert_eq!(
            TemporalParser::new().with_century(1955).parse("23-34").unwrap(),
            Temporal::range(1923, 1934, false)
        );
    }

    #[test]
    fn test_backwards_range_fails() {
        let err = parse("1995-05").unwrap_err();
        assert!(err.reason.contains("ends before"));
        assert!(parse("1790-1780").is_err());
    }

    #[test]
    fn test_garbage_fails() {
        let err = parse("not a date").unwrap_err();
        assert_eq!(err.input, "not a date");
        assert!(parse("").is_err());
        assert!(parse("17th century").is_err());
        assert!(parse("178").is_err());
    }

    #[test]
    fn test_range_bounds_precision() {
        let (start, end) = parse("1780-1790").unwrap().bounds().unwrap();
        assert_eq!(start.precision, Precision::RangeStart);
        assert_eq!(end.precision, Precision::RangeEnd);
    }
}
