//! Temporal parsing and values.

mod convention;
mod parser;
mod value;

pub use convention::TimeQualifiers;
pub use parser::{ParseFailure, TemporalParser};
pub use value::{Interval, Precision, Temporal, TemporalValue};
