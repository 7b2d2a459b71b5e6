//! Duplicate ledger: reconciliation outcomes that need a human.
//!
//! When a candidate asset turns out to exist already under another name,
//! the engine links the existing asset and appends a [`DuplicateRecord`].
//! Records accumulate for the whole run and are flushed once, at the end,
//! into a single tabular report for post-hoc triage. A run that is cut short
//! loses its unflushed records; the ledger is not an audit log.

mod report;
mod sink;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::model::AssetRef;

pub use report::{LedgerReport, ReportFormat};
pub use sink::FileReportSink;

/// One unresolved duplicate. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateRecord {
    /// Subject the duplicate was found for.
    pub subject: String,
    /// Asset that already holds the same content.
    pub existing_asset: AssetRef,
    /// Where the candidate came from.
    pub source_url: Option<String>,
    pub note: String,
}

/// Append-only collection of duplicate records for one run.
#[derive(Debug, Default)]
pub struct DuplicateLedger {
    records: Vec<DuplicateRecord>,
    format: ReportFormat,
}

impl DuplicateLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, format: ReportFormat) -> Self {
        self.format = format;
        self
    }

    pub fn record(&mut self, record: DuplicateRecord) {
        debug!(
            subject = record.subject.as_str(),
            existing = %record.existing_asset,
            "Recorded duplicate asset"
        );
        self.records.push(record);
    }

    pub fn records(&self) -> &[DuplicateRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Render every record into one report and empty the ledger.
    pub fn flush(&mut self) -> Result<LedgerReport> {
        let records = std::mem::take(&mut self.records);
        LedgerReport::render(&records, self.format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(subject: &str) -> DuplicateRecord {
        DuplicateRecord {
            subject: subject.to_string(),
            existing_asset: AssetRef::new("Existing.jpg"),
            source_url: Some("https://museum.example/1".to_string()),
            note: "same content".to_string(),
        }
    }

    #[test]
    fn test_flush_drains_ledger() {
        let mut ledger = DuplicateLedger::new();
        ledger.record(record("Q1"));
        ledger.record(record("Q2"));

        let report = ledger.flush().unwrap();
        assert_eq!(report.count, 2);
        assert!(ledger.is_empty());

        let again = ledger.flush().unwrap();
        assert_eq!(again.count, 0);
    }

    #[test]
    fn test_records_keep_insertion_order() {
        let mut ledger = DuplicateLedger::new();
        ledger.record(record("Q2"));
        ledger.record(record("Q1"));
        let subjects: Vec<_> = ledger.records().iter().map(|r| r.subject.as_str()).collect();
        assert_eq!(subjects, vec!["Q2", "Q1"]);
    }
}
