//! Tabular rendering of the duplicate ledger.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

use super::DuplicateRecord;

const HEADERS: [&str; 4] = ["subject", "existing_asset", "source_url", "note"];

/// Layout of the end-of-run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Tab-separated values with a header row.
    #[default]
    Tsv,
    /// MediaWiki sortable table, ready to paste on a wiki page.
    Wikitable,
}

/// Rendered duplicate report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerReport {
    pub format: ReportFormat,
    pub count: usize,
    pub body: String,
}

impl LedgerReport {
    pub fn render(records: &[DuplicateRecord], format: ReportFormat) -> Result<Self> {
        let body = match format {
            ReportFormat::Tsv => render_tsv(records)?,
            ReportFormat::Wikitable => render_wikitable(records),
        };
        Ok(Self {
            format,
            count: records.len(),
            body,
        })
    }

    /// One-line edit summary for publishing the report.
    pub fn summary(&self) -> String {
        format!("Found {} duplicates in this run", self.count)
    }
}

fn render_tsv(records: &[DuplicateRecord]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(Vec::new());

    writer.write_record(HEADERS)?;
    for record in records {
        writer.write_record([
            record.subject.as_str(),
            record.existing_asset.name(),
            record.source_url.as_deref().unwrap_or(""),
            record.note.as_str(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| SyncError::Report(format!("Failed to finish TSV report: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| SyncError::Report(format!("TSV report is not UTF-8: {}", e)))
}

fn render_wikitable(records: &[DuplicateRecord]) -> String {
    let mut text = String::from("{| class=\"wikitable sortable\"\n");
    text.push_str("! Existing file !! Subject !! Url !! Note\n");
    for record in records {
        text.push_str("|-\n");
        text.push_str(&format!("| [[{}|150px]]\n", record.existing_asset.title()));
        text.push_str(&format!("| [[:d:{0}|{0}]]\n", record.subject));
        match &record.source_url {
            Some(url) => text.push_str(&format!("| [{}]\n", url)),
            None => text.push_str("|\n"),
        }
        text.push_str(&format!("| <small><nowiki>{}</nowiki></small>\n", record.note));
    }
    text.push_str("|}\n");
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AssetRef;

    fn sample() -> Vec<DuplicateRecord> {
        vec![DuplicateRecord {
            subject: "Q42".to_string(),
            existing_asset: AssetRef::new("Old_name.jpg"),
            source_url: Some("https://museum.example/obj/1".to_string()),
            note: "Candidate New.jpg has the same content".to_string(),
        }]
    }

    #[test]
    fn test_tsv_has_header_and_rows() {
        let report = LedgerReport::render(&sample(), ReportFormat::Tsv).unwrap();
        let lines: Vec<_> = report.body.lines().collect();
        assert_eq!(lines[0], "subject\texisting_asset\tsource_url\tnote");
        assert!(lines[1].starts_with("Q42\tOld name.jpg\thttps://museum.example/obj/1\t"));
        assert_eq!(report.count, 1);
    }

    #[test]
    fn test_wikitable_layout() {
        let report = LedgerReport::render(&sample(), ReportFormat::Wikitable).unwrap();
        assert!(report.body.starts_with("{| class=\"wikitable sortable\""));
        assert!(report.body.contains("[[File:Old name.jpg|150px]]"));
        assert!(report.body.contains("[[:d:Q42|Q42]]"));
        assert!(report.body.trim_end().ends_with("|}"));
    }

    #[test]
    fn test_empty_report_summary() {
        let report = LedgerReport::render(&[], ReportFormat::Tsv).unwrap();
        assert_eq!(report.summary(), "Found 0 duplicates in this run");
        assert_eq!(report.body.lines().count(), 1);
    }
}
