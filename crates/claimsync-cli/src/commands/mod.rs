//! CLI command implementations.

pub mod fingerprint;
pub mod parse_date;
pub mod plan;
pub mod sync;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use claimsync::{RawObservation, SyncConfig, SyncError};

/// Load the config file, or the defaults when none is given.
pub(crate) fn load_config(path: Option<&Path>) -> claimsync::Result<SyncConfig> {
    match path {
        Some(path) => SyncConfig::load(path),
        None => Ok(SyncConfig::default()),
    }
}

/// Lazily read observations, one JSON object per non-blank line.
///
/// A malformed line yields an error for that line only.
pub(crate) fn read_observations(
    path: &Path,
) -> Result<impl Iterator<Item = claimsync::Result<RawObservation>>, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("Observations file not found: {}", path.display()).into());
    }
    let file = File::open(path).map_err(|e| SyncError::io(path, e))?;
    let path: PathBuf = path.to_path_buf();

    Ok(BufReader::new(file)
        .lines()
        .enumerate()
        .filter_map(move |(index, line)| match line {
            Ok(line) if line.trim().is_empty() => None,
            Ok(line) => Some(serde_json::from_str::<RawObservation>(&line).map_err(|e| {
                SyncError::InvalidValue {
                    key: format!("{}:{}", path.display(), index + 1),
                    message: e.to_string(),
                }
            })),
            Err(e) => Some(Err(SyncError::io(&path, e))),
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_observations_skips_blank_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"external_id":"SK-C-5","fields":{{"inception":"1642"}}}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, "not json").unwrap();

        let results: Vec<_> = read_observations(file.path()).unwrap().collect();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap().external_id, "SK-C-5");
        assert!(matches!(results[1], Err(SyncError::InvalidValue { .. })));
    }

    #[test]
    fn test_missing_file() {
        assert!(read_observations(Path::new("/nonexistent/obs.jsonl")).is_err());
    }

    #[test]
    fn test_default_config_without_path() {
        let config = load_config(None).unwrap();
        assert!(!config.run.create_missing);
    }
}
