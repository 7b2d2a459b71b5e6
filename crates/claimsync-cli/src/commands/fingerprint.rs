//! Fingerprint command - hash a file the way asset lookups do.

use std::path::PathBuf;

use claimsync::{Fingerprint, FingerprintAlgorithm, SyncError};
use colored::Colorize;

pub fn run(file: PathBuf, algorithm: FingerprintAlgorithm) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = std::fs::read(&file).map_err(|e| SyncError::io(&file, e))?;
    let fingerprint = Fingerprint::of(&bytes, algorithm);

    println!(
        "{}  {} ({} bytes, {})",
        fingerprint.hex.white().bold(),
        file.display(),
        bytes.len(),
        algorithm.label().dimmed()
    );
    Ok(())
}
