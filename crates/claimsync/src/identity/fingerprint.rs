//! Content fingerprints for binary assets.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};

/// Hash function used for fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintAlgorithm {
    /// 160-bit SHA-1, the key of the media repository's file index.
    #[default]
    Sha1,
    /// 256-bit SHA-256.
    Sha256,
}

impl FingerprintAlgorithm {
    pub fn label(&self) -> &'static str {
        match self {
            FingerprintAlgorithm::Sha1 => "sha1",
            FingerprintAlgorithm::Sha256 => "sha256",
        }
    }
}

impl std::str::FromStr for FingerprintAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha1" | "sha-1" => Ok(FingerprintAlgorithm::Sha1),
            "sha256" | "sha-256" => Ok(FingerprintAlgorithm::Sha256),
            other => Err(format!("unknown fingerprint algorithm '{}'", other)),
        }
    }
}

/// Upper-case hex digest of an asset's bytes.
///
/// Only the bytes go in. File names and metadata never influence the value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    pub algorithm: FingerprintAlgorithm,
    pub hex: String,
}

impl Fingerprint {
    pub fn of(bytes: &[u8], algorithm: FingerprintAlgorithm) -> Self {
        let hex = match algorithm {
            FingerprintAlgorithm::Sha1 => hex::encode_upper(Sha1::digest(bytes)),
            FingerprintAlgorithm::Sha256 => hex::encode_upper(Sha256::digest(bytes)),
        };
        Self { algorithm, hex }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm.label(), self.hex)
    }
}
