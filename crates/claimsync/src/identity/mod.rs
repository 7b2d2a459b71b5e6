//! Content identity of binary assets.
//!
//! Before the engine proposes a new media file, it asks the store whether
//! the same bytes are already there under some other name. A match turns an
//! upload into a link to the existing asset.

mod fingerprint;

use std::fmt;

use tracing::debug;

use crate::error::Result;
use crate::model::AssetRef;
use crate::store::AssetIndex;

pub use fingerprint::{Fingerprint, FingerprintAlgorithm};

/// A binary asset proposed by a producer, with its downloaded bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct AssetCandidate {
    /// Name the asset would get if uploaded.
    pub name: AssetRef,
    pub bytes: Vec<u8>,
    /// Where the bytes were downloaded from.
    pub source_url: Option<String>,
    /// Page text to upload with the file.
    pub description: Option<String>,
}

impl AssetCandidate {
    pub fn new(name: impl AsRef<str>, bytes: Vec<u8>) -> Self {
        Self {
            name: AssetRef::new(name),
            bytes,
            source_url: None,
            description: None,
        }
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Measured size in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

impl fmt::Debug for AssetCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetCandidate")
            .field("name", &self.name)
            .field("size", &self.bytes.len())
            .field("source_url", &self.source_url)
            .finish()
    }
}

/// Fingerprints assets and looks them up in the store's asset index.
pub struct ContentIdentity<'a> {
    index: &'a dyn AssetIndex,
    algorithm: FingerprintAlgorithm,
}

impl<'a> ContentIdentity<'a> {
    pub fn new(index: &'a dyn AssetIndex) -> Self {
        Self {
            index,
            algorithm: FingerprintAlgorithm::default(),
        }
    }

    pub fn with_algorithm(mut self, algorithm: FingerprintAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn algorithm(&self) -> FingerprintAlgorithm {
        self.algorithm
    }

    pub fn fingerprint(&self, bytes: &[u8]) -> Fingerprint {
        Fingerprint::of(bytes, self.algorithm)
    }

    /// Existing asset with the same content; `None` is the normal miss.
    pub fn find_existing(&self, fingerprint: &Fingerprint) -> Result<Option<AssetRef>> {
        let found = self.index.find_by_fingerprint(fingerprint)?;
        debug!(fingerprint = %fingerprint, found = ?found, "Asset index lookup");
        Ok(found)
    }

    /// Size of an asset already in the store.
    pub fn measure(&self, asset: &AssetRef) -> Result<Option<u64>> {
        self.index.asset_size(asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_find_existing_by_content() {
        let store = MemoryStore::new().with_asset("Existing.jpg", b"painting-bytes".to_vec());
        let identity = ContentIdentity::new(&store);

        let fp = identity.fingerprint(b"painting-bytes");
        assert_eq!(identity.find_existing(&fp).unwrap(), Some(AssetRef::new("Existing.jpg")));

        let other = identity.fingerprint(b"other-bytes");
        assert_eq!(identity.find_existing(&other).unwrap(), None);
    }

    #[test]
    fn test_measure_existing_asset() {
        let store = MemoryStore::new().with_asset("Existing.jpg", vec![0; 100]);
        let identity = ContentIdentity::new(&store).with_algorithm(FingerprintAlgorithm::Sha256);

        assert_eq!(identity.measure(&AssetRef::new("Existing.jpg")).unwrap(), Some(100));
        assert_eq!(identity.measure(&AssetRef::new("Missing.jpg")).unwrap(), None);
    }

    #[test]
    fn test_candidate_debug_hides_bytes() {
        let candidate = AssetCandidate::new("A.jpg", vec![7; 5]);
        let debug = format!("{:?}", candidate);
        assert!(debug.contains("size: 5"));
        assert!(!debug.contains("7, 7"));
    }
}
