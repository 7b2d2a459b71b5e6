//! Seams to the remote statement store.
//!
//! Each external interface the engine talks to is a small trait here, so the
//! reconciliation core never sees HTTP. Three implementations ship with the
//! crate:
//!
//! - [`WikibaseClient`]: blocking client for a MediaWiki/Wikibase API
//! - [`SparqlClient`]: bulk subject queries against a SPARQL endpoint
//! - [`MemoryStore`]: in-memory store for tests and offline runs

mod memory;
mod request;
mod sparql;
mod wikibase;

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Result;
use crate::identity::Fingerprint;
use crate::ledger::LedgerReport;
use crate::model::{AssetRef, PropertyKey, Subject};

pub use memory::{CallCounts, MemoryStore};
pub use request::{MutationRequest, Replacement};
pub use sparql::SparqlClient;
pub use wikibase::{Credentials, StoreConfig, WikibaseClient};

/// Machine-readable kind of a rejected mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitErrorKind {
    /// Token expired or invalid.
    AuthExpired,
    /// Someone else edited the subject in between.
    Conflict,
    /// Server-side fault that may go away (5xx, lag, read-only mode).
    TransientServer,
    /// Malformed mutation or policy rejection.
    PermanentRejection,
}

impl SubmitErrorKind {
    /// Whether a credential refresh and one retry may help.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SubmitErrorKind::AuthExpired | SubmitErrorKind::TransientServer)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SubmitErrorKind::AuthExpired => "auth-expired",
            SubmitErrorKind::Conflict => "conflict",
            SubmitErrorKind::TransientServer => "transient-server-error",
            SubmitErrorKind::PermanentRejection => "permanent-rejection",
        }
    }
}

impl fmt::Display for SubmitErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Structured rejection returned by [`MutationSink::submit`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct SubmitError {
    pub kind: SubmitErrorKind,
    pub message: String,
}

impl SubmitError {
    pub fn new(kind: SubmitErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Authorization token for mutating calls.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

/// Result of an accepted mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitted {
    /// Subject the mutation landed on; newly assigned for creations.
    pub subject_id: String,
    /// Revision id reported by the store, if any.
    pub revision: Option<u64>,
}

/// Declarative filter for the bulk subject query.
///
/// Selects subjects that are members of `collection` (via
/// `collection_property`) and carry `id_property`; the value of
/// `id_property` becomes the external identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkFilter {
    pub collection_property: PropertyKey,
    pub collection: String,
    pub id_property: PropertyKey,
}

/// Point lookup of subject snapshots.
pub trait StatementStore {
    /// Fetch the current statements of a subject.
    ///
    /// Returns `Ok(None)` when the store has no such subject.
    fn lookup(&self, subject_id: &str) -> Result<Option<Subject>>;
}

/// Bulk query used once per run to seed the subject cache.
pub trait BulkQuery {
    /// Map from external identifier to subject identifier.
    fn subject_ids(&self, filter: &BulkFilter) -> Result<IndexMap<String, String>>;
}

/// Index of binary assets already held by the store.
pub trait AssetIndex {
    /// Existing asset with this content fingerprint, if any.
    fn find_by_fingerprint(&self, fingerprint: &Fingerprint) -> Result<Option<AssetRef>>;

    /// Size in bytes of an existing asset, if known.
    fn asset_size(&self, asset: &AssetRef) -> Result<Option<u64>>;
}

/// Mutation endpoint of the store.
pub trait MutationSink {
    /// Obtain a fresh authorization token.
    fn fetch_token(&self) -> Result<AuthToken>;

    /// Apply every op of one subject as a single request.
    fn submit(
        &self,
        request: &MutationRequest,
        token: &AuthToken,
    ) -> std::result::Result<Submitted, SubmitError>;
}

/// Destination for the end-of-run duplicate report.
pub trait ReportSink {
    fn publish(&self, report: &LedgerReport) -> Result<()>;
}
