//! claimsync: statement reconciliation and idempotent upsert for
//! Wikibase-style statement stores.
//!
//! Producers describe what they observed about a subject (a painting, a
//! media file). claimsync turns that into a desired fact set, compares it
//! with what the store already says, and submits the smallest safe set of
//! changes.
//!
//! # Core Principles
//!
//! - **Idempotent**: running the same reconciliation twice against the same
//!   remote state changes nothing the second time
//! - **Non-destructive**: human edits are never overwritten without an
//!   explicit per-property replace policy
//! - **Bounded**: one token refresh and one retry per subject, then the
//!   failure is reported
//!
//! # Example
//!
//! ```no_run
//! use claimsync::{
//!     CatalogNormalizer, FileReportSink, RawObservation, Stores, SyncConfig, Syncer,
//!     WikibaseClient, Credentials,
//! };
//!
//! let config = SyncConfig::load("claimsync.toml").unwrap();
//! let client = WikibaseClient::new(config.store.clone())
//!     .unwrap()
//!     .with_credentials(Credentials::from_env().unwrap());
//! let normalizer = CatalogNormalizer::new(config.catalog.clone());
//!
//! let mut syncer = Syncer::new(&config, &normalizer, Stores::single(&client));
//! let observation = RawObservation::new("SK-C-5")
//!     .with_field("instance_of", "Q3305213")
//!     .with_field("inception", "1642");
//! syncer.run(vec![Ok(observation)], || false);
//!
//! let (summary, _report) = syncer.finish(&FileReportSink::new("duplicates.tsv")).unwrap();
//! println!("Updated {} subjects", summary.updated);
//! ```

pub mod config;
pub mod error;
pub mod facts;
pub mod identity;
pub mod ledger;
pub mod model;
pub mod reconcile;
pub mod resolver;
pub mod store;
pub mod submit;
pub mod temporal;

mod sync;

pub use config::{ReportConfig, RunConfig, SyncConfig};
pub use error::{Result, SyncError};
pub use facts::{CatalogNormalizer, FactSet, FactSetBuilder, FieldCatalog, Normalize, RawObservation};
pub use identity::{AssetCandidate, ContentIdentity, Fingerprint, FingerprintAlgorithm};
pub use ledger::{DuplicateLedger, DuplicateRecord, FileReportSink, LedgerReport, ReportFormat};
pub use model::{AssetRef, PropertyKey, Quantity, Rank, Reference, Statement, Subject, Value};
pub use reconcile::{EngineConfig, MutationOp, Reconciliation, ReconciliationEngine, ReplacePolicy, SkipReason};
pub use resolver::{Resolution, SubjectCache, SubjectResolver};
pub use store::{
    Credentials, MemoryStore, SparqlClient, StoreConfig, SubmitErrorKind, WikibaseClient,
};
pub use submit::{SubmitOutcome, SubmitterConfig, UpsertSubmitter};
pub use sync::{RunSummary, Stores, SubjectFailure, SubjectOutcome, Syncer};
pub use temporal::{ParseFailure, Temporal, TemporalParser, TemporalValue};
