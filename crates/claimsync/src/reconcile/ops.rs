//! Mutation ops and skip records produced by reconciliation.

use std::fmt;

use crate::identity::AssetCandidate;
use crate::model::{PropertyKey, Statement, Subject};
use crate::store::MutationRequest;

/// One change to apply to a subject.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOp {
    /// Upload a new asset. Always precedes the `Add`/`Replace` that uses it.
    CreateAsset(AssetCandidate),
    /// Add a statement.
    Add(Statement),
    /// Swap an existing statement for a new one.
    Replace { old: Statement, new: Statement },
}

impl MutationOp {
    /// Property the op touches; `None` for uploads.
    pub fn property(&self) -> Option<&PropertyKey> {
        match self {
            MutationOp::CreateAsset(_) => None,
            MutationOp::Add(statement) => Some(&statement.property),
            MutationOp::Replace { new, .. } => Some(&new.property),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MutationOp::CreateAsset(_) => "create-asset",
            MutationOp::Add(_) => "add",
            MutationOp::Replace { .. } => "replace",
        }
    }
}

impl fmt::Display for MutationOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationOp::CreateAsset(candidate) => {
                write!(f, "create-asset File:{} ({} bytes)", candidate.name, candidate.size())
            }
            MutationOp::Add(statement) => write!(f, "add {} = {}", statement.property, statement.value),
            MutationOp::Replace { old, new } => {
                write!(f, "replace {} {} -> {}", new.property, old.value, new.value)
            }
        }
    }
}

/// Why a desired property produced no mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The single existing statement already has the desired value.
    AlreadyPresent,
    /// Several statements exist for the property; left for a human.
    Ambiguous { existing: usize },
    /// Values differ and no replace policy covers the property.
    NoReplacePolicy,
    /// A replace policy applies but the candidate is not large enough.
    BelowThreshold { existing: u64, candidate: u64 },
    /// A replace policy applies but the existing asset has no known size.
    MissingMeasurement,
    /// The asset index lookup failed.
    LookupFailed(String),
    /// The subject does not exist and creating subjects is disabled.
    CreateDisabled,
}

impl SkipReason {
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::AlreadyPresent => "already-present",
            SkipReason::Ambiguous { .. } => "ambiguous",
            SkipReason::NoReplacePolicy => "no-policy",
            SkipReason::BelowThreshold { .. } => "below-threshold",
            SkipReason::MissingMeasurement => "missing-measurement",
            SkipReason::LookupFailed(_) => "lookup-failed",
            SkipReason::CreateDisabled => "create-disabled",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Ambiguous { existing } => write!(f, "ambiguous ({} statements)", existing),
            SkipReason::BelowThreshold { existing, candidate } => {
                write!(f, "below-threshold (existing {} bytes, candidate {} bytes)", existing, candidate)
            }
            SkipReason::LookupFailed(message) => write!(f, "lookup-failed: {}", message),
            other => f.write_str(other.label()),
        }
    }
}

/// A desired property that was left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skip {
    pub property: PropertyKey,
    pub reason: SkipReason,
}

/// Result of reconciling one subject.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// Ops in fact-set declaration order.
    pub ops: Vec<MutationOp>,
    pub skipped: Vec<Skip>,
    /// Duplicate records appended to the ledger for this subject.
    pub duplicates: usize,
}

impl Reconciliation {
    /// Nothing to submit.
    pub fn is_noop(&self) -> bool {
        self.ops.is_empty()
    }

    /// Skip records with a given reason label.
    pub fn skipped_with(&self, label: &str) -> impl Iterator<Item = &Skip> {
        self.skipped.iter().filter(move |s| s.reason.label() == label)
    }

    /// Apply the ops to a local snapshot, as a successful submit would.
    pub fn apply(&self, subject: &mut Subject) {
        MutationRequest::from_ops(subject, &self.ops, "").apply_to(subject);
    }
}
