//! Diff of desired facts against a subject snapshot.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::facts::{DesiredFact, FactSet};
use crate::identity::{AssetCandidate, ContentIdentity};
use crate::ledger::{DuplicateLedger, DuplicateRecord};
use crate::model::{AssetRef, PropertyKey, Statement, Subject, Value};

use super::{MutationOp, Reconciliation, Skip, SkipReason};

// =============================================================================
// POLICIES
// =============================================================================

/// When a single existing statement may be overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ReplacePolicy {
    /// Replace an asset only with one more than `factor` times its size.
    LargerAsset { factor: f64 },
}

impl ReplacePolicy {
    /// Strict comparison: a candidate of exactly `factor` times the existing
    /// size is not enough.
    pub fn allows(&self, existing: u64, candidate: u64) -> bool {
        match self {
            ReplacePolicy::LargerAsset { factor } => candidate as f64 > existing as f64 * factor,
        }
    }
}

impl Default for ReplacePolicy {
    fn default() -> Self {
        ReplacePolicy::LargerAsset { factor: 4.0 }
    }
}

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Replace policies by property. Properties without one are never
    /// overwritten.
    pub replace_policies: IndexMap<PropertyKey, ReplacePolicy>,
}

impl EngineConfig {
    /// Config with no replace policies at all.
    pub fn add_only() -> Self {
        Self {
            replace_policies: IndexMap::new(),
        }
    }

    pub fn with_policy(mut self, property: impl Into<PropertyKey>, policy: ReplacePolicy) -> Self {
        self.replace_policies.insert(property.into(), policy);
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::add_only().with_policy("P18", ReplacePolicy::default())
    }
}

// =============================================================================
// ENGINE
// =============================================================================

/// What the asset index said about a candidate.
enum AssetMatch {
    /// Same content already stored under another name.
    Duplicate(AssetRef),
    /// Same content already stored under the candidate's own name.
    Reused,
    /// Not in the store; needs an upload.
    New,
}

/// Computes the smallest safe set of ops for one subject.
pub struct ReconciliationEngine<'a> {
    config: EngineConfig,
    identity: ContentIdentity<'a>,
}

impl<'a> ReconciliationEngine<'a> {
    pub fn new(identity: ContentIdentity<'a>) -> Self {
        Self {
            config: EngineConfig::default(),
            identity,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Reconcile `desired` against `current`.
    ///
    /// Reads the asset index for asset facts but never mutates the store.
    /// Duplicate records are appended to `ledger` only for properties that
    /// end up with an op.
    pub fn reconcile(
        &self,
        current: &Subject,
        desired: &FactSet,
        ledger: &mut DuplicateLedger,
    ) -> Reconciliation {
        let mut result = Reconciliation::default();
        let recorded_before = ledger.len();

        for fact in desired.iter() {
            let property = fact.property().clone();
            let existing = current.statements_for(&property);

            if existing.len() > 1 {
                warn!(
                    subject = current.label(),
                    property = %property,
                    existing = existing.len(),
                    "Ambiguous state: several statements exist, leaving property alone"
                );
                result.skipped.push(Skip {
                    property,
                    reason: SkipReason::Ambiguous {
                        existing: existing.len(),
                    },
                });
                continue;
            }

            let outcome = match &fact.asset {
                Some(candidate) => {
                    self.reconcile_asset(current, desired, fact, candidate, existing.first(), ledger)
                }
                None => self.reconcile_plain(&fact.statement, existing.first()),
            };

            match outcome {
                Ok(ops) => {
                    for op in &ops {
                        debug!(subject = current.label(), op = %op, "Planned op");
                    }
                    result.ops.extend(ops);
                }
                Err(SkipReason::LookupFailed(message)) => {
                    warn!(subject = current.label(), property = %property, "Asset lookup failed: {}", message);
                    result.skipped.push(Skip {
                        property,
                        reason: SkipReason::LookupFailed(message),
                    });
                }
                Err(reason) => {
                    debug!(subject = current.label(), property = %property, reason = %reason, "Skipped property");
                    result.skipped.push(Skip { property, reason });
                }
            }
        }

        result.duplicates = ledger.len() - recorded_before;

        result
    }

    fn reconcile_plain(
        &self,
        desired: &Statement,
        existing: Option<&Statement>,
    ) -> Result<Vec<MutationOp>, SkipReason> {
        match existing {
            None => Ok(vec![MutationOp::Add(desired.clone())]),
            Some(old) if old.same_value(desired) => Err(SkipReason::AlreadyPresent),
            Some(old) => match self.policy(&desired.property) {
                Some(_) => Err(SkipReason::MissingMeasurement),
                None => {
                    debug!(
                        property = %old.property,
                        current = %old.value,
                        wanted = %desired.value,
                        "Values differ without a replace policy"
                    );
                    Err(SkipReason::NoReplacePolicy)
                }
            },
        }
    }

    fn reconcile_asset(
        &self,
        current: &Subject,
        desired: &FactSet,
        fact: &DesiredFact,
        candidate: &AssetCandidate,
        existing: Option<&Statement>,
        ledger: &mut DuplicateLedger,
    ) -> Result<Vec<MutationOp>, SkipReason> {
        if let Some(old) = existing {
            if old.same_value(&fact.statement) {
                return Err(SkipReason::AlreadyPresent);
            }
        }

        let fingerprint = self.identity.fingerprint(&candidate.bytes);
        let found = self
            .identity
            .find_existing(&fingerprint)
            .map_err(|e| SkipReason::LookupFailed(e.to_string()))?;
        let matched = match found {
            Some(asset) if asset != candidate.name => AssetMatch::Duplicate(asset),
            Some(_) => AssetMatch::Reused,
            None => AssetMatch::New,
        };

        let mut statement = fact.statement.clone();
        if let AssetMatch::Duplicate(asset) = &matched {
            statement.value = Value::Asset(asset.clone());
        }

        let op = match existing {
            None => MutationOp::Add(statement),
            Some(old) if old.same_value(&statement) => return Err(SkipReason::AlreadyPresent),
            Some(old) => {
                let policy = self.policy(&statement.property).ok_or(SkipReason::NoReplacePolicy)?;
                let old_asset = old.value.as_asset().ok_or(SkipReason::MissingMeasurement)?;
                let old_size = self
                    .identity
                    .measure(old_asset)
                    .map_err(|e| SkipReason::LookupFailed(e.to_string()))?
                    .ok_or(SkipReason::MissingMeasurement)?;

                if !policy.allows(old_size, candidate.size()) {
                    return Err(SkipReason::BelowThreshold {
                        existing: old_size,
                        candidate: candidate.size(),
                    });
                }
                MutationOp::Replace {
                    old: old.clone(),
                    new: statement,
                }
            }
        };

        let mut ops = Vec::with_capacity(2);
        match matched {
            AssetMatch::New => ops.push(MutationOp::CreateAsset(candidate.clone())),
            AssetMatch::Reused => {}
            AssetMatch::Duplicate(existing_asset) => {
                ledger.record(DuplicateRecord {
                    subject: current.label().to_string(),
                    existing_asset,
                    source_url: candidate
                        .source_url
                        .clone()
                        .or_else(|| desired.source_url().map(str::to_string)),
                    note: format!("Linked existing file instead of uploading {}", candidate.name.title()),
                });
            }
        }
        ops.push(op);
        Ok(ops)
    }

    fn policy(&self, property: &PropertyKey) -> Option<&ReplacePolicy> {
        self.config.replace_policies.get(property)
    }
}
