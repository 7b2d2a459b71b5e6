//! Sequential resolve, reconcile and submit loop over a run's observations.

use tracing::{error, info, warn};

use crate::config::{RunConfig, SyncConfig};
use crate::error::Result;
use crate::facts::{Normalize, RawObservation};
use crate::identity::ContentIdentity;
use crate::ledger::{DuplicateLedger, LedgerReport};
use crate::reconcile::{MutationOp, ReconciliationEngine};
use crate::resolver::{SubjectCache, SubjectResolver};
use crate::store::{AssetIndex, MutationSink, ReportSink, StatementStore};
use crate::submit::{SubmitOutcome, SubmitStats, UpsertSubmitter};

/// The store seams one run talks to.
#[derive(Clone, Copy)]
pub struct Stores<'a> {
    pub statements: &'a dyn StatementStore,
    pub assets: &'a dyn AssetIndex,
    pub sink: &'a dyn MutationSink,
}

impl<'a> Stores<'a> {
    /// All seams served by one store.
    pub fn single<S>(store: &'a S) -> Self
    where
        S: StatementStore + AssetIndex + MutationSink,
    {
        Self {
            statements: store,
            assets: store,
            sink: store,
        }
    }
}

/// What happened to one observation.
#[derive(Debug, Clone, PartialEq)]
pub enum SubjectOutcome {
    /// Everything desired was already there, or nothing could be changed.
    Unchanged { skipped: usize },
    Updated { subject_id: String, ops: usize },
    Created { subject_id: String, ops: usize },
    /// Subject missing from the store and creation is disabled.
    NotCreated,
    /// Dry run: these ops would have been submitted.
    Planned { ops: Vec<MutationOp> },
}

/// A subject whose processing failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectFailure {
    pub external_id: String,
    pub message: String,
}

/// Totals for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub unchanged: usize,
    pub updated: usize,
    pub created: usize,
    pub not_created: usize,
    pub planned: usize,
    pub ops: usize,
    pub field_issues: usize,
    pub duplicates: usize,
    pub failures: Vec<SubjectFailure>,
    /// The run was cut short before the last observation.
    pub stopped: bool,
    pub submit: SubmitStats,
}

impl RunSummary {
    fn record(&mut self, outcome: &SubjectOutcome) {
        self.processed += 1;
        match outcome {
            SubjectOutcome::Unchanged { .. } => self.unchanged += 1,
            SubjectOutcome::Updated { ops, .. } => {
                self.updated += 1;
                self.ops += ops;
            }
            SubjectOutcome::Created { ops, .. } => {
                self.created += 1;
                self.ops += ops;
            }
            SubjectOutcome::NotCreated => self.not_created += 1,
            SubjectOutcome::Planned { ops } => {
                self.planned += 1;
                self.ops += ops.len();
            }
        }
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Drives one run. Subjects are handled one at a time; a failure is
/// recorded against its subject and the run moves on.
pub struct Syncer<'a> {
    normalizer: &'a dyn Normalize,
    statements: &'a dyn StatementStore,
    cache: SubjectCache,
    engine: ReconciliationEngine<'a>,
    submitter: UpsertSubmitter<'a>,
    ledger: DuplicateLedger,
    run: RunConfig,
    summary: RunSummary,
}

impl<'a> Syncer<'a> {
    pub fn new(config: &SyncConfig, normalizer: &'a dyn Normalize, stores: Stores<'a>) -> Self {
        let identity = ContentIdentity::new(stores.assets).with_algorithm(config.fingerprint);
        Self {
            normalizer,
            statements: stores.statements,
            cache: SubjectCache::new(),
            engine: ReconciliationEngine::new(identity).with_config(config.engine.clone()),
            submitter: UpsertSubmitter::new(stores.sink).with_config(config.submitter.clone()),
            ledger: DuplicateLedger::new().with_format(config.report.format),
            run: config.run.clone(),
            summary: RunSummary::default(),
        }
    }

    /// Seed the subject cache, usually from [`SubjectCache::from_bulk`].
    pub fn with_cache(mut self, cache: SubjectCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn ledger(&self) -> &DuplicateLedger {
        &self.ledger
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Resolve, reconcile and submit one observation.
    pub fn sync_one(&mut self, raw: &RawObservation) -> Result<SubjectOutcome> {
        let normalized = self.normalizer.normalize(raw)?;
        self.summary.field_issues += normalized.issues.len();
        for issue in &normalized.issues {
            warn!(subject = raw.external_id.as_str(), field = issue.key.as_str(), "Dropped field: {}", issue.reason);
        }

        let resolution = SubjectResolver::new(self.statements, &mut self.cache).resolve(&raw.external_id)?;
        if !resolution.existed && !self.run.create_missing {
            info!(subject = raw.external_id.as_str(), "Not in store and creation disabled, skipping");
            return Ok(SubjectOutcome::NotCreated);
        }

        let subject = resolution.subject;
        let reconciliation = self.engine.reconcile(&subject, &normalized.facts, &mut self.ledger);
        if reconciliation.is_noop() {
            info!(
                subject = subject.label(),
                skipped = reconciliation.skipped.len(),
                "Nothing to change"
            );
            return Ok(SubjectOutcome::Unchanged {
                skipped: reconciliation.skipped.len(),
            });
        }

        let ops = reconciliation.ops;
        let outcome = match self.submitter.submit(&subject, &ops, &self.run.summary)? {
            SubmitOutcome::Empty => SubjectOutcome::Unchanged {
                skipped: reconciliation.skipped.len(),
            },
            SubmitOutcome::DryRun(_) => SubjectOutcome::Planned { ops },
            SubmitOutcome::Submitted(submitted) if resolution.existed => SubjectOutcome::Updated {
                subject_id: submitted.subject_id,
                ops: ops.len(),
            },
            SubmitOutcome::Submitted(submitted) => {
                self.cache.remember(raw.external_id.as_str(), submitted.subject_id.as_str());
                info!(
                    subject = submitted.subject_id.as_str(),
                    external_id = raw.external_id.as_str(),
                    "Created subject"
                );
                SubjectOutcome::Created {
                    subject_id: submitted.subject_id,
                    ops: ops.len(),
                }
            }
        };

        Ok(outcome)
    }

    /// Process observations in order until they run out or `should_stop`
    /// returns true. `should_stop` is checked between subjects only.
    pub fn run<I, F>(&mut self, observations: I, should_stop: F) -> &RunSummary
    where
        I: IntoIterator<Item = Result<RawObservation>>,
        F: Fn() -> bool,
    {
        for observation in observations {
            if should_stop() {
                warn!(processed = self.summary.processed, "Stop requested, ending run early");
                self.summary.stopped = true;
                break;
            }

            let raw = match observation {
                Ok(raw) => raw,
                Err(e) => {
                    error!("Skipping unreadable observation: {}", e);
                    self.summary.failures.push(SubjectFailure {
                        external_id: String::new(),
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            match self.sync_one(&raw) {
                Ok(outcome) => self.summary.record(&outcome),
                Err(e) => {
                    error!(subject = raw.external_id.as_str(), "Subject failed: {}", e);
                    self.summary.processed += 1;
                    self.summary.failures.push(SubjectFailure {
                        external_id: raw.external_id.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        self.summary.submit = self.submitter.stats();
        &self.summary
    }

    /// Flush the duplicate ledger to `sink` and return the run totals.
    pub fn finish(mut self, sink: &dyn ReportSink) -> Result<(RunSummary, LedgerReport)> {
        let report = self.ledger.flush()?;
        self.summary.duplicates = report.count;
        self.summary.submit = self.submitter.stats();
        sink.publish(&report)?;
        info!(
            processed = self.summary.processed,
            updated = self.summary.updated,
            created = self.summary.created,
            failed = self.summary.failed(),
            duplicates = report.count,
            "Run finished"
        );
        Ok((self.summary, report))
    }
}
