//! Batched, bounded-retry submission of mutation ops.
//!
//! All ops for one subject go out as a single request. On an auth-expired or
//! transient-server rejection the submitter refreshes its token once and
//! retries the same request once; anything after that is surfaced. After
//! every accepted mutation the next mutating call waits out a cooldown.

use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{Result, SyncError};
use crate::model::Subject;
use crate::reconcile::MutationOp;
use crate::store::{AuthToken, MutationRequest, MutationSink, Submitted};

/// Submitter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitterConfig {
    /// Seconds to wait after an accepted mutation before the next one.
    pub cooldown_secs: u64,
    /// Seconds to wait between a retryable rejection and the retry.
    pub retry_pause_secs: u64,
    /// Log requests instead of sending them.
    pub dry_run: bool,
    /// Prepended to every edit summary.
    pub summary_prefix: Option<String>,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 15,
            retry_pause_secs: 5,
            dry_run: false,
            summary_prefix: None,
        }
    }
}

impl SubmitterConfig {
    /// No cooldown and no retry pause.
    pub fn immediate() -> Self {
        Self {
            cooldown_secs: 0,
            retry_pause_secs: 0,
            ..Self::default()
        }
    }
}

/// What happened to one subject's ops.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    Submitted(Submitted),
    /// No ops; nothing was sent.
    Empty,
    /// Dry run; the request that would have been sent.
    DryRun(MutationRequest),
}

/// Counters over the submitter's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmitStats {
    pub submitted: usize,
    pub attempts: usize,
    pub refreshes: usize,
    pub failures: usize,
}

/// Sends mutation requests through a [`MutationSink`].
pub struct UpsertSubmitter<'a> {
    sink: &'a dyn MutationSink,
    config: SubmitterConfig,
    token: Option<AuthToken>,
    last_mutation: Option<Instant>,
    stats: SubmitStats,
}

impl<'a> UpsertSubmitter<'a> {
    pub fn new(sink: &'a dyn MutationSink) -> Self {
        Self {
            sink,
            config: SubmitterConfig::default(),
            token: None,
            last_mutation: None,
            stats: SubmitStats::default(),
        }
    }

    pub fn with_config(mut self, config: SubmitterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn stats(&self) -> SubmitStats {
        self.stats
    }

    pub fn is_dry_run(&self) -> bool {
        self.config.dry_run
    }

    /// Time left before the next mutating call may go out.
    pub fn pending_cooldown(&self) -> Duration {
        let cooldown = Duration::from_secs(self.config.cooldown_secs);
        match self.last_mutation {
            Some(at) => cooldown.saturating_sub(at.elapsed()),
            None => Duration::ZERO,
        }
    }

    /// Submit every op for `subject` as one request.
    pub fn submit(&mut self, subject: &Subject, ops: &[MutationOp], summary: &str) -> Result<SubmitOutcome> {
        if ops.is_empty() {
            return Ok(SubmitOutcome::Empty);
        }

        let request = MutationRequest::from_ops(subject, ops, self.summary(summary));

        if self.config.dry_run {
            info!(
                subject = subject.label(),
                ops = request.op_count(),
                create = request.is_creation(),
                summary = request.summary.as_str(),
                "Dry run, not submitting"
            );
            for op in ops {
                info!(subject = subject.label(), "  {}", op);
            }
            return Ok(SubmitOutcome::DryRun(request));
        }

        self.wait_for_cooldown();
        let token = self.current_token()?;

        self.stats.attempts += 1;
        let first = match self.sink.submit(&request, &token) {
            Ok(submitted) => return Ok(SubmitOutcome::Submitted(self.accepted(&request, submitted, 1))),
            Err(e) => e,
        };

        if !first.kind.is_retryable() {
            self.stats.failures += 1;
            error!(
                subject = subject.label(),
                kind = %first.kind,
                "Submission rejected: {}",
                first.message
            );
            return Err(SyncError::Submission {
                subject: subject.label().to_string(),
                kind: first.kind,
                message: first.message,
            });
        }

        warn!(
            subject = subject.label(),
            kind = %first.kind,
            "Submission failed, refreshing token and retrying once: {}",
            first.message
        );
        if self.config.retry_pause_secs > 0 {
            thread::sleep(Duration::from_secs(self.config.retry_pause_secs));
        }
        let token = self.refresh_token()?;

        self.stats.attempts += 1;
        match self.sink.submit(&request, &token) {
            Ok(submitted) => Ok(SubmitOutcome::Submitted(self.accepted(&request, submitted, 2))),
            Err(second) => {
                self.stats.failures += 1;
                error!(
                    subject = subject.label(),
                    attempt = 2,
                    kind = %second.kind,
                    "Submission failed after retry: {}",
                    second.message
                );
                Err(SyncError::RetryExhausted {
                    subject: subject.label().to_string(),
                    attempts: 2,
                    kind: second.kind,
                    message: second.message,
                })
            }
        }
    }

    fn accepted(&mut self, request: &MutationRequest, submitted: Submitted, attempt: u32) -> Submitted {
        self.stats.submitted += 1;
        self.last_mutation = Some(Instant::now());
        info!(
            subject = submitted.subject_id.as_str(),
            external_id = request.external_id.as_str(),
            ops = request.op_count(),
            created = request.is_creation(),
            attempt,
            "Submitted"
        );
        submitted
    }

    fn summary(&self, summary: &str) -> String {
        match &self.config.summary_prefix {
            Some(prefix) => format!("{}: {}", prefix, summary),
            None => summary.to_string(),
        }
    }

    fn wait_for_cooldown(&self) {
        let pending = self.pending_cooldown();
        if !pending.is_zero() {
            debug!(wait_ms = pending.as_millis() as u64, "Waiting for cooldown");
            thread::sleep(pending);
        }
    }

    fn current_token(&mut self) -> Result<AuthToken> {
        match &self.token {
            Some(token) => Ok(token.clone()),
            None => {
                let token = self.sink.fetch_token()?;
                self.token = Some(token.clone());
                Ok(token)
            }
        }
    }

    fn refresh_token(&mut self) -> Result<AuthToken> {
        self.stats.refreshes += 1;
        self.token = None;
        self.current_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Statement, Value};
    use crate::store::{MemoryStore, SubmitErrorKind};

    fn subject() -> Subject {
        Subject::empty("SK-A-1").with_id("Q100")
    }

    fn ops() -> Vec<MutationOp> {
        vec![MutationOp::Add(Statement::new("P31", Value::item("Q3305213")))]
    }

    #[test]
    fn test_success_applies_to_store() {
        let store = MemoryStore::new().with_subject(subject());
        let mut submitter = UpsertSubmitter::new(&store).with_config(SubmitterConfig::immediate());

        let outcome = submitter.submit(&subject(), &ops(), "Adding statements").unwrap();
        assert!(matches!(outcome, SubmitOutcome::Submitted(ref s) if s.subject_id == "Q100"));
        assert_eq!(store.subject("Q100").unwrap().statement_count(), 1);
        assert_eq!(submitter.stats().attempts, 1);
        assert_eq!(store.calls().token_fetches, 1);
    }

    #[test]
    fn test_empty_ops_are_not_submitted() {
        let store = MemoryStore::new();
        let mut submitter = UpsertSubmitter::new(&store);
        let outcome = submitter.submit(&subject(), &[], "nothing").unwrap();
        assert!(matches!(outcome, SubmitOutcome::Empty));
        assert_eq!(store.calls().submits, 0);
        assert_eq!(store.calls().token_fetches, 0);
    }

    #[test]
    fn test_dry_run_sends_nothing_and_skips_cooldown() {
        let store = MemoryStore::new().with_subject(subject());
        let config = SubmitterConfig {
            dry_run: true,
            ..SubmitterConfig::default()
        };
        let mut submitter = UpsertSubmitter::new(&store).with_config(config);

        let outcome = submitter.submit(&subject(), &ops(), "dry").unwrap();
        assert!(matches!(outcome, SubmitOutcome::DryRun(ref r) if r.additions.len() == 1));
        assert_eq!(store.calls().submits, 0);
        assert!(submitter.pending_cooldown().is_zero());
    }

    #[test]
    fn test_retry_after_failed_edit_does_not_upload_twice() {
        use crate::identity::AssetCandidate;
        use crate::model::PropertyKey;

        let store = MemoryStore::new().with_subject(subject());
        store.fail_next_after_uploads(SubmitErrorKind::TransientServer);
        let mut submitter = UpsertSubmitter::new(&store).with_config(SubmitterConfig::immediate());
        let ops = vec![
            MutationOp::CreateAsset(AssetCandidate::new("SK-A-1.jpg", vec![9u8; 128])),
            MutationOp::Add(Statement::new("P18", Value::asset("SK-A-1.jpg"))),
        ];

        let outcome = submitter.submit(&subject(), &ops, "add image").unwrap();
        assert!(matches!(outcome, SubmitOutcome::Submitted(ref s) if s.subject_id == "Q100"));
        assert_eq!(submitter.stats().attempts, 2);
        assert_eq!(store.calls().submits, 2);
        assert_eq!(store.calls().uploads, 1);
        assert_eq!(store.asset_count(), 1);
        let stored = store.subject("Q100").unwrap();
        assert_eq!(stored.statements_for(&PropertyKey::new("P18")).len(), 1);
    }

    #[test]
    fn test_refresh_once_then_succeed() {
        let store = MemoryStore::new().with_subject(subject());
        store.fail_next(SubmitErrorKind::AuthExpired);
        let mut submitter = UpsertSubmitter::new(&store).with_config(SubmitterConfig::immediate());

        submitter.submit(&subject(), &ops(), "retry").unwrap();
        let stats = submitter.stats();
        assert_eq!(stats.attempts, 2);
        assert_eq!(stats.refreshes, 1);
        assert_eq!(store.calls().token_fetches, 2);
    }

    #[test]
    fn test_conflict_is_not_retried() {
        let store = MemoryStore::new().with_subject(subject());
        store.fail_next(SubmitErrorKind::Conflict);
        let mut submitter = UpsertSubmitter::new(&store).with_config(SubmitterConfig::immediate());

        let err = submitter.submit(&subject(), &ops(), "conflict").unwrap_err();
        assert_eq!(err.submit_kind(), Some(SubmitErrorKind::Conflict));
        assert!(matches!(err, SyncError::Submission { .. }));
        assert_eq!(store.calls().submits, 1);
        assert_eq!(submitter.stats().refreshes, 0);
    }

    #[test]
    fn test_cooldown_armed_after_success() {
        let store = MemoryStore::new().with_subject(subject());
        let config = SubmitterConfig {
            cooldown_secs: 60,
            ..SubmitterConfig::immediate()
        };
        let mut submitter = UpsertSubmitter::new(&store).with_config(config);

        assert!(submitter.pending_cooldown().is_zero());
        submitter.submit(&subject(), &ops(), "first").unwrap();
        assert!(submitter.pending_cooldown() > Duration::from_secs(50));
    }

    #[test]
    fn test_summary_prefix() {
        let store = MemoryStore::new().with_subject(subject());
        let config = SubmitterConfig {
            dry_run: true,
            summary_prefix: Some("claimsync".to_string()),
            ..SubmitterConfig::default()
        };
        let mut submitter = UpsertSubmitter::new(&store).with_config(config);
        match submitter.submit(&subject(), &ops(), "Adding P31").unwrap() {
            SubmitOutcome::DryRun(request) => assert_eq!(request.summary, "claimsync: Adding P31"),
            other => panic!("unexpected outcome {:?}", other),
        }
    }
}
