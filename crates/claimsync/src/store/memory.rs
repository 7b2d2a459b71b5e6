//! In-memory store for testing and offline runs.

use std::cell::RefCell;
use std::collections::VecDeque;

use indexmap::IndexMap;

use crate::error::Result;
use crate::identity::{Fingerprint, FingerprintAlgorithm};
use crate::model::{AssetRef, Subject, Value};

use super::{
    AssetIndex, AuthToken, BulkFilter, BulkQuery, MutationRequest, MutationSink, StatementStore,
    SubmitError, SubmitErrorKind, Submitted,
};

/// Number of calls each store operation received.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub lookups: usize,
    pub bulk_queries: usize,
    pub asset_lookups: usize,
    pub token_fetches: usize,
    pub submits: usize,
    pub uploads: usize,
}

#[derive(Debug, Clone)]
struct StoredAsset {
    name: AssetRef,
    sha1: Fingerprint,
    sha256: Fingerprint,
    size: u64,
}

/// A failure queued for a later submission.
#[derive(Debug, Clone)]
struct ScriptedFailure {
    error: SubmitError,
    /// Fail the edit only after the request's uploads were stored.
    after_uploads: bool,
}

#[derive(Debug, Default)]
struct Inner {
    subjects: IndexMap<String, Subject>,
    assets: Vec<StoredAsset>,
    scripted_failures: VecDeque<ScriptedFailure>,
    next_subject: u64,
    next_token: u64,
    calls: CallCounts,
}

/// Store that keeps subjects and assets in memory.
///
/// Submissions are applied to the stored snapshots, so a second
/// reconciliation sees the result of the first. Failures can be scripted
/// with [`MemoryStore::fail_next`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RefCell<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subject snapshot. The subject must carry a store id.
    pub fn with_subject(self, subject: Subject) -> Self {
        self.insert_subject(subject);
        self
    }

    pub fn insert_subject(&self, subject: Subject) {
        if let Some(id) = subject.id.clone() {
            self.inner.borrow_mut().subjects.insert(id, subject);
        }
    }

    /// Add an asset with the given content.
    pub fn with_asset(self, name: impl AsRef<str>, bytes: Vec<u8>) -> Self {
        self.insert_asset(AssetRef::new(name), &bytes);
        self
    }

    /// Whether an asset with this name and content is already stored.
    fn holds(&self, name: &AssetRef, bytes: &[u8]) -> bool {
        let sha1 = Fingerprint::of(bytes, FingerprintAlgorithm::Sha1);
        self.inner
            .borrow()
            .assets
            .iter()
            .any(|a| &a.name == name && a.sha1 == sha1)
    }

    fn insert_asset(&self, name: AssetRef, bytes: &[u8]) {
        let asset = StoredAsset {
            name,
            sha1: Fingerprint::of(bytes, FingerprintAlgorithm::Sha1),
            sha256: Fingerprint::of(bytes, FingerprintAlgorithm::Sha256),
            size: bytes.len() as u64,
        };
        self.inner.borrow_mut().assets.push(asset);
    }

    /// Make the next submission fail with this kind.
    pub fn fail_next(&self, kind: SubmitErrorKind) {
        self.inner
            .borrow_mut()
            .scripted_failures
            .push_back(ScriptedFailure {
                error: SubmitError::new(kind, format!("scripted {}", kind)),
                after_uploads: false,
            });
    }

    /// Make the next submission store its uploads, then fail the edit.
    pub fn fail_next_after_uploads(&self, kind: SubmitErrorKind) {
        self.inner
            .borrow_mut()
            .scripted_failures
            .push_back(ScriptedFailure {
                error: SubmitError::new(kind, format!("scripted {} after uploads", kind)),
                after_uploads: true,
            });
    }

    /// Current snapshot of a stored subject.
    pub fn subject(&self, id: &str) -> Option<Subject> {
        self.inner.borrow().subjects.get(id).cloned()
    }

    pub fn subject_count(&self) -> usize {
        self.inner.borrow().subjects.len()
    }

    pub fn asset_count(&self) -> usize {
        self.inner.borrow().assets.len()
    }

    pub fn calls(&self) -> CallCounts {
        self.inner.borrow().calls
    }
}

impl StatementStore for MemoryStore {
    fn lookup(&self, subject_id: &str) -> Result<Option<Subject>> {
        let mut inner = self.inner.borrow_mut();
        inner.calls.lookups += 1;
        Ok(inner.subjects.get(subject_id).cloned())
    }
}

impl BulkQuery for MemoryStore {
    fn subject_ids(&self, filter: &BulkFilter) -> Result<IndexMap<String, String>> {
        let mut inner = self.inner.borrow_mut();
        inner.calls.bulk_queries += 1;

        let member = Value::item(&filter.collection);
        let mut ids = IndexMap::new();
        for (subject_id, subject) in &inner.subjects {
            let in_collection = subject
                .statements_for(&filter.collection_property)
                .iter()
                .any(|s| s.value == member);
            if !in_collection {
                continue;
            }
            for statement in subject.statements_for(&filter.id_property) {
                if let Value::String(external_id) = &statement.value {
                    ids.entry(external_id.clone())
                        .or_insert_with(|| subject_id.clone());
                }
            }
        }
        Ok(ids)
    }
}

impl AssetIndex for MemoryStore {
    fn find_by_fingerprint(&self, fingerprint: &Fingerprint) -> Result<Option<AssetRef>> {
        let mut inner = self.inner.borrow_mut();
        inner.calls.asset_lookups += 1;
        Ok(inner
            .assets
            .iter()
            .find(|a| &a.sha1 == fingerprint || &a.sha256 == fingerprint)
            .map(|a| a.name.clone()))
    }

    fn asset_size(&self, asset: &AssetRef) -> Result<Option<u64>> {
        Ok(self
            .inner
            .borrow()
            .assets
            .iter()
            .find(|a| &a.name == asset)
            .map(|a| a.size))
    }
}

impl MutationSink for MemoryStore {
    fn fetch_token(&self) -> Result<AuthToken> {
        let mut inner = self.inner.borrow_mut();
        inner.calls.token_fetches += 1;
        inner.next_token += 1;
        Ok(AuthToken::new(format!("token-{}", inner.next_token)))
    }

    fn submit(
        &self,
        request: &MutationRequest,
        _token: &AuthToken,
    ) -> std::result::Result<Submitted, SubmitError> {
        let failure = {
            let mut inner = self.inner.borrow_mut();
            inner.calls.submits += 1;
            inner.scripted_failures.pop_front()
        };
        if let Some(failure) = &failure {
            if !failure.after_uploads {
                return Err(failure.error.clone());
            }
        }

        for upload in &request.uploads {
            if self.holds(&upload.name, &upload.bytes) {
                continue;
            }
            self.insert_asset(upload.name.clone(), &upload.bytes);
            self.inner.borrow_mut().calls.uploads += 1;
        }

        if let Some(failure) = failure {
            return Err(failure.error);
        }

        let mut inner = self.inner.borrow_mut();
        let subject_id = match &request.subject_id {
            Some(id) => id.clone(),
            None => {
                inner.next_subject += 1;
                format!("Q{}", 900_000 + inner.next_subject)
            }
        };

        let mut subject = inner
            .subjects
            .get(&subject_id)
            .cloned()
            .unwrap_or_else(|| Subject::empty(&request.external_id).with_id(&subject_id));
        request.apply_to(&mut subject);
        inner.subjects.insert(subject_id.clone(), subject);

        Ok(Submitted {
            subject_id,
            revision: Some(inner.calls.submits as u64),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::AssetCandidate;
    use crate::model::Statement;
    use crate::reconcile::MutationOp;

    fn painting(id: &str, inventory: &str) -> Subject {
        Subject::empty(inventory)
            .with_id(id)
            .with_statement(Statement::new("P195", Value::item("Q132783")))
            .with_statement(Statement::new("P217", Value::string(inventory)))
    }

    #[test]
    fn test_bulk_query_filters_by_collection() {
        let store = MemoryStore::new()
            .with_subject(painting("Q1", "GE-1"))
            .with_subject(painting("Q2", "GE-2"))
            .with_subject(
                Subject::empty("X").with_id("Q3").with_statement(Statement::new("P217", Value::string("X"))),
            );
        let filter = BulkFilter {
            collection_property: "P195".into(),
            collection: "Q132783".into(),
            id_property: "P217".into(),
        };

        let ids = store.subject_ids(&filter).unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids.get("GE-2").map(String::as_str), Some("Q2"));
    }

    #[test]
    fn test_submit_creates_subject() {
        let store = MemoryStore::new();
        let subject = Subject::empty("GE-9");
        let ops = vec![MutationOp::Add(Statement::new("P217", Value::string("GE-9")))];
        let request = MutationRequest::from_ops(&subject, &ops, "create");
        let token = store.fetch_token().unwrap();

        let submitted = store.submit(&request, &token).unwrap();
        let created = store.subject(&submitted.subject_id).unwrap();
        assert_eq!(created.external_id, "GE-9");
        assert_eq!(created.statement_count(), 1);
    }

    #[test]
    fn test_scripted_failure_is_consumed_once() {
        let store = MemoryStore::new().with_subject(painting("Q1", "GE-1"));
        store.fail_next(SubmitErrorKind::Conflict);
        let subject = store.subject("Q1").unwrap();
        let request = MutationRequest::from_ops(
            &subject,
            &[MutationOp::Add(Statement::new("P31", Value::item("Q3305213")))],
            "add",
        );
        let token = store.fetch_token().unwrap();

        let err = store.submit(&request, &token).unwrap_err();
        assert_eq!(err.kind, SubmitErrorKind::Conflict);
        assert!(store.submit(&request, &token).is_ok());
        assert_eq!(store.calls().submits, 2);
    }

    #[test]
    fn test_failure_after_uploads_keeps_the_upload() {
        let store = MemoryStore::new().with_subject(painting("Q1", "GE-1"));
        store.fail_next_after_uploads(SubmitErrorKind::TransientServer);
        let subject = store.subject("Q1").unwrap();
        let candidate = AssetCandidate::new("GE-1.jpg", vec![3u8; 64]);
        let request = MutationRequest::from_ops(
            &subject,
            &[
                MutationOp::CreateAsset(candidate),
                MutationOp::Add(Statement::new("P18", Value::asset("GE-1.jpg"))),
            ],
            "add image",
        );
        let token = store.fetch_token().unwrap();

        let err = store.submit(&request, &token).unwrap_err();
        assert_eq!(err.kind, SubmitErrorKind::TransientServer);
        assert_eq!(store.asset_count(), 1);
        assert_eq!(store.subject("Q1").unwrap().statement_count(), 2);

        // Sending the same request again does not store the file twice
        store.submit(&request, &token).unwrap();
        assert_eq!(store.asset_count(), 1);
        assert_eq!(store.calls().uploads, 1);
        assert_eq!(store.subject("Q1").unwrap().statement_count(), 3);
    }
}
