//! Store-agnostic mutation document for one subject.

use crate::identity::AssetCandidate;
use crate::model::{Statement, Subject};
use crate::reconcile::MutationOp;

/// Replace an existing statement with a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct Replacement {
    pub old: Statement,
    pub new: Statement,
}

/// All ops for one subject, submitted as a single request.
///
/// Uploads go first, so a failed upload refuses the whole batch. An edit
/// that fails after its uploads leaves them stored; sending the same
/// request again must not upload them twice.
#[derive(Debug, Clone)]
pub struct MutationRequest {
    /// Target subject; `None` asks the store to create one.
    pub subject_id: Option<String>,
    pub external_id: String,
    pub uploads: Vec<AssetCandidate>,
    pub additions: Vec<Statement>,
    pub replacements: Vec<Replacement>,
    pub summary: String,
}

impl MutationRequest {
    /// Group reconciliation ops into one request, keeping their order per kind.
    pub fn from_ops(subject: &Subject, ops: &[MutationOp], summary: impl Into<String>) -> Self {
        let mut request = Self {
            subject_id: subject.id.clone(),
            external_id: subject.external_id.clone(),
            uploads: Vec::new(),
            additions: Vec::new(),
            replacements: Vec::new(),
            summary: summary.into(),
        };

        for op in ops {
            match op {
                MutationOp::CreateAsset(candidate) => request.uploads.push(candidate.clone()),
                MutationOp::Add(statement) => request.additions.push(statement.clone()),
                MutationOp::Replace { old, new } => request.replacements.push(Replacement {
                    old: old.clone(),
                    new: new.clone(),
                }),
            }
        }

        request
    }

    pub fn is_empty(&self) -> bool {
        self.uploads.is_empty() && self.additions.is_empty() && self.replacements.is_empty()
    }

    /// Whether this request creates a new subject.
    pub fn is_creation(&self) -> bool {
        self.subject_id.is_none()
    }

    pub fn op_count(&self) -> usize {
        self.uploads.len() + self.additions.len() + self.replacements.len()
    }

    /// Apply the statement changes to a local snapshot.
    ///
    /// Added statements without an id get `<subject>$<n>` ids. A replaced
    /// statement keeps the id of the statement it replaces.
    pub fn apply_to(&self, subject: &mut Subject) {
        for replacement in &self.replacements {
            let slot = subject
                .statements
                .get_mut(&replacement.old.property)
                .and_then(|statements| {
                    statements.iter_mut().find(|s| match (&s.id, &replacement.old.id) {
                        (Some(a), Some(b)) => a == b,
                        _ => s.same_value(&replacement.old),
                    })
                });

            match slot {
                Some(existing) => {
                    let id = existing.id.clone();
                    *existing = replacement.new.clone();
                    existing.id = id;
                }
                None => subject.push(replacement.new.clone()),
            }
        }

        for addition in &self.additions {
            let mut statement = addition.clone();
            if statement.id.is_none() {
                statement.id = Some(format!("{}${}", subject.label(), subject.statement_count() + 1));
            }
            subject.push(statement);
        }
    }
}
