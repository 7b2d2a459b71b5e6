//! Subject resolution: external id to current snapshot.
//!
//! A run seeds a [`SubjectCache`] once from the bulk query and hands it to
//! the resolver by reference. Cache hits go straight to a point lookup by
//! store id; misses try the external id itself as the store id. Either way a
//! not-found answer yields an empty subject, never an error.

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::error::Result;
use crate::model::Subject;
use crate::store::{BulkFilter, BulkQuery, StatementStore};

/// External id to store id map for one run. Append-only.
#[derive(Debug, Clone, Default)]
pub struct SubjectCache {
    ids: IndexMap<String, String>,
}

impl SubjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the cache with one bulk query.
    pub fn from_bulk(query: &dyn BulkQuery, filter: &BulkFilter) -> Result<Self> {
        let ids = query.subject_ids(filter)?;
        info!(
            collection = filter.collection.as_str(),
            subjects = ids.len(),
            "Loaded subject cache"
        );
        Ok(Self { ids })
    }

    pub fn get(&self, external_id: &str) -> Option<&str> {
        self.ids.get(external_id).map(String::as_str)
    }

    /// Record a subject created during this run. An existing entry is kept.
    pub fn remember(&mut self, external_id: impl Into<String>, subject_id: impl Into<String>) {
        self.ids.entry(external_id.into()).or_insert_with(|| subject_id.into());
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<(String, String)> for SubjectCache {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

/// Where a resolved subject id came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    Cache,
    PointLookup,
}

/// Current state of a subject and whether the store already had it.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub subject: Subject,
    pub existed: bool,
    pub source: ResolutionSource,
}

/// Resolves external ids against the cache and the store.
pub struct SubjectResolver<'a> {
    store: &'a dyn StatementStore,
    cache: &'a mut SubjectCache,
}

impl<'a> SubjectResolver<'a> {
    pub fn new(store: &'a dyn StatementStore, cache: &'a mut SubjectCache) -> Self {
        Self { store, cache }
    }

    pub fn resolve(&mut self, external_id: &str) -> Result<Resolution> {
        let (candidate, source) = match self.cache.get(external_id) {
            Some(id) => (id.to_string(), ResolutionSource::Cache),
            None => (external_id.to_string(), ResolutionSource::PointLookup),
        };

        let resolution = match self.store.lookup(&candidate)? {
            Some(mut subject) => {
                subject.external_id = external_id.to_string();
                if subject.id.is_none() {
                    subject.id = Some(candidate);
                }
                Resolution {
                    subject,
                    existed: true,
                    source,
                }
            }
            None => Resolution {
                subject: Subject::empty(external_id),
                existed: false,
                source,
            },
        };

        debug!(
            external_id,
            subject = resolution.subject.label(),
            existed = resolution.existed,
            source = ?resolution.source,
            "Resolved subject"
        );
        Ok(resolution)
    }
}
