//! Bulk subject query against a SPARQL endpoint.

use std::time::Duration;

use indexmap::IndexMap;
use indexmap::map::Entry;
use reqwest::blocking::Client;
use reqwest::header::{HeaderValue, ACCEPT};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Result, SyncError};

use super::wikibase::StoreConfig;
use super::{BulkFilter, BulkQuery};

#[derive(Debug, Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    bindings: Vec<IndexMap<String, Binding>>,
}

#[derive(Debug, Deserialize)]
struct Binding {
    value: String,
}

/// [`BulkQuery`] over the store's query service.
pub struct SparqlClient {
    client: Client,
    endpoint: String,
    concept_base: String,
}

impl SparqlClient {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| SyncError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.sparql_url.clone(),
            concept_base: config.concept_base.clone(),
        })
    }

    /// Query text for a filter.
    pub fn query_for(filter: &BulkFilter) -> String {
        format!(
            "SELECT ?item ?id WHERE {{ ?item wdt:{} wd:{} ; wdt:{} ?id . }}",
            filter.collection_property, filter.collection, filter.id_property
        )
    }

    fn subject_id<'a>(&self, uri: &'a str) -> &'a str {
        uri.strip_prefix(self.concept_base.as_str())
            .unwrap_or_else(|| uri.rsplit('/').next().unwrap_or(uri))
    }
}

impl BulkQuery for SparqlClient {
    fn subject_ids(&self, filter: &BulkFilter) -> Result<IndexMap<String, String>> {
        let query = Self::query_for(filter);
        debug!(query = query.as_str(), "Running bulk subject query");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("query", query.as_str()), ("format", "json")])
            .header(ACCEPT, HeaderValue::from_static("application/sparql-results+json"))
            .send()
            .map_err(|e| SyncError::Http(format!("SPARQL request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().unwrap_or_default();
            return Err(SyncError::Http(format!("SPARQL error ({}): {}", status, text)));
        }

        let parsed: SparqlResponse = response
            .json()
            .map_err(|e| SyncError::Http(format!("Failed to parse SPARQL response: {}", e)))?;

        let mut ids = IndexMap::new();
        for row in parsed.results.bindings {
            let (Some(item), Some(id)) = (row.get("item"), row.get("id")) else {
                continue;
            };
            let subject = self.subject_id(&item.value).to_string();
            match ids.entry(id.value.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(subject);
                }
                Entry::Occupied(slot) if slot.get() != &subject => warn!(
                    external_id = id.value.as_str(),
                    first = slot.get().as_str(),
                    second = subject.as_str(),
                    "External id used by several subjects, keeping the first"
                ),
                Entry::Occupied(_) => {}
            }
        }

        Ok(ids)
    }
}
