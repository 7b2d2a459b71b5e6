//! Blocking client for a MediaWiki/Wikibase API.
//!
//! Subjects and statements are read with `wbgetentities` and written with one
//! `wbeditentity` call per subject. Media files live on the asset wiki, which
//! may be a different site from the item store; uploads and the SHA-1 asset
//! index go there.

mod codec;

use std::cell::RefCell;
use std::collections::HashSet;
use std::time::Duration;

use reqwest::blocking::{multipart, Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};
use crate::identity::{AssetCandidate, Fingerprint, FingerprintAlgorithm};
use crate::model::{AssetRef, Subject};
use crate::temporal::TimeQualifiers;

use super::{
    AssetIndex, AuthToken, MutationRequest, MutationSink, StatementStore, SubmitError,
    SubmitErrorKind, Submitted,
};

pub use codec::Codec;

/// Endpoints and request settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// `api.php` of the item store.
    pub api_url: String,
    /// `api.php` of the media wiki; defaults to `api_url`.
    pub asset_api_url: Option<String>,
    /// SPARQL endpoint for the bulk subject query.
    pub sparql_url: String,
    /// Concept URI prefix (`http://www.wikidata.org/entity/`).
    pub concept_base: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    /// `maxlag` parameter sent with every API call.
    pub maxlag: Option<u32>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            api_url: "https://www.wikidata.org/w/api.php".to_string(),
            asset_api_url: Some("https://commons.wikimedia.org/w/api.php".to_string()),
            sparql_url: "https://query.wikidata.org/sparql".to_string(),
            concept_base: "http://www.wikidata.org/entity/".to_string(),
            user_agent: format!("claimsync/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 60,
            maxlag: Some(5),
        }
    }
}

impl StoreConfig {
    pub fn asset_api_url(&self) -> &str {
        self.asset_api_url.as_deref().unwrap_or(&self.api_url)
    }

    fn same_site(&self) -> bool {
        self.asset_api_url() == self.api_url
    }
}

/// Bot account credentials.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Read `CLAIMSYNC_USERNAME` and `CLAIMSYNC_PASSWORD`.
    pub fn from_env() -> Result<Self> {
        let username = std::env::var("CLAIMSYNC_USERNAME").map_err(|_| {
            SyncError::Credentials("CLAIMSYNC_USERNAME environment variable not set".to_string())
        })?;
        let password = std::env::var("CLAIMSYNC_PASSWORD").map_err(|_| {
            SyncError::Credentials("CLAIMSYNC_PASSWORD environment variable not set".to_string())
        })?;
        Ok(Self::new(username, password))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Error body of a failed API call.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ApiError {
    code: String,
    info: String,
}

impl ApiError {
    fn from_response(body: &Json) -> Option<Self> {
        let error = body.get("error")?;
        Some(Self {
            code: error.get("code").and_then(Json::as_str).unwrap_or("unknown").to_string(),
            info: error.get("info").and_then(Json::as_str).unwrap_or_default().to_string(),
        })
    }

    fn kind(&self) -> SubmitErrorKind {
        error_kind(&self.code)
    }

    fn into_submit_error(self) -> SubmitError {
        SubmitError::new(self.kind(), format!("{}: {}", self.code, self.info))
    }
}

/// Submission error kind for an API error code.
fn error_kind(code: &str) -> SubmitErrorKind {
    match code {
        "badtoken" | "notoken" | "assertuserfailed" | "assertbotfailed" => SubmitErrorKind::AuthExpired,
        "editconflict" => SubmitErrorKind::Conflict,
        "maxlag" | "readonly" | "ratelimited" | "internal_api_error_DBQueryError" => {
            SubmitErrorKind::TransientServer
        }
        _ => SubmitErrorKind::PermanentRejection,
    }
}

#[derive(Debug, Default)]
struct Session {
    logged_in: Vec<String>,
    asset_token: Option<AuthToken>,
    /// Files stored by this session, so a retried request does not send them again.
    uploaded: HashSet<AssetRef>,
}

/// How the asset wiki answered an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UploadOutcome {
    Uploaded,
    /// The same content already sits under the requested name.
    AlreadyStored,
}

/// Classify an `action=upload` response for `candidate`.
fn upload_outcome(body: &Json, candidate: &AssetCandidate) -> std::result::Result<UploadOutcome, SubmitError> {
    let upload = &body["upload"];
    match upload["result"].as_str() {
        Some("Success") => return Ok(UploadOutcome::Uploaded),
        Some("Warning") => {
            let warnings = &upload["warnings"];
            let exists_here = warnings["exists"]
                .as_str()
                .map_or(false, |name| AssetRef::new(name) == candidate.name);
            let same_content = warnings.get("nochange").is_some()
                || warnings["duplicate"]
                    .as_array()
                    .map_or(false, |names| {
                        names
                            .iter()
                            .filter_map(Json::as_str)
                            .any(|name| AssetRef::new(name) == candidate.name)
                    });
            if exists_here && same_content {
                return Ok(UploadOutcome::AlreadyStored);
            }
        }
        _ => {}
    }

    Err(SubmitError::new(
        SubmitErrorKind::PermanentRejection,
        format!(
            "upload of {} not accepted ({:?}): {}",
            candidate.name,
            upload["result"].as_str(),
            upload["warnings"]
        ),
    ))
}

/// Wikibase store over HTTP.
pub struct WikibaseClient {
    client: Client,
    config: StoreConfig,
    credentials: Option<Credentials>,
    codec: Codec,
    session: RefCell<Session>,
}

impl WikibaseClient {
    pub fn new(config: StoreConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .cookie_store(true)
            .build()
            .map_err(|e| SyncError::Config(format!("Failed to create HTTP client: {}", e)))?;
        let codec = Codec::new(config.concept_base.clone(), TimeQualifiers::default());

        Ok(Self {
            client,
            config,
            credentials: None,
            codec,
            session: RefCell::new(Session::default()),
        })
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Qualifier conventions used when decoding dates.
    pub fn with_time_qualifiers(mut self, time: TimeQualifiers) -> Self {
        self.codec.time = time;
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // =========================================================================
    // HTTP PLUMBING
    // =========================================================================

    fn with_common(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.query(&[("format", "json"), ("formatversion", "2")]);
        match self.config.maxlag {
            Some(lag) => builder.query(&[("maxlag", lag.to_string())]),
            None => builder,
        }
    }

    /// Send a request and parse the JSON body. Transport failures and 5xx
    /// responses come back as transient submission errors.
    fn send(&self, builder: RequestBuilder) -> std::result::Result<Json, SubmitError> {
        let response = self
            .with_common(builder)
            .send()
            .map_err(|e| SubmitError::new(SubmitErrorKind::TransientServer, format!("request failed: {}", e)))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(SubmitError::new(
                SubmitErrorKind::TransientServer,
                format!("server error ({})", status),
            ));
        }
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(SubmitError::new(
                SubmitErrorKind::PermanentRejection,
                format!("API error ({}): {}", status, text),
            ));
        }

        let body: Json = response.json().map_err(|e| {
            SubmitError::new(SubmitErrorKind::PermanentRejection, format!("invalid API response: {}", e))
        })?;
        match ApiError::from_response(&body) {
            Some(error) => Err(error.into_submit_error()),
            None => Ok(body),
        }
    }

    /// Read-only GET against `api`.
    fn get(&self, api: &str, params: &[(&str, &str)]) -> Result<Json> {
        self.send(self.client.get(api).query(params))
            .map_err(|e| SyncError::Lookup {
                target: params
                    .iter()
                    .find(|(k, _)| *k == "ids" || *k == "titles")
                    .map(|(_, v)| v.to_string())
                    .unwrap_or_else(|| api.to_string()),
                message: e.to_string(),
            })
    }

    fn login(&self, api: &str) -> Result<()> {
        if self.session.borrow().logged_in.iter().any(|site| site == api) {
            return Ok(());
        }
        let Some(credentials) = &self.credentials else {
            return Err(SyncError::Credentials(
                "no credentials configured for mutating calls".to_string(),
            ));
        };

        let tokens = self
            .send(self.client.get(api).query(&[("action", "query"), ("meta", "tokens"), ("type", "login")]))
            .map_err(|e| SyncError::Credentials(format!("Failed to fetch login token: {}", e)))?;
        let login_token = tokens["query"]["tokens"]["logintoken"]
            .as_str()
            .ok_or_else(|| SyncError::Credentials("no login token in response".to_string()))?;

        let body = self
            .send(self.client.post(api).form(&[
                ("action", "login"),
                ("lgname", credentials.username.as_str()),
                ("lgpassword", credentials.password.as_str()),
                ("lgtoken", login_token),
            ]))
            .map_err(|e| SyncError::Credentials(format!("Login failed: {}", e)))?;

        let result = body["login"]["result"].as_str().unwrap_or("Failed");
        if result != "Success" {
            let reason = body["login"]["reason"].as_str().unwrap_or(result);
            return Err(SyncError::Credentials(format!("Login failed: {}", reason)));
        }

        info!(site = api, user = credentials.username.as_str(), "Logged in");
        self.session.borrow_mut().logged_in.push(api.to_string());
        Ok(())
    }

    fn csrf_token(&self, api: &str) -> Result<AuthToken> {
        self.login(api)?;
        let body = self
            .send(self.client.get(api).query(&[("action", "query"), ("meta", "tokens")]))
            .map_err(|e| SyncError::Credentials(format!("Failed to fetch edit token: {}", e)))?;
        body["query"]["tokens"]["csrftoken"]
            .as_str()
            .map(AuthToken::new)
            .ok_or_else(|| SyncError::Credentials("no edit token in response".to_string()))
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    fn upload(
        &self,
        candidate: &AssetCandidate,
        summary: &str,
        token: &AuthToken,
    ) -> std::result::Result<(), SubmitError> {
        let file = multipart::Part::bytes(candidate.bytes.clone()).file_name(candidate.name.name().to_string());
        let form = multipart::Form::new()
            .text("action", "upload")
            .text("filename", candidate.name.name().to_string())
            .text("comment", summary.to_string())
            .text("text", candidate.description.clone().unwrap_or_default())
            .text("token", token.secret().to_string())
            .part("file", file);

        let body = self.send(self.client.post(self.config.asset_api_url()).multipart(form))?;
        match upload_outcome(&body, candidate)? {
            UploadOutcome::Uploaded => {
                info!(file = %candidate.name, size = candidate.size(), "Uploaded asset");
            }
            UploadOutcome::AlreadyStored => {
                info!(file = %candidate.name, "Asset already stored with the same content");
            }
        }
        self.session.borrow_mut().uploaded.insert(candidate.name.clone());
        Ok(())
    }

    /// Uploads of `request` this session has not stored yet.
    fn pending_uploads<'r>(&self, request: &'r MutationRequest) -> Vec<&'r AssetCandidate> {
        let session = self.session.borrow();
        request
            .uploads
            .iter()
            .filter(|upload| {
                let done = session.uploaded.contains(&upload.name);
                if done {
                    debug!(file = %upload.name, "Skipping upload stored by an earlier attempt");
                }
                !done
            })
            .collect()
    }

    /// `wbeditentity` data document for a request.
    fn edit_document(&self, request: &MutationRequest) -> std::result::Result<Json, SubmitError> {
        let mut claims = Vec::with_capacity(request.additions.len() + request.replacements.len());
        for replacement in &request.replacements {
            let Some(id) = &replacement.old.id else {
                return Err(SubmitError::new(
                    SubmitErrorKind::PermanentRejection,
                    format!("cannot replace {} without a statement id", replacement.old.property),
                ));
            };
            let mut new = replacement.new.clone();
            new.id = Some(id.clone());
            claims.push(self.codec.encode_statement(&new));
        }
        for addition in &request.additions {
            claims.push(self.codec.encode_statement(addition));
        }
        Ok(json!({ "claims": claims }))
    }
}

impl StatementStore for WikibaseClient {
    fn lookup(&self, subject_id: &str) -> Result<Option<Subject>> {
        let response = self.send(self.client.get(&self.config.api_url).query(&[
            ("action", "wbgetentities"),
            ("ids", subject_id),
            ("props", "claims"),
        ]));

        let body = match response {
            Ok(body) => body,
            // Not an entity id at all, or an id the store never had.
            Err(e) if e.message.starts_with("no-such-entity") || e.message.starts_with("invalid-entity-id") => {
                debug!(subject = subject_id, "Subject not in store");
                return Ok(None);
            }
            Err(e) => {
                return Err(SyncError::Lookup {
                    target: subject_id.to_string(),
                    message: e.to_string(),
                });
            }
        };

        let entity = body["entities"]
            .get(subject_id)
            .or_else(|| body["entities"].as_object().and_then(|m| m.values().next()));
        Ok(entity.and_then(|entity| self.codec.decode_entity(subject_id, entity)))
    }
}

impl AssetIndex for WikibaseClient {
    fn find_by_fingerprint(&self, fingerprint: &Fingerprint) -> Result<Option<AssetRef>> {
        if fingerprint.algorithm != FingerprintAlgorithm::Sha1 {
            return Err(SyncError::Lookup {
                target: fingerprint.to_string(),
                message: "the asset index is keyed by SHA-1".to_string(),
            });
        }

        let sha1 = fingerprint.hex.to_lowercase();
        let body = self.get(
            self.config.asset_api_url(),
            &[("action", "query"), ("list", "allimages"), ("aisha1", sha1.as_str())],
        )?;

        Ok(body["query"]["allimages"]
            .as_array()
            .and_then(|images| images.first())
            .and_then(|image| image["name"].as_str().or_else(|| image["title"].as_str()))
            .map(AssetRef::new))
    }

    fn asset_size(&self, asset: &AssetRef) -> Result<Option<u64>> {
        let title = asset.title();
        let body = self.get(
            self.config.asset_api_url(),
            &[
                ("action", "query"),
                ("titles", title.as_str()),
                ("prop", "imageinfo"),
                ("iiprop", "size"),
            ],
        )?;

        Ok(body["query"]["pages"]
            .as_array()
            .and_then(|pages| pages.first())
            .and_then(|page| page["imageinfo"].as_array())
            .and_then(|info| info.first())
            .and_then(|info| info["size"].as_u64()))
    }
}

impl MutationSink for WikibaseClient {
    fn fetch_token(&self) -> Result<AuthToken> {
        let token = self.csrf_token(&self.config.api_url)?;
        if !self.config.same_site() {
            let asset_token = self.csrf_token(self.config.asset_api_url())?;
            self.session.borrow_mut().asset_token = Some(asset_token);
        }
        debug!("Fetched edit token");
        Ok(token)
    }

    fn submit(
        &self,
        request: &MutationRequest,
        token: &AuthToken,
    ) -> std::result::Result<Submitted, SubmitError> {
        let data = self.edit_document(request)?;

        let pending = self.pending_uploads(request);
        if !pending.is_empty() {
            let asset_token = if self.config.same_site() {
                Some(token.clone())
            } else {
                self.session.borrow().asset_token.clone()
            };
            let asset_token = asset_token
                .ok_or_else(|| SubmitError::new(SubmitErrorKind::AuthExpired, "no asset wiki token"))?;
            for upload in pending {
                self.upload(upload, &request.summary, &asset_token)?;
            }
        }

        if request.additions.is_empty() && request.replacements.is_empty() {
            return Ok(Submitted {
                subject_id: request.subject_id.clone().unwrap_or_default(),
                revision: None,
            });
        }

        let data = data.to_string();
        let mut form = vec![
            ("action", "wbeditentity"),
            ("data", data.as_str()),
            ("summary", request.summary.as_str()),
            ("token", token.secret()),
            ("bot", "1"),
        ];
        match &request.subject_id {
            Some(id) => form.push(("id", id.as_str())),
            None => form.push(("new", "item")),
        }

        let body = self.send(self.client.post(&self.config.api_url).form(&form))?;
        let entity = &body["entity"];
        let subject_id = entity["id"].as_str().map(str::to_string).ok_or_else(|| {
            warn!(response = %body, "Edit response without entity id");
            SubmitError::new(SubmitErrorKind::PermanentRejection, "edit response without entity id")
        })?;

        Ok(Submitted {
            subject_id,
            revision: entity["lastrevid"].as_u64(),
        })
    }
}
