//! GitHub Gist ledger backend.
//!
//! The ledger lives as one file inside a gist. Loading fetches the gist and
//! reads the file's content; saving edits the gist with the new content.
//! The HTTP layer is abstracted by [`GistClient`] so the backend can be
//! exercised without a network.

use crate::backend::LedgerBackend;
use crate::error::{LedgerError, LedgerResult};
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

/// Default GitHub REST API base URL.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Default name of the ledger file inside the gist.
pub const DEFAULT_LEDGER_FILE: &str = "synced_photos.json";

const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";

/// Configuration for the gist backend.
#[derive(Clone)]
pub struct GistConfig {
    /// Personal access token with the `gist` scope.
    pub token: String,
    /// Identifier of the gist holding the ledger.
    pub gist_id: String,
    /// Name of the ledger file inside the gist.
    pub file_name: String,
    /// API base URL.
    pub api_base: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl GistConfig {
    /// Creates a configuration for the given token and gist.
    pub fn new(token: impl Into<String>, gist_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            gist_id: gist_id.into(),
            file_name: DEFAULT_LEDGER_FILE.into(),
            api_base: GITHUB_API_URL.into(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Sets the ledger file name.
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = name.into();
        self
    }

    /// Sets the API base URL (for GitHub Enterprise or a local stub).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn gist_url(&self) -> String {
        format!("{}/gists/{}", self.api_base, self.gist_id)
    }
}

impl fmt::Debug for GistConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GistConfig")
            .field("token", &"<redacted>")
            .field("gist_id", &self.gist_id)
            .field("file_name", &self.file_name)
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// HTTP client abstraction for the gist API.
///
/// Implementations return the response body of successful requests and map
/// non-success statuses to [`LedgerError::RemoteStatus`].
pub trait GistClient: Send + Sync {
    /// Sends a GET request and returns the response body.
    fn get(&self, url: &str) -> LedgerResult<String>;

    /// Sends a PATCH request with a JSON body.
    fn patch(&self, url: &str, body: &serde_json::Value) -> LedgerResult<()>;
}

/// [`GistClient`] backed by a blocking `reqwest` client.
pub struct ReqwestGistClient {
    client: reqwest::blocking::Client,
    token: String,
}

impl ReqwestGistClient {
    /// Builds a client for the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new(config: &GistConfig) -> LedgerResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("aura-sync/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            token: config.token.clone(),
        })
    }

    fn finish(response: reqwest::blocking::Response) -> LedgerResult<String> {
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(LedgerError::remote_status(status.as_u16(), body));
        }
        Ok(body)
    }
}

impl GistClient for ReqwestGistClient {
    fn get(&self, url: &str) -> LedgerResult<String> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .header(ACCEPT, GITHUB_MEDIA_TYPE)
            .header(API_VERSION_HEADER, API_VERSION)
            .send()?;
        Self::finish(response)
    }

    fn patch(&self, url: &str, body: &serde_json::Value) -> LedgerResult<()> {
        let response = self
            .client
            .patch(url)
            .bearer_auth(&self.token)
            .header(ACCEPT, GITHUB_MEDIA_TYPE)
            .header(API_VERSION_HEADER, API_VERSION)
            .json(body)
            .send()?;
        Self::finish(response).map(|_| ())
    }
}

#[derive(Debug, Deserialize)]
struct GistResponse {
    #[serde(default)]
    files: HashMap<String, GistFile>,
}

#[derive(Debug, Deserialize)]
struct GistFile {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    truncated: bool,
    #[serde(default)]
    raw_url: Option<String>,
}

/// Ledger stored as a file in a GitHub Gist.
pub struct GistBackend<C: GistClient = ReqwestGistClient> {
    config: GistConfig,
    client: C,
}

impl GistBackend<ReqwestGistClient> {
    /// Creates a backend talking to the GitHub API.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: GistConfig) -> LedgerResult<Self> {
        let client = ReqwestGistClient::new(&config)?;
        info!(gist = %short_gist(&config.gist_id), "connected to ledger gist");
        Ok(Self { config, client })
    }
}

impl<C: GistClient> GistBackend<C> {
    /// Creates a backend with a custom HTTP client.
    pub fn with_client(config: GistConfig, client: C) -> Self {
        Self { config, client }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &GistConfig {
        &self.config
    }
}

impl<C: GistClient> LedgerBackend for GistBackend<C> {
    fn load(&self) -> LedgerResult<Option<String>> {
        let body = self.client.get(&self.config.gist_url())?;
        let gist: GistResponse = serde_json::from_str(&body).map_err(|e| {
            LedgerError::remote_status(200, format!("unexpected gist response: {}", e))
        })?;

        let Some(file) = gist.files.get(&self.config.file_name) else {
            debug!(file = %self.config.file_name, "ledger file not present in gist");
            return Ok(None);
        };

        // Large files come back truncated; the full text is behind raw_url.
        if file.truncated {
            return match &file.raw_url {
                Some(raw_url) => self.client.get(raw_url).map(Some),
                // Partial content must not reach the parser, it would be
                // mistaken for corruption and reset on the next write.
                None => Err(LedgerError::remote_status(
                    200,
                    "ledger file is truncated and the gist gave no raw_url",
                )),
            };
        }

        Ok(file.content.clone())
    }

    fn save(&self, contents: &str) -> LedgerResult<()> {
        let body = json!({
            "files": {
                self.config.file_name.as_str(): { "content": contents }
            }
        });
        self.client.patch(&self.config.gist_url(), &body)
    }

    fn describe(&self) -> String {
        format!("gist {}", short_gist(&self.config.gist_id))
    }
}

fn short_gist(gist_id: &str) -> String {
    format!("{}...", crate::short_id(gist_id))
}
