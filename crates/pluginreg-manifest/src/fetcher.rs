//! Fetching manifests from hosted git repositories
//!
//! The raw download sits behind [`ManifestSource`] so the orchestration code
//! can be driven without a network. A fetch is a single attempt; failures
//! are returned to the caller, never retried.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use tracing::debug;

use crate::{ManifestError, ManifestRecord, ManifestResult};

/// Default manifest file name inside a plugin repository
pub const MANIFEST_FILE: &str = "MANIFEST.toml";

/// Retrieves text content from a URL
#[async_trait]
pub trait ManifestSource: Send + Sync {
    async fn fetch_text(&self, url: &str) -> ManifestResult<String>;
}

/// HTTP implementation of [`ManifestSource`]
#[derive(Clone, Debug)]
pub struct HttpSource {
    http_client: HttpClient,
}

impl HttpSource {
    pub fn new(timeout: Duration, user_agent: &str) -> ManifestResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { http_client })
    }
}

#[async_trait]
impl ManifestSource for HttpSource {
    async fn fetch_text(&self, url: &str) -> ManifestResult<String> {
        debug!(url = %url, "Fetching manifest");

        let response = self.http_client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(ManifestError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(ManifestError::Fetch {
                url: url.to_string(),
                reason: format!("HTTP {}", status),
            });
        }

        Ok(response.text().await?)
    }
}

/// Build the raw download URL of a manifest at a git ref
///
/// GitHub repositories are served from `raw.githubusercontent.com`, GitLab
/// repositories from the `/-/raw/` endpoint. Other hosts are rejected.
pub fn manifest_url(git_url: &str, git_ref: &str, manifest_file: &str) -> ManifestResult<String> {
    let trimmed = git_url.trim_end_matches('/');
    let repo = trimmed.strip_suffix(".git").unwrap_or(trimmed);

    let (scheme, rest) = repo
        .split_once("://")
        .ok_or_else(|| ManifestError::UnsupportedHost(git_url.to_string()))?;
    let (host, path) = rest
        .split_once('/')
        .ok_or_else(|| ManifestError::UnsupportedHost(git_url.to_string()))?;

    match host.to_ascii_lowercase().as_str() {
        "github.com" | "www.github.com" => Ok(format!(
            "{}://raw.githubusercontent.com/{}/{}/{}",
            scheme, path, git_ref, manifest_file
        )),
        "gitlab.com" | "www.gitlab.com" => Ok(format!(
            "{}/-/raw/{}/{}",
            repo, git_ref, manifest_file
        )),
        _ => Err(ManifestError::UnsupportedHost(git_url.to_string())),
    }
}

/// Fetches and parses plugin manifests
pub struct ManifestFetcher<S> {
    source: S,
    manifest_file: String,
}

impl<S: ManifestSource> ManifestFetcher<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            manifest_file: MANIFEST_FILE.to_string(),
        }
    }

    /// Use a different manifest file name
    pub fn with_manifest_file(mut self, manifest_file: impl Into<String>) -> Self {
        self.manifest_file = manifest_file.into();
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch the manifest of `git_url` at `git_ref` and parse it
    pub async fn fetch(&self, git_url: &str, git_ref: &str) -> ManifestResult<ManifestRecord> {
        let url = manifest_url(git_url, git_ref, &self.manifest_file)?;
        let text = self.source.fetch_text(&url).await?;
        let record = ManifestRecord::parse(&text)?;
        debug!(url = %url, fields = record.as_table().len(), "Parsed manifest");
        Ok(record)
    }
}
