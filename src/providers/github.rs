//! GitHub Content Provider
//!
//! Implements ContentApi for GitHub using the REST v3 contents endpoints.
//! Uses a personal access token (Bearer) for authentication.
//!
//! API Base: https://api.github.com (overridable for GitHub Enterprise)
//! Writes: base64 content in a JSON body, `sha` required to replace a file

use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::{
    sanitize_api_error, CommitInfo, ContentApi, ContentEntry, DeleteContentRequest,
    ProviderError, ProviderFactory, PutContentRequest, RemoteContent, RepositoryInfo,
};
use crate::config::AppConfig;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";
const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";

// ─── API Response Types ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GhRepository {
    full_name: String,
    default_branch: String,
    #[serde(default)]
    private: bool,
}

/// The contents endpoint answers with an array for directories and an
/// object for everything else.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentPayload {
    Listing(Vec<ContentEntry>),
    Single(ContentEntry),
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    commit: CommitRef,
    content: Option<ContentRef>,
}

#[derive(Debug, Deserialize)]
struct CommitRef {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ContentRef {
    sha: String,
}

// ─── Provider ────────────────────────────────────────────────────────────

/// GitHub provider configuration
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// REST API root, without trailing slash
    pub api_base: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            user_agent: concat!("MediaManager/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl GitHubConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            api_base: config.api_base_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
            timeout: config.request_timeout(),
        }
    }
}

pub struct GitHubProvider {
    config: GitHubConfig,
    token: SecretString,
    client: reqwest::Client,
}

impl GitHubProvider {
    pub fn new(config: GitHubConfig, token: SecretString) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ProviderError::InvalidConfig(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { config, token, client })
    }

    fn auth_header(&self) -> Result<HeaderValue, ProviderError> {
        HeaderValue::from_str(&format!("Bearer {}", self.token.expose_secret())).map_err(|e| {
            ProviderError::AuthenticationFailed(format!("Invalid characters in access token: {}", e))
        })
    }

    fn repo_url(&self, owner: &str, repo: &str) -> String {
        format!(
            "{}/repos/{}/{}",
            self.config.api_base.trim_end_matches('/'),
            urlencoding::encode(owner),
            urlencoding::encode(repo)
        )
    }

    fn contents_url(&self, owner: &str, repo: &str, path: &str) -> String {
        format!("{}/contents/{}", self.repo_url(owner, repo), encode_path(path))
    }

    fn request(&self, method: Method, url: &str) -> Result<RequestBuilder, ProviderError> {
        Ok(self
            .client
            .request(method, url)
            .header(AUTHORIZATION, self.auth_header()?)
            .header(ACCEPT, GITHUB_MEDIA_TYPE)
            .header("X-GitHub-Api-Version", API_VERSION))
    }

    /// Send a request, turning non-2xx answers into the error taxonomy
    async fn send(&self, builder: RequestBuilder, target: &str) -> Result<Response, ProviderError> {
        let response = builder.send().await.map_err(map_transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        debug!("[GITHUB] {} answered HTTP {}", target, status);
        Err(map_status(status, &body, target))
    }
}

/// Percent-encode each segment of a repository path
fn encode_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn map_transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::NetworkError(e.to_string())
    }
}

fn map_status(status: StatusCode, body: &str, target: &str) -> ProviderError {
    let detail = sanitize_api_error(body);
    match status {
        StatusCode::UNAUTHORIZED => {
            ProviderError::AuthenticationFailed(format!("{} (HTTP 401)", detail))
        }
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
            if detail.to_lowercase().contains("rate limit") =>
        {
            ProviderError::ServerError(format!("Rate limit exceeded: {}", detail))
        }
        StatusCode::FORBIDDEN => {
            ProviderError::AuthenticationFailed(format!("Access to {} denied: {}", target, detail))
        }
        StatusCode::NOT_FOUND => ProviderError::NotFound(target.to_string()),
        StatusCode::CONFLICT => ProviderError::Conflict(format!("{}: {}", target, detail)),
        // A create racing an external write is rejected for the missing sha
        StatusCode::UNPROCESSABLE_ENTITY if detail.contains("sha") => {
            ProviderError::Conflict(format!("{}: {}", target, detail))
        }
        other => ProviderError::ServerError(format!("HTTP {} for {}: {}", other, target, detail)),
    }
}

#[async_trait]
impl ContentApi for GitHubProvider {
    fn display_name(&self) -> String {
        "GitHub".to_string()
    }

    async fn get_repository(&self, owner: &str, repo: &str) -> Result<RepositoryInfo, ProviderError> {
        let target = format!("{}/{}", owner, repo);
        let request = self.request(Method::GET, &self.repo_url(owner, repo))?;
        let response = self.send(request, &target).await?;

        let repository: GhRepository = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Repository response: {}", e)))?;

        info!("[GITHUB] Reached repository {}", repository.full_name);
        Ok(RepositoryInfo {
            full_name: repository.full_name,
            default_branch: repository.default_branch,
            private: repository.private,
        })
    }

    async fn get_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> Result<RemoteContent, ProviderError> {
        let url = format!(
            "{}?ref={}",
            self.contents_url(owner, repo, path),
            urlencoding::encode(branch)
        );
        debug!("[GITHUB] GET contents {}@{}", path, branch);
        let response = self.send(self.request(Method::GET, &url)?, path).await?;

        let payload: ContentPayload = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Contents response for {}: {}", path, e)))?;

        Ok(match payload {
            ContentPayload::Listing(entries) => RemoteContent::Directory(entries),
            ContentPayload::Single(entry) => RemoteContent::File(entry),
        })
    }

    async fn put_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        request: &PutContentRequest,
    ) -> Result<CommitInfo, ProviderError> {
        debug!(
            "[GITHUB] PUT contents {}@{} ({})",
            path,
            request.branch,
            if request.sha.is_some() { "update" } else { "create" }
        );
        let builder = self
            .request(Method::PUT, &self.contents_url(owner, repo, path))?
            .json(request);
        let response = self.send(builder, path).await?;

        let written: WriteResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Write response for {}: {}", path, e)))?;

        info!("[GITHUB] Committed {} ({})", path, written.commit.sha);
        Ok(CommitInfo {
            sha: written.commit.sha,
            content_sha: written.content.map(|c| c.sha),
        })
    }

    async fn delete_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        request: &DeleteContentRequest,
    ) -> Result<CommitInfo, ProviderError> {
        debug!("[GITHUB] DELETE contents {}@{}", path, request.branch);
        let builder = self
            .request(Method::DELETE, &self.contents_url(owner, repo, path))?
            .json(request);
        let response = self.send(builder, path).await?;

        let written: WriteResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Delete response for {}: {}", path, e)))?;

        info!("[GITHUB] Deleted {} ({})", path, written.commit.sha);
        Ok(CommitInfo {
            sha: written.commit.sha,
            content_sha: None,
        })
    }
}

/// Factory producing GitHub providers that share one configuration
#[derive(Debug, Clone, Default)]
pub struct GitHubFactory {
    config: GitHubConfig,
}

impl GitHubFactory {
    pub fn new(config: GitHubConfig) -> Self {
        Self { config }
    }
}

impl ProviderFactory for GitHubFactory {
    fn create(&self, token: &SecretString) -> Result<Arc<dyn ContentApi>, ProviderError> {
        Ok(Arc::new(GitHubProvider::new(self.config.clone(), token.clone())?))
    }
}
