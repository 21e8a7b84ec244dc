//! Content Providers Module
//!
//! A content provider is the authenticated gateway to a remote repository's
//! content endpoints. All providers implement the `ContentApi` trait so the
//! repository client and the workflows above it never build HTTP requests
//! themselves.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               ContentApi Trait              │
//! │  get_repository, get_content, put, delete   │
//! └─────────────────────────────────────────────┘
//!                      │
//!                      ▼
//!               ┌────────────┐
//!               │   GitHub   │
//!               └────────────┘
//! ```

pub mod github;
pub mod types;

pub use github::{GitHubConfig, GitHubFactory, GitHubProvider};
pub use types::*;

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use secrecy::SecretString;

/// Maximum length of an API error body carried into an error message
const MAX_ERROR_LEN: usize = 200;

/// Unified content provider trait
///
/// Every operation is keyed by (owner, repo, path, branch). Content hashes
/// returned by `get_content` are the optimistic-concurrency tokens that
/// `put_content` and `delete_content` require for existing files.
#[async_trait]
pub trait ContentApi: Send + Sync {
    /// Get display name for this provider instance
    fn display_name(&self) -> String;

    /// Fetch repository metadata
    async fn get_repository(&self, owner: &str, repo: &str) -> Result<RepositoryInfo, ProviderError>;

    /// Fetch a file or a directory listing
    async fn get_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> Result<RemoteContent, ProviderError>;

    /// Create a file, or update it when `request.sha` is set
    async fn put_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        request: &PutContentRequest,
    ) -> Result<CommitInfo, ProviderError>;

    /// Delete a file at its current content hash
    async fn delete_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        request: &DeleteContentRequest,
    ) -> Result<CommitInfo, ProviderError>;
}

/// Builds a provider bound to one access token
///
/// The session store goes through a factory so a login can construct its
/// provider lazily and tests can substitute an in-memory backend.
pub trait ProviderFactory: Send + Sync {
    fn create(&self, token: &SecretString) -> Result<Arc<dyn ContentApi>, ProviderError>;
}

static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(gh[pousr]_[A-Za-z0-9]{16,}|github_pat_[A-Za-z0-9_]{16,})")
        .expect("token pattern is a valid regex")
});

/// Reduce an API error body to a short, token-free message
///
/// JSON bodies contribute only their `message` field.
pub fn sanitize_api_error(body: &str) -> String {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());

    let redacted = TOKEN_PATTERN.replace_all(&message, "[redacted]");
    if redacted.chars().count() > MAX_ERROR_LEN {
        let truncated: String = redacted.chars().take(MAX_ERROR_LEN).collect();
        format!("{}...", truncated)
    } else {
        redacted.into_owned()
    }
}
