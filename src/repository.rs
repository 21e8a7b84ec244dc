//! Repository Client
//!
//! Typed operations over a [`ContentApi`]: connection test, file lookup,
//! folder listing, upload and delete.
//!
//! Upload and delete read the current content hash and then write with it.
//! The two calls are not atomic; an external change in between surfaces as
//! `ProviderError::Conflict` and is returned to the caller untouched.

use std::sync::Arc;
use tracing::{debug, info};

use crate::providers::{
    CommitInfo, ContentApi, ContentEntry, DeleteContentRequest, ProviderError, PutContentRequest,
    RemoteContent, RepositoryInfo,
};

/// Authenticated gateway to one provider instance
///
/// Cloning is cheap and clones keep the token they were built with.
#[derive(Clone)]
pub struct RepositoryClient {
    api: Arc<dyn ContentApi>,
}

impl RepositoryClient {
    pub fn new(api: Arc<dyn ContentApi>) -> Self {
        Self { api }
    }

    pub fn display_name(&self) -> String {
        self.api.display_name()
    }

    /// Verify the repository exists and the token can read it
    pub async fn test_connection(&self, owner: &str, repo: &str) -> Result<RepositoryInfo, ProviderError> {
        self.api.get_repository(owner, repo).await
    }

    /// Fetch one content entry; its sha is the token later writes need
    pub async fn get_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> Result<RemoteContent, ProviderError> {
        self.api.get_content(owner, repo, path, branch).await
    }

    /// List a folder; a missing folder is an empty listing
    pub async fn list_files(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> Result<Vec<ContentEntry>, ProviderError> {
        match self.api.get_content(owner, repo, path, branch).await {
            Ok(RemoteContent::Directory(entries)) => Ok(entries),
            Ok(RemoteContent::File(_)) => {
                debug!("{} is a file, not a folder; listing as empty", path);
                Ok(Vec::new())
            }
            Err(ProviderError::NotFound(_)) => {
                debug!("Folder {} does not exist yet", path);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Create or replace a file with base64 `content`
    pub async fn upload_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        content: &str,
        message: &str,
        branch: &str,
    ) -> Result<CommitInfo, ProviderError> {
        let sha = match self.get_file(owner, repo, path, branch).await {
            Ok(existing) => existing.sha().map(str::to_string),
            Err(ProviderError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };

        let request = PutContentRequest {
            message: message.to_string(),
            content: content.to_string(),
            branch: branch.to_string(),
            sha,
        };
        let commit = self.api.put_content(owner, repo, path, &request).await?;
        info!(
            "{} {} on {}",
            if request.sha.is_some() { "Updated" } else { "Created" },
            path,
            branch
        );
        Ok(commit)
    }

    /// Delete an existing file at its current content hash
    pub async fn delete_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        message: &str,
        branch: &str,
    ) -> Result<CommitInfo, ProviderError> {
        let sha = match self.get_file(owner, repo, path, branch).await? {
            RemoteContent::File(entry) => entry.sha,
            RemoteContent::Directory(_) => {
                return Err(ProviderError::InvalidPath(format!("{} is a folder", path)))
            }
        };

        let request = DeleteContentRequest {
            message: message.to_string(),
            sha,
            branch: branch.to_string(),
        };
        let commit = self.api.delete_content(owner, repo, path, &request).await?;
        info!("Deleted {} on {}", path, branch);
        Ok(commit)
    }
}
