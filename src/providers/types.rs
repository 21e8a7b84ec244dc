//! Shared types for content providers
//!
//! Provider-independent representations of repository content, write requests,
//! commit results and the error taxonomy every provider maps its failures into.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of an entry returned by the contents endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Submodule,
    #[serde(other)]
    Unknown,
}

/// Single entry of repository content
///
/// Produced both for a fetched file and for each child of a fetched directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEntry {
    /// File or directory name
    pub name: String,
    /// Full path from the repository root
    pub path: String,
    /// Content hash, required to update or delete the file
    pub sha: String,
    /// Size in bytes (0 for directories)
    #[serde(default)]
    pub size: u64,
    /// Entry kind
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

impl ContentEntry {
    /// Create a file entry
    pub fn file(name: &str, path: &str, sha: &str, size: u64) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            sha: sha.to_string(),
            size,
            kind: EntryKind::File,
        }
    }

    /// Create a directory entry
    pub fn directory(name: &str, path: &str, sha: &str) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            sha: sha.to_string(),
            size: 0,
            kind: EntryKind::Dir,
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// Result of a get-content call: either one file or a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteContent {
    File(ContentEntry),
    Directory(Vec<ContentEntry>),
}

impl RemoteContent {
    /// Content hash of a file; directories carry none
    pub fn sha(&self) -> Option<&str> {
        match self {
            RemoteContent::File(entry) => Some(entry.sha.as_str()),
            RemoteContent::Directory(_) => None,
        }
    }
}

/// Repository metadata returned by get-repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryInfo {
    /// `owner/name`
    pub full_name: String,
    pub default_branch: String,
    pub private: bool,
}

/// Body of a create-or-update request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PutContentRequest {
    /// Commit message
    pub message: String,
    /// Base64-encoded file content
    pub content: String,
    pub branch: String,
    /// Current content hash; present for an update, absent for a create
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

/// Body of a delete request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteContentRequest {
    pub message: String,
    pub sha: String,
    pub branch: String,
}

/// Commit produced by a write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitInfo {
    /// Commit hash
    pub sha: String,
    /// New content hash of the written file (none after a delete)
    pub content_sha: Option<String>,
}

/// Provider error type
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ProviderError {
    /// Transport-level failures that a user may retry by hand
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ProviderError::Timeout | ProviderError::NetworkError(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound(_))
    }
}
