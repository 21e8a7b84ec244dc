//! File Catalog
//!
//! In-memory snapshot of the library: the union of the `images/`, `videos/`
//! and `audio/` folder listings, each entry tagged with the folder it came
//! from. The snapshot is stale after any mutation and is rebuilt by
//! [`Catalog::refresh`].

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::media::{self, Category, MediaType};
use crate::providers::{CommitInfo, ContentEntry, ProviderError};
use crate::repository::RepositoryClient;
use crate::session_store::Session;

/// Shown when a view has nothing to list
pub const EMPTY_CATALOG_MESSAGE: &str = "No media files found";

/// One stored media file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    pub sha: String,
    /// Size in bytes as reported by the listing
    pub size: u64,
    /// Folder the entry was listed from
    pub media_type: MediaType,
}

impl FileEntry {
    fn from_listing(entry: ContentEntry, media_type: MediaType) -> Self {
        Self {
            name: entry.name,
            path: entry.path,
            sha: entry.sha,
            size: entry.size,
            media_type,
        }
    }

    pub fn raw_url(&self, raw_host: &str, session: &Session) -> String {
        media::raw_url(raw_host, &session.owner, &session.repo, &session.branch, &self.path)
    }

    pub fn embed_code(&self, raw_host: &str, session: &Session) -> String {
        media::embed_code(self.media_type, &self.raw_url(raw_host, session), &self.name)
    }
}

/// Commit message used when deleting `name`
pub fn delete_message(name: &str) -> String {
    format!("Delete {}", name)
}

/// Entries visible under `category` whose name contains `search` (case-insensitive)
///
/// Order is preserved. An empty search matches everything.
pub fn filter<'a>(entries: &'a [FileEntry], category: Category, search: &str) -> Vec<&'a FileEntry> {
    let needle = search.to_lowercase();
    entries
        .iter()
        .filter(|e| category.matches(e.media_type))
        .filter(|e| needle.is_empty() || e.name.to_lowercase().contains(&needle))
        .collect()
}

/// Result of [`Catalog::delete`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub commit: CommitInfo,
    /// Catalog size after the follow-up refresh; `None` when that refresh failed
    pub remaining: Option<usize>,
}

#[derive(Debug, Default)]
pub struct Catalog {
    entries: Vec<FileEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find_by_path(&self, path: &str) -> Option<&FileEntry> {
        let path = path.trim_start_matches('/');
        self.entries.iter().find(|e| e.path == path)
    }

    pub fn filtered(&self, category: Category, search: &str) -> Vec<&FileEntry> {
        filter(&self.entries, category, search)
    }

    /// Re-list every media folder and replace the snapshot
    ///
    /// Folders are listed one after another in images, videos, audio order.
    /// The first failure aborts the refresh and the previous snapshot stays.
    pub async fn refresh(&mut self, client: &RepositoryClient, session: &Session) -> Result<usize, ProviderError> {
        let mut fresh = Vec::new();
        for media_type in MediaType::ALL {
            let listing = client
                .list_files(&session.owner, &session.repo, media_type.folder(), &session.branch)
                .await
                .map_err(|e| {
                    warn!("Catalog refresh aborted at {}/: {}", media_type.folder(), e);
                    e
                })?;
            debug!("{}/ holds {} entries", media_type.folder(), listing.len());
            fresh.extend(listing.into_iter().map(|entry| FileEntry::from_listing(entry, media_type)));
        }

        self.entries = fresh;
        info!("Catalog refreshed: {} files on {}", self.entries.len(), session.describe());
        Ok(self.entries.len())
    }

    /// Delete a stored file by path, then refresh
    ///
    /// A refresh failure after a successful delete does not fail the delete;
    /// it leaves `remaining` empty and the previous snapshot in place.
    pub async fn delete(
        &mut self,
        client: &RepositoryClient,
        session: &Session,
        path: &str,
    ) -> Result<DeleteOutcome, ProviderError> {
        let path = path.trim_start_matches('/');
        let name = match self.find_by_path(path) {
            Some(entry) => entry.name.clone(),
            None => path.rsplit('/').next().unwrap_or(path).to_string(),
        };

        let commit = client
            .delete_file(&session.owner, &session.repo, path, &delete_message(&name), &session.branch)
            .await?;

        let remaining = match self.refresh(client, session).await {
            Ok(count) => Some(count),
            Err(e) => {
                warn!("Refresh after deleting {} failed: {}", path, e);
                None
            }
        };
        Ok(DeleteOutcome { commit, remaining })
    }
}
