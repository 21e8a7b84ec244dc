//! Upload Workflow
//!
//! A queue of local files is classified by MIME type and committed one at a
//! time to `{folder}/{file name}`. Failures stay on the item; the batch
//! carries on. Once every queued item is completed the caller is told, after
//! a short delay, to refresh the catalog and close.

use base64::Engine;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::media::{self, MediaType};
use crate::providers::ProviderError;
use crate::repository::RepositoryClient;
use crate::session_store::Session;

pub const UNSUPPORTED_TYPE_ERROR: &str = "Unsupported file type";
pub const UPLOAD_FAILED_ERROR: &str = "Upload failed";

/// Commit message used when uploading `name`
pub fn upload_message(name: &str) -> String {
    format!("Upload {} via MediaManager", name)
}

/// Where the bytes of a local file come from
#[derive(Debug, Clone)]
enum FileSource {
    Path(PathBuf),
    Memory(Vec<u8>),
}

/// A file picked for upload
#[derive(Debug, Clone)]
pub struct LocalFile {
    pub name: String,
    /// MIME type; empty when it cannot be determined
    pub mime_type: String,
    pub size: u64,
    source: FileSource,
}

impl LocalFile {
    /// Stat a file on disk and guess its MIME type from the extension
    pub async fn from_path(path: &Path) -> Result<Self, ProviderError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ProviderError::InvalidPath(path.display().to_string()))?
            .to_string();
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(ProviderError::InvalidPath(format!("{} is not a file", path.display())));
        }
        let mime_type = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            name,
            mime_type,
            size: metadata.len(),
            source: FileSource::Path(path.to_path_buf()),
        })
    }

    pub fn in_memory(name: &str, mime_type: &str, bytes: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            size: bytes.len() as u64,
            source: FileSource::Memory(bytes),
        }
    }

    pub async fn read_bytes(&self) -> Result<Vec<u8>, ProviderError> {
        match &self.source {
            FileSource::Path(path) => Ok(tokio::fs::read(path).await?),
            FileSource::Memory(bytes) => Ok(bytes.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Completed,
    Error,
}

/// One queued file and its progress
#[derive(Debug, Clone)]
pub struct UploadItem {
    pub file: LocalFile,
    pub name: String,
    pub media_type: Option<MediaType>,
    pub status: UploadStatus,
    pub error: Option<String>,
}

impl UploadItem {
    fn new(file: LocalFile) -> Self {
        Self {
            name: file.name.clone(),
            media_type: MediaType::from_mime(&file.mime_type),
            file,
            status: UploadStatus::Pending,
            error: None,
        }
    }

    /// Destination path; files without a category are `UnsupportedType`
    pub fn target_path(&self) -> Result<String, ProviderError> {
        match self.media_type {
            Some(media_type) => Ok(media::upload_path(media_type, &self.name)),
            None => Err(ProviderError::UnsupportedType(format!(
                "{} ({})",
                self.name,
                if self.file.mime_type.is_empty() { "unknown" } else { self.file.mime_type.as_str() }
            ))),
        }
    }

    /// Size in megabytes, two decimals
    pub fn size_mb_label(&self) -> String {
        format!("{:.2} MB", self.file.size as f64 / 1024.0 / 1024.0)
    }

    pub fn type_label(&self) -> &'static str {
        self.media_type.map(|m| m.folder()).unwrap_or("Unknown type")
    }
}

#[derive(Debug, Default)]
pub struct UploadQueue {
    items: Vec<UploadItem>,
}

impl UploadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue files, skipping any whose name is already queued
    ///
    /// Returns how many were added.
    pub fn add_files(&mut self, files: impl IntoIterator<Item = LocalFile>) -> usize {
        let mut added = 0;
        for file in files {
            if self.items.iter().any(|i| i.name == file.name) {
                debug!("{} already queued", file.name);
                continue;
            }
            self.items.push(UploadItem::new(file));
            added += 1;
        }
        added
    }

    /// Drop a queued item that has not completed, along with its error
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.items.len();
        self.items
            .retain(|i| i.name != name || i.status == UploadStatus::Completed);
        self.items.len() != before
    }

    pub fn items(&self) -> &[UploadItem] {
        &self.items
    }

    pub fn get(&self, name: &str) -> Option<&UploadItem> {
        self.items.iter().find(|i| i.name == name)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn completed_count(&self) -> usize {
        self.count(UploadStatus::Completed)
    }

    pub fn error_count(&self) -> usize {
        self.count(UploadStatus::Error)
    }

    fn count(&self, status: UploadStatus) -> usize {
        self.items.iter().filter(|i| i.status == status).count()
    }

    /// Every queued item has completed
    pub fn is_batch_complete(&self) -> bool {
        !self.items.is_empty() && self.completed_count() == self.items.len()
    }
}

/// Outcome of one pass over the queue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub uploaded: u32,
    pub unsupported: u32,
    pub failed: u32,
    /// Already completed before this pass
    pub skipped: u32,
    pub batch_complete: bool,
}

/// Sequential uploader bound to one session
pub struct UploadWorkflow {
    client: RepositoryClient,
    session: Session,
    completion_delay: Duration,
}

impl UploadWorkflow {
    pub fn new(client: RepositoryClient, session: Session, completion_delay: Duration) -> Self {
        Self {
            client,
            session,
            completion_delay,
        }
    }

    pub async fn run(&self, queue: &mut UploadQueue) -> BatchReport {
        self.run_with_progress(queue, |_| {}).await
    }

    /// Upload every item not yet completed, reporting each status change
    pub async fn run_with_progress<F>(&self, queue: &mut UploadQueue, mut on_progress: F) -> BatchReport
    where
        F: FnMut(&UploadItem),
    {
        let mut report = BatchReport::default();

        for item in queue.items.iter_mut() {
            if item.status == UploadStatus::Completed {
                report.skipped += 1;
                continue;
            }

            let path = match item.target_path() {
                Ok(path) => path,
                Err(e) => {
                    debug!("Skipping {}", e);
                    item.status = UploadStatus::Error;
                    item.error = Some(UNSUPPORTED_TYPE_ERROR.to_string());
                    report.unsupported += 1;
                    on_progress(&*item);
                    continue;
                }
            };

            item.status = UploadStatus::Uploading;
            item.error = None;
            on_progress(&*item);

            match self.upload_one(&item.file, &path).await {
                Ok(()) => {
                    item.status = UploadStatus::Completed;
                    report.uploaded += 1;
                }
                Err(e) => {
                    warn!("Upload of {} failed: {}", item.name, e);
                    item.status = UploadStatus::Error;
                    item.error = Some(UPLOAD_FAILED_ERROR.to_string());
                    report.failed += 1;
                }
            }
            on_progress(&*item);
        }

        report.batch_complete = queue.is_batch_complete();
        info!(
            "Upload pass: {} uploaded, {} failed, {} unsupported",
            report.uploaded, report.failed, report.unsupported
        );
        report
    }

    async fn upload_one(&self, file: &LocalFile, path: &str) -> Result<(), ProviderError> {
        let bytes = file.read_bytes().await?;
        let content = base64::engine::general_purpose::STANDARD.encode(bytes);
        self.client
            .upload_file(
                &self.session.owner,
                &self.session.repo,
                path,
                &content,
                &upload_message(&file.name),
                &self.session.branch,
            )
            .await?;
        Ok(())
    }

    /// Wait the completion delay when the whole batch is done
    ///
    /// Returns true when the caller should refresh the catalog and close.
    pub async fn await_completion(&self, queue: &UploadQueue) -> bool {
        if !queue.is_batch_complete() {
            return false;
        }
        tokio::time::sleep(self.completion_delay).await;
        true
    }
}
