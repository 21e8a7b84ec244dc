// MediaManager - media library stored in a GitHub repository
// Images, videos and audio committed through the repository contents API

pub mod catalog;
pub mod config;
pub mod media;
pub mod providers;
pub mod repository;
pub mod session_store;
pub mod upload;

#[cfg(test)]
mod test_support;

pub use catalog::{filter, Catalog, DeleteOutcome, FileEntry, EMPTY_CATALOG_MESSAGE};
pub use config::{AppConfig, ConfigError};
pub use media::{Category, MediaType};
pub use providers::{ContentApi, GitHubFactory, ProviderError, ProviderFactory};
pub use repository::RepositoryClient;
pub use session_store::{Session, SessionError, SessionFile, SessionStore};
pub use upload::{BatchReport, LocalFile, UploadQueue, UploadStatus, UploadWorkflow};

/// Install the stderr log subscriber; later calls are no-ops
pub fn init_logging(level: tracing::Level) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
