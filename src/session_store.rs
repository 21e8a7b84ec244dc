//! Session Store
//!
//! Holds the one active credential set (token, owner, repo, branch) and the
//! repository client built from it. The credential set is persisted as a
//! single JSON record standing in for the `media_app_auth` storage key.
//!
//! The token lives in a `SecretString`; it is only exposed to the provider
//! factory and when the record is written to disk (file mode 0600 on Unix).

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::DEFAULT_BRANCH;
use crate::providers::{ProviderError, ProviderFactory};
use crate::repository::RepositoryClient;

/// File holding the persisted credential set
pub const SESSION_FILENAME: &str = "media_app_auth.json";

pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid credentials or repository not found.";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid credentials or repository not found.")]
    InvalidCredentials,
    #[error("Not logged in")]
    NotLoggedIn,
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Active credential set
#[derive(Debug, Clone)]
pub struct Session {
    pub token: SecretString,
    pub owner: String,
    pub repo: String,
    pub branch: String,
}

impl Session {
    /// `owner/repo@branch`, for display
    pub fn describe(&self) -> String {
        format!("{}/{}@{}", self.owner, self.repo, self.branch)
    }
}

/// On-disk shape of [`Session`]
#[derive(Serialize, Deserialize)]
struct StoredSession {
    token: String,
    owner: String,
    repo: String,
    branch: String,
}

impl From<&Session> for StoredSession {
    fn from(session: &Session) -> Self {
        Self {
            token: session.token.expose_secret().to_string(),
            owner: session.owner.clone(),
            repo: session.repo.clone(),
            branch: session.branch.clone(),
        }
    }
}

impl From<StoredSession> for Session {
    fn from(stored: StoredSession) -> Self {
        Self {
            token: SecretString::from(stored.token),
            owner: stored.owner,
            repo: stored.repo,
            branch: stored.branch,
        }
    }
}

/// Durable storage for the single session record
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Session file inside `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(SESSION_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the record; `Ok(None)` when there is none
    pub fn load(&self) -> Result<Option<Session>, SessionError> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let stored: StoredSession = serde_json::from_slice(&data)
            .map_err(|e| SessionError::Serialization(e.to_string()))?;
        Ok(Some(stored.into()))
    }

    pub fn save(&self, session: &Session) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let data = serde_json::to_vec_pretty(&StoredSession::from(session))
            .map_err(|e| SessionError::Serialization(e.to_string()))?;
        std::fs::write(&self.path, &data)?;
        restrict_permissions(&self.path)?;
        Ok(())
    }

    /// Remove the record; a missing file is not an error
    pub fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn restrict_permissions(path: &Path) -> Result<(), SessionError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

struct ActiveSession {
    session: Session,
    client: RepositoryClient,
}

/// Single-session state: at most one credential set is active at a time
pub struct SessionStore {
    file: SessionFile,
    factory: Arc<dyn ProviderFactory>,
    default_branch: String,
    active: Option<ActiveSession>,
}

impl SessionStore {
    pub fn new(file: SessionFile, factory: Arc<dyn ProviderFactory>) -> Self {
        Self {
            file,
            factory,
            default_branch: DEFAULT_BRANCH.to_string(),
            active: None,
        }
    }

    /// Branch used when login is given none
    pub fn with_default_branch(mut self, branch: &str) -> Self {
        self.default_branch = branch.to_string();
        self
    }

    pub fn file(&self) -> &SessionFile {
        &self.file
    }

    /// Validate the credential set against the repository, then persist and activate it
    ///
    /// Every validation failure is reported as [`SessionError::InvalidCredentials`];
    /// the underlying cause is only logged. The previous state is kept on failure.
    pub async fn login(
        &mut self,
        token: SecretString,
        owner: &str,
        repo: &str,
        branch: Option<&str>,
    ) -> Result<&Session, SessionError> {
        let owner = owner.trim();
        let repo = repo.trim();
        if token.expose_secret().trim().is_empty() || owner.is_empty() || repo.is_empty() {
            debug!("Login rejected: token, owner and repo are all required");
            return Err(SessionError::InvalidCredentials);
        }

        let branch = branch
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .unwrap_or(self.default_branch.as_str())
            .to_string();

        let api = self.factory.create(&token).map_err(|e| {
            warn!("Login failed for {}/{}: {}", owner, repo, e);
            SessionError::InvalidCredentials
        })?;
        let client = RepositoryClient::new(api);

        if let Err(e) = client.test_connection(owner, repo).await {
            warn!("Login failed for {}/{}: {}", owner, repo, e);
            return Err(SessionError::InvalidCredentials);
        }

        let session = Session {
            token,
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch,
        };
        self.file.save(&session)?;
        info!("Logged in to {}", session.describe());

        let active = self.active.insert(ActiveSession { session, client });
        Ok(&active.session)
    }

    /// Activate the persisted session without re-validating the token
    ///
    /// Returns whether a session is now active. An unreadable record is
    /// treated as no session.
    pub fn restore_session(&mut self) -> Result<bool, SessionError> {
        let session = match self.file.load() {
            Ok(Some(session)) => session,
            Ok(None) => return Ok(false),
            Err(SessionError::Serialization(e)) => {
                warn!("Ignoring unreadable session at {:?}: {}", self.file.path(), e);
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        let client = RepositoryClient::new(self.factory.create(&session.token)?);
        debug!("Restored session {}", session.describe());
        self.active = Some(ActiveSession { session, client });
        Ok(true)
    }

    /// Clear durable storage and deactivate the session
    ///
    /// Clients obtained earlier keep the token they were built with.
    pub fn logout(&mut self) -> Result<(), SessionError> {
        self.file.clear()?;
        if let Some(active) = self.active.take() {
            info!("Logged out of {}", active.session.describe());
        }
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.active.is_some()
    }

    pub fn session(&self) -> Option<&Session> {
        self.active.as_ref().map(|a| &a.session)
    }

    pub fn client(&self) -> Option<RepositoryClient> {
        self.active.as_ref().map(|a| a.client.clone())
    }

    /// Active session and a client for it, or `NotLoggedIn`
    pub fn require(&self) -> Result<(Session, RepositoryClient), SessionError> {
        self.active
            .as_ref()
            .map(|a| (a.session.clone(), a.client.clone()))
            .ok_or(SessionError::NotLoggedIn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MemoryContentApi, MemoryFactory};
    use tempfile::TempDir;

    const TOKEN: &str = "ghp_valid";

    fn store_in(dir: &TempDir) -> (SessionStore, Arc<MemoryContentApi>) {
        let api = Arc::new(MemoryContentApi::new("octo", "media"));
        let factory = Arc::new(MemoryFactory::new(api.clone(), TOKEN));
        (SessionStore::new(SessionFile::in_dir(dir.path()), factory), api)
    }

    #[tokio::test]
    async fn test_login_persists_and_activates() {
        let dir = TempDir::new().unwrap();
        let (mut store, _) = store_in(&dir);

        let session = store
            .login(SecretString::from(TOKEN), "octo", "media", Some("dev"))
            .await
            .unwrap();
        assert_eq!(session.describe(), "octo/media@dev");
        assert!(store.is_authenticated());

        let raw = std::fs::read_to_string(dir.path().join(SESSION_FILENAME)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["token"], TOKEN);
        assert_eq!(value["owner"], "octo");
        assert_eq!(value["repo"], "media");
        assert_eq!(value["branch"], "dev");
    }

    #[tokio::test]
    async fn test_login_defaults_branch_to_main() {
        let dir = TempDir::new().unwrap();
        let (mut store, _) = store_in(&dir);
        let session = store
            .login(SecretString::from(TOKEN), "octo", "media", None)
            .await
            .unwrap();
        assert_eq!(session.branch, "main");
    }

    #[tokio::test]
    async fn test_login_bad_token_is_generic_error() {
        let dir = TempDir::new().unwrap();
        let (mut store, _) = store_in(&dir);
        let err = store
            .login(SecretString::from("nope"), "octo", "media", None)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidCredentials));
        assert_eq!(err.to_string(), INVALID_CREDENTIALS_MESSAGE);
        assert!(!store.is_authenticated());
        assert!(!dir.path().join(SESSION_FILENAME).exists());
    }

    #[tokio::test]
    async fn test_login_missing_repo_is_same_error() {
        let dir = TempDir::new().unwrap();
        let (mut store, _) = store_in(&dir);
        let err = store
            .login(SecretString::from(TOKEN), "octo", "elsewhere", None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), INVALID_CREDENTIALS_MESSAGE);
    }

    #[tokio::test]
    async fn test_failed_login_keeps_previous_session() {
        let dir = TempDir::new().unwrap();
        let (mut store, _) = store_in(&dir);
        store
            .login(SecretString::from(TOKEN), "octo", "media", None)
            .await
            .unwrap();
        let _ = store
            .login(SecretString::from("nope"), "octo", "media", None)
            .await;
        assert_eq!(store.session().unwrap().describe(), "octo/media@main");
    }

    #[tokio::test]
    async fn test_empty_fields_rejected_without_remote_call() {
        let dir = TempDir::new().unwrap();
        let (mut store, api) = store_in(&dir);
        let err = store
            .login(SecretString::from(TOKEN), "", "media", None)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidCredentials));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_restore_without_revalidation() {
        let dir = TempDir::new().unwrap();
        let (mut store, _) = store_in(&dir);
        store
            .login(SecretString::from(TOKEN), "octo", "media", None)
            .await
            .unwrap();

        let (mut restored, restored_api) = store_in(&dir);
        assert!(restored.restore_session().unwrap());
        assert_eq!(restored.session().unwrap().describe(), "octo/media@main");
        assert!(restored_api.calls().is_empty());
    }

    #[test]
    fn test_restore_with_nothing_stored() {
        let dir = TempDir::new().unwrap();
        let (mut store, _) = store_in(&dir);
        assert!(!store.restore_session().unwrap());
        assert!(!store.is_authenticated());
        assert!(matches!(store.require(), Err(SessionError::NotLoggedIn)));
    }

    #[test]
    fn test_restore_corrupt_record_is_logged_out() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SESSION_FILENAME), "{not json").unwrap();
        let (mut store, _) = store_in(&dir);
        assert!(!store.restore_session().unwrap());
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn test_logout_clears_storage_but_clients_keep_working() {
        let dir = TempDir::new().unwrap();
        let (mut store, _) = store_in(&dir);
        store
            .login(SecretString::from(TOKEN), "octo", "media", None)
            .await
            .unwrap();
        let client = store.client().unwrap();

        store.logout().unwrap();
        assert!(!store.is_authenticated());
        assert!(!dir.path().join(SESSION_FILENAME).exists());

        assert!(client.test_connection("octo", "media").await.is_ok());
    }

    #[test]
    fn test_logout_when_logged_out_is_ok() {
        let dir = TempDir::new().unwrap();
        let (mut store, _) = store_in(&dir);
        assert!(store.logout().is_ok());
    }

    #[test]
    fn test_session_debug_hides_token() {
        let session = Session {
            token: SecretString::from("ghp_supersecret"),
            owner: "octo".into(),
            repo: "media".into(),
            branch: "main".into(),
        };
        assert!(!format!("{:?}", session).contains("ghp_supersecret"));
    }

    #[cfg(unix)]
    #[test]
    fn test_session_file_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let file = SessionFile::in_dir(dir.path());
        file.save(&Session {
            token: SecretString::from(TOKEN),
            owner: "octo".into(),
            repo: "media".into(),
            branch: "main".into(),
        })
        .unwrap();
        let mode = std::fs::metadata(file.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
