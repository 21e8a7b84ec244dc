//! In-memory content provider used by unit tests

use async_trait::async_trait;
use base64::Engine;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::providers::{
    CommitInfo, ContentApi, ContentEntry, DeleteContentRequest, ProviderError, ProviderFactory,
    PutContentRequest, RemoteContent, RepositoryInfo,
};
use secrecy::{ExposeSecret, SecretString};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    Repository,
    Get(String),
    Put(String),
    Delete(String),
}

#[derive(Debug, Clone)]
struct StoredFile {
    sha: String,
    content: String,
    size: u64,
}

#[derive(Default)]
struct State {
    files: BTreeMap<String, StoredFile>,
    calls: Vec<ApiCall>,
    puts: Vec<(String, PutContentRequest)>,
    deletes: Vec<(String, DeleteContentRequest)>,
    failing_gets: HashSet<String>,
    failing_puts: HashSet<String>,
    conflicting_puts: HashSet<String>,
}

/// Repository held in memory; directories exist when a file lives under them
pub struct MemoryContentApi {
    owner: String,
    repo: String,
    token_valid: bool,
    next_sha: AtomicUsize,
    state: Mutex<State>,
}

impl MemoryContentApi {
    pub fn new(owner: &str, repo: &str) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            token_valid: true,
            next_sha: AtomicUsize::new(1),
            state: Mutex::new(State::default()),
        }
    }

    pub fn rejecting_token(mut self) -> Self {
        self.token_valid = false;
        self
    }

    fn fresh_sha(&self) -> String {
        format!("sha-{}", self.next_sha.fetch_add(1, Ordering::SeqCst))
    }

    /// Store a file directly and return its content hash
    pub fn seed_file(&self, path: &str, bytes: &[u8]) -> String {
        let sha = self.fresh_sha();
        let content = base64::engine::general_purpose::STANDARD.encode(bytes);
        self.state.lock().unwrap().files.insert(
            path.to_string(),
            StoredFile {
                sha: sha.clone(),
                content,
                size: bytes.len() as u64,
            },
        );
        sha
    }

    pub fn fail_get(&self, path: &str) {
        self.state.lock().unwrap().failing_gets.insert(path.to_string());
    }

    pub fn fail_put(&self, path: &str) {
        self.state.lock().unwrap().failing_puts.insert(path.to_string());
    }

    pub fn conflict_on_put(&self, path: &str) {
        self.state.lock().unwrap().conflicting_puts.insert(path.to_string());
    }

    pub fn has_file(&self, path: &str) -> bool {
        self.state.lock().unwrap().files.contains_key(path)
    }

    pub fn file_content(&self, path: &str) -> Option<String> {
        self.state.lock().unwrap().files.get(path).map(|f| f.content.clone())
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn puts(&self) -> Vec<(String, PutContentRequest)> {
        self.state.lock().unwrap().puts.clone()
    }

    pub fn deletes(&self) -> Vec<(String, DeleteContentRequest)> {
        self.state.lock().unwrap().deletes.clone()
    }

    fn check_access(&self, owner: &str, repo: &str) -> Result<(), ProviderError> {
        if !self.token_valid {
            return Err(ProviderError::AuthenticationFailed("Bad credentials".to_string()));
        }
        if owner != self.owner || repo != self.repo {
            return Err(ProviderError::NotFound(format!("{}/{}", owner, repo)));
        }
        Ok(())
    }
}

fn name_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[async_trait]
impl ContentApi for MemoryContentApi {
    fn display_name(&self) -> String {
        "Memory".to_string()
    }

    async fn get_repository(&self, owner: &str, repo: &str) -> Result<RepositoryInfo, ProviderError> {
        self.state.lock().unwrap().calls.push(ApiCall::Repository);
        self.check_access(owner, repo)?;
        Ok(RepositoryInfo {
            full_name: format!("{}/{}", owner, repo),
            default_branch: "main".to_string(),
            private: false,
        })
    }

    async fn get_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        _branch: &str,
    ) -> Result<RemoteContent, ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ApiCall::Get(path.to_string()));
        self.check_access(owner, repo)?;

        if state.failing_gets.contains(path) {
            return Err(ProviderError::NetworkError("connection reset".to_string()));
        }
        if let Some(file) = state.files.get(path) {
            return Ok(RemoteContent::File(ContentEntry::file(
                name_of(path),
                path,
                &file.sha,
                file.size,
            )));
        }

        let prefix = format!("{}/", path.trim_end_matches('/'));
        let mut entries = Vec::new();
        let mut dirs = BTreeSet::new();
        for (file_path, file) in state.files.iter() {
            let Some(rest) = file_path.strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                None => entries.push(ContentEntry::file(rest, file_path, &file.sha, file.size)),
                Some((dir, _)) => {
                    dirs.insert(dir.to_string());
                }
            }
        }
        if entries.is_empty() && dirs.is_empty() {
            return Err(ProviderError::NotFound(path.to_string()));
        }
        for dir in dirs {
            entries.push(ContentEntry::directory(&dir, &format!("{}{}", prefix, dir), "sha-dir"));
        }
        Ok(RemoteContent::Directory(entries))
    }

    async fn put_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        request: &PutContentRequest,
    ) -> Result<CommitInfo, ProviderError> {
        let sha = self.fresh_sha();
        let mut state = self.state.lock().unwrap();
        state.calls.push(ApiCall::Put(path.to_string()));
        self.check_access(owner, repo)?;
        state.puts.push((path.to_string(), request.clone()));

        if state.failing_puts.contains(path) {
            return Err(ProviderError::ServerError("HTTP 500: boom".to_string()));
        }
        let current = state.files.get(path).map(|f| f.sha.clone());
        if state.conflicting_puts.contains(path) || current != request.sha {
            return Err(ProviderError::Conflict(format!("{} does not match", path)));
        }

        let size = base64::engine::general_purpose::STANDARD
            .decode(&request.content)
            .map(|b| b.len() as u64)
            .unwrap_or(request.content.len() as u64);
        state.files.insert(
            path.to_string(),
            StoredFile {
                sha: sha.clone(),
                content: request.content.clone(),
                size,
            },
        );
        Ok(CommitInfo {
            sha: format!("commit-{}", sha),
            content_sha: Some(sha),
        })
    }

    async fn delete_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        request: &DeleteContentRequest,
    ) -> Result<CommitInfo, ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ApiCall::Delete(path.to_string()));
        self.check_access(owner, repo)?;
        state.deletes.push((path.to_string(), request.clone()));

        match state.files.get(path) {
            None => return Err(ProviderError::NotFound(path.to_string())),
            Some(file) if file.sha != request.sha => {
                return Err(ProviderError::Conflict(format!("{} does not match", path)))
            }
            Some(_) => {}
        }
        state.files.remove(path);
        Ok(CommitInfo {
            sha: format!("commit-del-{}", request.sha),
            content_sha: None,
        })
    }
}

/// Hands out one shared [`MemoryContentApi`] and accepts a single token
pub struct MemoryFactory {
    pub api: Arc<MemoryContentApi>,
    pub accepted_token: String,
}

impl MemoryFactory {
    pub fn new(api: Arc<MemoryContentApi>, accepted_token: &str) -> Self {
        Self {
            api,
            accepted_token: accepted_token.to_string(),
        }
    }
}

impl ProviderFactory for MemoryFactory {
    fn create(&self, token: &SecretString) -> Result<Arc<dyn ContentApi>, ProviderError> {
        if token.expose_secret() != self.accepted_token {
            return Ok(Arc::new(MemoryContentApi::new("", "").rejecting_token()));
        }
        Ok(self.api.clone())
    }
}
