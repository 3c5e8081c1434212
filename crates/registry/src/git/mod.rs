//! Local clones of registry repositories.
//!
//! [`GitClient`] owns the cache layout (`<cache>/<registry name>`) and the
//! clone/update/remove lifecycle. The actual version control work goes through
//! a [`GitBackend`], so the external `git` binary and libgit2 are
//! interchangeable.

mod cli;
#[cfg(feature = "libgit2")]
mod libgit;

pub use cli::GitCli;
#[cfg(feature = "libgit2")]
pub use libgit::LibGit;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::{GitError, RegistryError, Result};
use crate::logging::Logger;
use crate::models::{CommitInfo, RepositoryInfo};

/// Narrow version control capability used by [`GitClient`].
#[async_trait]
pub trait GitBackend: Send + Sync {
    /// Short identifier used in diagnostics.
    fn name(&self) -> &'static str;

    /// Depth-1 clone of `url` into `dest`, which must not exist yet.
    async fn clone_shallow(&self, url: &str, dest: &Path) -> std::result::Result<(), GitError>;

    /// Depth-1 pull inside an existing working copy.
    async fn pull_shallow(&self, repo: &Path) -> std::result::Result<(), GitError>;

    async fn remote_url(&self, repo: &Path) -> std::result::Result<String, GitError>;

    async fn last_commit(&self, repo: &Path) -> std::result::Result<CommitInfo, GitError>;
}

pub struct GitClient {
    cache_dir: PathBuf,
    backend: Arc<dyn GitBackend>,
    log: Logger,
}

impl GitClient {
    pub fn new(cache_dir: impl Into<PathBuf>, backend: Arc<dyn GitBackend>, log: Logger) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            backend,
            log,
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn repository_path(&self, name: &str) -> PathBuf {
        self.cache_dir.join(name)
    }

    /// True iff `<cache>/<name>/.git` exists and is a directory.
    pub async fn is_repository_cloned(&self, name: &str) -> bool {
        match tokio::fs::metadata(self.repository_path(name).join(".git")).await {
            Ok(meta) => meta.is_dir(),
            Err(_) => false,
        }
    }

    /// Shallow clone into the cache, or update when the directory already exists.
    pub async fn clone_repository(&self, url: &str, name: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| RegistryError::io("create cache directory", &self.cache_dir, e))?;

        let target = self.repository_path(name);
        if tokio::fs::try_exists(&target).await.unwrap_or(false) {
            self.log.in_scope(|| {
                debug!(
                    "Repository already exists, updating: {}",
                    target.display()
                )
            });
            self.update_repository(name).await?;
            return Ok(target);
        }

        self.log.in_scope(|| {
            info!(
                "Cloning repository {} to {} ({})",
                url,
                target.display(),
                self.backend.name()
            )
        });
        self.backend.clone_shallow(url, &target).await?;

        self.log.in_scope(|| debug!("Repository cloned successfully: {}", target.display()));
        Ok(target)
    }

    /// Shallow pull inside `<cache>/<name>`.
    pub async fn update_repository(&self, name: &str) -> Result<()> {
        let path = self.repository_path(name);
        self.log.in_scope(|| debug!("Updating repository: {}", path.display()));

        self.backend.pull_shallow(&path).await?;

        self.log.in_scope(|| debug!("Repository updated successfully: {}", path.display()));
        Ok(())
    }

    /// Delete a cloned repository. Fails with `RepositoryNotCloned` when there
    /// is no working copy, so a second call is a clean error.
    pub async fn remove_repository(&self, name: &str) -> Result<()> {
        let path = self.repository_path(name);
        if !self.is_repository_cloned(name).await {
            return Err(RegistryError::RepositoryNotCloned {
                name: name.to_string(),
                path,
            });
        }

        self.log.in_scope(|| info!("Removing repository: {}", path.display()));
        tokio::fs::remove_dir_all(&path)
            .await
            .map_err(|e| RegistryError::io("remove repository", &path, e))
    }

    /// Delete whatever sits at `<cache>/<name>`, working copy or not.
    /// Returns whether anything was removed.
    pub async fn discard_repository(&self, name: &str) -> Result<bool> {
        let path = self.repository_path(name);
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => {
                self.log.in_scope(|| debug!("Discarded cache directory {}", path.display()));
                Ok(true)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(RegistryError::io("discard cache directory", &path, err)),
        }
    }

    /// Best-effort metadata of a cached working copy. Never fails: fields that
    /// cannot be read stay empty.
    pub async fn repository_info(&self, name: &str) -> RepositoryInfo {
        let path = self.repository_path(name);
        let mut info = RepositoryInfo::new(name, &path);

        if !self.is_repository_cloned(name).await {
            self.log
                .in_scope(|| warn!("Repository '{}' is not cloned at {}", name, path.display()));
            return info;
        }

        match self.backend.remote_url(&path).await {
            Ok(url) => info.remote_url = url,
            Err(err) => self
                .log
                .in_scope(|| debug!("Could not read remote URL of '{}': {}", name, err)),
        }

        match self.backend.last_commit(&path).await {
            Ok(commit) => info = info.with_commit(commit),
            Err(err) => self
                .log
                .in_scope(|| debug!("Could not read last commit of '{}': {}", name, err)),
        }

        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingBackend {
        clones: AtomicUsize,
        pulls: AtomicUsize,
    }

    #[async_trait]
    impl GitBackend for RecordingBackend {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn clone_shallow(
            &self,
            _url: &str,
            dest: &Path,
        ) -> std::result::Result<(), GitError> {
            self.clones.fetch_add(1, Ordering::SeqCst);
            std::fs::create_dir_all(dest.join(".git")).unwrap();
            Ok(())
        }

        async fn pull_shallow(&self, _repo: &Path) -> std::result::Result<(), GitError> {
            self.pulls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn remote_url(&self, _repo: &Path) -> std::result::Result<String, GitError> {
            Ok("https://github.com/shellify/core".to_string())
        }

        async fn last_commit(&self, _repo: &Path) -> std::result::Result<CommitInfo, GitError> {
            Err(GitError::UnexpectedOutput {
                operation: "log",
                output: String::new(),
            })
        }
    }

    fn client(dir: &TempDir) -> (GitClient, Arc<RecordingBackend>) {
        let backend = Arc::new(RecordingBackend::default());
        let client = GitClient::new(dir.path().join("cache"), backend.clone(), Logger::disabled());
        (client, backend)
    }

    #[tokio::test]
    async fn test_clone_then_update() {
        let dir = TempDir::new().unwrap();
        let (git, backend) = client(&dir);

        assert!(!git.is_repository_cloned("core").await);
        let path = git
            .clone_repository("https://github.com/shellify/core", "core")
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("cache/core"));
        assert!(git.is_repository_cloned("core").await);

        git.clone_repository("https://github.com/shellify/core", "core")
            .await
            .unwrap();
        assert_eq!(backend.clones.load(Ordering::SeqCst), 1);
        assert_eq!(backend.pulls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_remove_twice_fails_cleanly() {
        let dir = TempDir::new().unwrap();
        let (git, _) = client(&dir);
        git.clone_repository("https://github.com/shellify/core", "core")
            .await
            .unwrap();

        git.remove_repository("core").await.unwrap();
        assert!(!git.repository_path("core").exists());

        let err = git.remove_repository("core").await.unwrap_err();
        assert!(matches!(err, RegistryError::RepositoryNotCloned { .. }));
    }

    #[tokio::test]
    async fn test_discard_handles_non_repository_leftovers() {
        let dir = TempDir::new().unwrap();
        let (git, _) = client(&dir);
        std::fs::create_dir_all(git.repository_path("partial").join("modules")).unwrap();

        assert!(!git.is_repository_cloned("partial").await);
        assert!(git.discard_repository("partial").await.unwrap());
        assert!(!git.discard_repository("partial").await.unwrap());
    }

    #[tokio::test]
    async fn test_repository_info_is_best_effort() {
        let dir = TempDir::new().unwrap();
        let (git, _) = client(&dir);

        let missing = git.repository_info("core").await;
        assert_eq!(missing.name, "core");
        assert!(missing.remote_url.is_empty());

        git.clone_repository("https://github.com/shellify/core", "core")
            .await
            .unwrap();
        let info = git.repository_info("core").await;
        assert_eq!(info.remote_url, "https://github.com/shellify/core");
        assert!(info.last_commit_hash.is_empty());
        assert!(info.last_commit_time.is_none());
    }
}
