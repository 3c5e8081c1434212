use std::path::Path;

use async_trait::async_trait;
use chrono::DateTime;
use git2::{build::RepoBuilder, FetchOptions, Repository, ResetType};

use super::GitBackend;
use crate::error::GitError;
use crate::models::CommitInfo;

/// Backend using libgit2, so no `git` executable is required.
#[derive(Debug, Clone, Copy, Default)]
pub struct LibGit;

impl LibGit {
    pub fn new() -> Self {
        Self
    }
}

fn library_error(operation: &'static str, target: &Path) -> impl Fn(git2::Error) -> GitError + '_ {
    move |source| GitError::Library {
        operation,
        target: target.display().to_string(),
        source,
    }
}

async fn blocking<T, F>(operation: &'static str, f: F) -> Result<T, GitError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, GitError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| GitError::Interrupted {
            operation,
            reason: err.to_string(),
        })?
}

fn shallow_fetch_options<'a>() -> FetchOptions<'a> {
    let mut options = FetchOptions::new();
    options.depth(1);
    options
}

#[async_trait]
impl GitBackend for LibGit {
    fn name(&self) -> &'static str {
        "libgit2"
    }

    async fn clone_shallow(&self, url: &str, dest: &Path) -> Result<(), GitError> {
        let url = url.to_string();
        let dest = dest.to_path_buf();
        blocking("clone", move || {
            RepoBuilder::new()
                .fetch_options(shallow_fetch_options())
                .clone(&url, &dest)
                .map(|_| ())
                .map_err(|source| GitError::Library {
                    operation: "clone",
                    target: url.clone(),
                    source,
                })
        })
        .await
    }

    async fn pull_shallow(&self, repo: &Path) -> Result<(), GitError> {
        let path = repo.to_path_buf();
        blocking("pull", move || {
            let err = library_error("pull", &path);
            let repo = Repository::open(&path).map_err(&err)?;

            let branch = {
                let head = repo.head().map_err(&err)?;
                head.shorthand()
                    .map(str::to_string)
                    .ok_or_else(|| GitError::UnexpectedOutput {
                        operation: "pull",
                        output: "HEAD is not a named branch".to_string(),
                    })?
            };

            let tracking = format!("refs/remotes/origin/{branch}");
            let refspec = format!("+refs/heads/{branch}:{tracking}");
            let mut remote = repo.find_remote("origin").map_err(&err)?;
            remote
                .fetch(&[refspec.as_str()], Some(&mut shallow_fetch_options()), None)
                .map_err(&err)?;

            let target = repo.revparse_single(&tracking).map_err(&err)?;
            repo.reset(&target, ResetType::Hard, None).map_err(&err)?;
            Ok(())
        })
        .await
    }

    async fn remote_url(&self, repo: &Path) -> Result<String, GitError> {
        let path = repo.to_path_buf();
        blocking("remote", move || {
            let err = library_error("remote", &path);
            let repo = Repository::open(&path).map_err(&err)?;
            let remote = repo.find_remote("origin").map_err(&err)?;
            Ok(remote.url().unwrap_or_default().to_string())
        })
        .await
    }

    async fn last_commit(&self, repo: &Path) -> Result<CommitInfo, GitError> {
        let path = repo.to_path_buf();
        blocking("log", move || {
            let err = library_error("log", &path);
            let repo = Repository::open(&path).map_err(&err)?;
            let commit = repo
                .head()
                .and_then(|head| head.peel_to_commit())
                .map_err(&err)?;

            Ok(CommitInfo {
                hash: commit.id().to_string(),
                message: commit.summary().unwrap_or_default().to_string(),
                time: DateTime::from_timestamp(commit.time().seconds(), 0),
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_failure_names_the_path() {
        let dir = TempDir::new().unwrap();
        let err = LibGit::new().remote_url(dir.path()).await.unwrap_err();

        assert!(matches!(err, GitError::Library { operation: "remote", .. }));
        assert!(err.to_string().contains(&dir.path().display().to_string()));
    }
}
