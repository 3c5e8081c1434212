use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use chrono::DateTime;
use tokio::process::Command;

use super::GitBackend;
use crate::error::GitError;
use crate::models::CommitInfo;

const FIELD_SEPARATOR: char = '\u{1f}';

/// Backend driving the external `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

impl GitCli {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("git"),
        }
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Run git and return stdout. On a non-zero exit the error carries the
    /// combined stdout and stderr.
    async fn run(
        &self,
        operation: &'static str,
        path: &Path,
        workdir: Option<&Path>,
        args: &[&str],
    ) -> Result<String, GitError> {
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null());
        if let Some(dir) = workdir {
            command.current_dir(dir);
        }

        let output = command
            .output()
            .await
            .map_err(|source| GitError::Spawn { operation, source })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            let mut combined = stdout;
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(GitError::CommandFailed {
                operation,
                path: path.to_path_buf(),
                status: output.status.to_string(),
                output: combined.trim().to_string(),
            });
        }

        Ok(stdout)
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GitBackend for GitCli {
    fn name(&self) -> &'static str {
        "git"
    }

    async fn clone_shallow(&self, url: &str, dest: &Path) -> Result<(), GitError> {
        let dest_arg = dest.to_string_lossy();
        self.run(
            "clone",
            dest,
            None,
            &["clone", "--depth", "1", "--", url, dest_arg.as_ref()],
        )
        .await
        .map(|_| ())
    }

    /// Depth-1 fetch of the remote HEAD, then a hard reset onto it. Local
    /// changes in the working copy are discarded.
    async fn pull_shallow(&self, repo: &Path) -> Result<(), GitError> {
        self.run("pull", repo, Some(repo), &["fetch", "--depth", "1", "origin", "HEAD"]).await?;
        self.run("pull", repo, Some(repo), &["reset", "--hard", "FETCH_HEAD"])
            .await
            .map(|_| ())
    }

    async fn remote_url(&self, repo: &Path) -> Result<String, GitError> {
        let output = self
            .run("remote", repo, Some(repo), &["remote", "get-url", "origin"])
            .await?;
        Ok(output.trim().to_string())
    }

    async fn last_commit(&self, repo: &Path) -> Result<CommitInfo, GitError> {
        let output = self
            .run("log", repo, Some(repo), &["log", "-1", "--format=%H%x1f%s%x1f%ct"])
            .await?;
        parse_last_commit(&output)
    }
}

/// Parse `hash<US>subject<US>unix-seconds` as printed by `git log`.
fn parse_last_commit(output: &str) -> Result<CommitInfo, GitError> {
    let unexpected = || GitError::UnexpectedOutput {
        operation: "log",
        output: output.trim().to_string(),
    };

    let line = output.trim_end_matches(['\r', '\n']);
    let mut fields = line.splitn(3, FIELD_SEPARATOR);
    let (Some(hash), Some(message), Some(timestamp)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(unexpected());
    };
    if hash.is_empty() {
        return Err(unexpected());
    }

    let time = timestamp
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0));

    Ok(CommitInfo {
        hash: hash.to_string(),
        message: message.to_string(),
        time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_parse_last_commit() {
        let output = "3f2a9c1e\u{1f}Add fish support | prompt\u{1f}1714557600\n";

        let commit = parse_last_commit(output).unwrap();
        assert_eq!(commit.hash, "3f2a9c1e");
        assert_eq!(commit.message, "Add fish support | prompt");
        assert_eq!(
            commit.time,
            Some(Utc.timestamp_opt(1714557600, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_last_commit_keeps_partial_data() {
        let commit = parse_last_commit("abc\u{1f}msg\u{1f}later").unwrap();
        assert_eq!(commit.hash, "abc");
        assert!(commit.time.is_none());

        assert!(parse_last_commit("").is_err());
        assert!(parse_last_commit("only-a-hash\n").is_err());
    }

    fn git(dir: &Path, args: &[&str]) {
        let status = std::process::Command::new("git")
            .args(["-c", "user.name=Shellify Tests", "-c", "user.email=tests@shellify.dev"])
            .args(args)
            .current_dir(dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .unwrap();
        assert!(status.success(), "git {:?} failed", args);
    }

    fn commit(origin: &Path, content: &str) {
        std::fs::write(origin.join("index.json"), content).unwrap();
        git(origin, &["add", "index.json"]);
        git(origin, &["commit", "-q", "-m", content]);
    }

    #[tokio::test]
    async fn test_pull_follows_new_remote_commits() {
        let temp = tempfile::TempDir::new().unwrap();
        let origin = temp.path().join("origin");
        let clone = temp.path().join("clone");
        std::fs::create_dir_all(&origin).unwrap();
        git(&origin, &["init", "-q"]);
        commit(&origin, "1");

        let backend = GitCli::new();
        let url = format!("file://{}", origin.display());
        backend.clone_shallow(&url, &clone).await.unwrap();
        assert_eq!(std::fs::read_to_string(clone.join("index.json")).unwrap(), "1");

        commit(&origin, "2");
        backend.pull_shallow(&clone).await.unwrap();
        assert_eq!(std::fs::read_to_string(clone.join("index.json")).unwrap(), "2");

        commit(&origin, "3");
        backend.pull_shallow(&clone).await.unwrap();
        assert_eq!(std::fs::read_to_string(clone.join("index.json")).unwrap(), "3");

        let last = backend.last_commit(&clone).await.unwrap();
        assert_eq!(last.message, "3");
        assert_eq!(backend.remote_url(&clone).await.unwrap(), url);
    }

    #[tokio::test]
    async fn test_missing_binary_is_a_spawn_error() {
        let git = GitCli::with_program("/nonexistent/bin/git-for-tests");
        let err = git
            .remote_url(Path::new("."))
            .await
            .unwrap_err();
        assert!(matches!(err, GitError::Spawn { operation: "remote", .. }));
    }
}
