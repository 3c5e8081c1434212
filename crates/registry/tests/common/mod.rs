#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;

use shellify_registry::{
    ClientConfig, CommitInfo, GitBackend, GitError, Logger, RegistryClient, UrlValidator,
};

const ORIGIN_FILE: &str = "origin";

/// Git backend that "clones" local fixture trees registered per URL.
#[derive(Default)]
pub struct FixtureBackend {
    sources: Mutex<HashMap<String, PathBuf>>,
    plain_files: Mutex<HashSet<String>>,
    clones: AtomicUsize,
    pulls: AtomicUsize,
}

impl FixtureBackend {
    pub fn serve(&self, url: &str, tree: &Path) {
        self.sources
            .lock()
            .unwrap()
            .insert(url.to_string(), tree.to_path_buf());
    }

    /// Make clones of `url` produce a regular file instead of a directory.
    pub fn serve_plain_file(&self, url: &str) {
        self.plain_files.lock().unwrap().insert(url.to_string());
    }

    pub fn clones(&self) -> usize {
        self.clones.load(Ordering::SeqCst)
    }

    pub fn pulls(&self) -> usize {
        self.pulls.load(Ordering::SeqCst)
    }

    fn source(&self, url: &str, dest: &Path) -> Result<PathBuf, GitError> {
        self.sources
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| GitError::CommandFailed {
                operation: "clone",
                path: dest.to_path_buf(),
                status: "exit status: 128".to_string(),
                output: format!("fatal: repository '{url}' not found"),
            })
    }
}

#[async_trait]
impl GitBackend for FixtureBackend {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn clone_shallow(&self, url: &str, dest: &Path) -> Result<(), GitError> {
        self.clones.fetch_add(1, Ordering::SeqCst);
        if self.plain_files.lock().unwrap().contains(url) {
            fs::write(dest, url).unwrap();
            return Ok(());
        }
        let source = self.source(url, dest)?;
        copy_tree(&source, dest);
        fs::create_dir_all(dest.join(".git")).unwrap();
        fs::write(dest.join(".git").join(ORIGIN_FILE), url).unwrap();
        Ok(())
    }

    async fn pull_shallow(&self, repo: &Path) -> Result<(), GitError> {
        self.pulls.fetch_add(1, Ordering::SeqCst);
        let url = fs::read_to_string(repo.join(".git").join(ORIGIN_FILE)).unwrap();
        let source = self.source(&url, repo)?;

        for entry in fs::read_dir(repo).unwrap() {
            let entry = entry.unwrap();
            if entry.file_name() == ".git" {
                continue;
            }
            let path = entry.path();
            if path.is_dir() {
                fs::remove_dir_all(path).unwrap();
            } else {
                fs::remove_file(path).unwrap();
            }
        }
        copy_tree(&source, repo);
        Ok(())
    }

    async fn remote_url(&self, repo: &Path) -> Result<String, GitError> {
        fs::read_to_string(repo.join(".git").join(ORIGIN_FILE)).map_err(|source| {
            GitError::Spawn {
                operation: "remote",
                source,
            }
        })
    }

    async fn last_commit(&self, _repo: &Path) -> Result<CommitInfo, GitError> {
        Ok(CommitInfo {
            hash: "0123456789abcdef".to_string(),
            message: "Fixture commit".to_string(),
            time: None,
        })
    }
}

fn copy_tree(from: &Path, to: &Path) {
    fs::create_dir_all(to).unwrap();
    for entry in fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        let target = to.join(entry.file_name());
        if entry.path().is_dir() {
            copy_tree(&entry.path(), &target);
        } else {
            fs::copy(entry.path(), target).unwrap();
        }
    }
}

pub fn write_json(path: &Path, value: &Value) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
}

/// A module declared by a fixture registry: (name, description, shell).
pub type ModuleSpec<'a> = (&'a str, &'a str, Option<&'a str>);

/// Write a valid registry tree with the given modules under `modules/`.
pub fn write_registry(root: &Path, name: &str, modules: &[ModuleSpec<'_>]) {
    let mut entries = serde_json::Map::new();
    for (module, description, shell) in modules {
        let mut entry = json!({
            "name": module,
            "description": description,
            "version": "1.0.0",
            "path": format!("modules/{module}"),
        });
        if let Some(shell) = shell {
            entry["shell"] = json!(shell);
        }
        entries.insert(module.to_string(), entry);

        write_json(
            &root.join("modules").join(module).join("module.json"),
            &json!({"name": module, "description": description, "type": "aliases"}),
        );
    }

    write_json(
        &root.join("index.json"),
        &json!({
            "name": name,
            "description": format!("{name} registry"),
            "version": "1.0.0",
            "modules": entries,
        }),
    );
}

/// Break an existing fixture registry by giving its index a non-semver version.
pub fn break_registry(root: &Path) {
    let path = root.join("index.json");
    let mut index: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    index["version"] = json!("1.0");
    write_json(&path, &index);
}

pub struct Harness {
    pub home: TempDir,
    pub sources: TempDir,
    pub backend: Arc<FixtureBackend>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            home: TempDir::new().unwrap(),
            sources: TempDir::new().unwrap(),
            backend: Arc::new(FixtureBackend::default()),
        }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::in_dir(self.home.path())
    }

    /// Create a valid fixture tree and serve it at `url`.
    pub fn publish(&self, url: &str, name: &str, modules: &[ModuleSpec<'_>]) -> PathBuf {
        let tree = self.sources.path().join(name);
        write_registry(&tree, name, modules);
        self.backend.serve(url, &tree);
        tree
    }

    pub async fn client(&self) -> RegistryClient {
        RegistryClient::open_with(
            self.config(),
            self.backend.clone(),
            UrlValidator::format_only(Logger::disabled()),
            Logger::disabled(),
        )
        .await
        .unwrap()
    }

    pub fn cache_path(&self, name: &str) -> PathBuf {
        self.config().cache_dir.join(name)
    }

    pub fn registries_file(&self) -> PathBuf {
        self.config().registries_file
    }
}
