//! Durable list of registered registries.
//!
//! The whole list is rewritten on every save: serialized to a sibling `.tmp`
//! file, the previous file is copied to `.backup`, then the temporary file is
//! renamed into place.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::{RegistryError, Result};
use crate::logging::Logger;
use crate::models::Registry;

pub struct RegistryListStore {
    path: PathBuf,
    backup_path: PathBuf,
    temp_path: PathBuf,
    log: Logger,
}

impl RegistryListStore {
    pub fn new(path: impl Into<PathBuf>, log: Logger) -> Self {
        let path = path.into();
        Self {
            backup_path: sibling(&path, "backup"),
            temp_path: sibling(&path, "tmp"),
            path,
            log,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    /// Load the list. A missing file is an empty list; an unparseable file
    /// falls back to the backup.
    pub async fn load(&self) -> Result<Vec<Registry>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                self.log.in_scope(|| {
                    info!("No registry list at {}, starting empty", self.path.display())
                });
                return Ok(Vec::new());
            }
            Err(err) => return Err(RegistryError::io("read registry list", &self.path, err)),
        };

        match serde_json::from_str::<Vec<Registry>>(&content) {
            Ok(registries) => {
                self.log.in_scope(|| debug!("Loaded {} registries", registries.len()));
                Ok(registries)
            }
            Err(err) => {
                self.log.in_scope(|| {
                    warn!(
                        "Failed to parse registry list {}: {}, checking backup",
                        self.path.display(),
                        err
                    )
                });
                self.load_backup(err.to_string()).await
            }
        }
    }

    async fn load_backup(&self, reason: String) -> Result<Vec<Registry>> {
        let corrupted = || RegistryError::CorruptedRegistryList {
            path: self.path.clone(),
            reason: reason.clone(),
        };

        let content = match fs::read_to_string(&self.backup_path).await {
            Ok(content) => content,
            Err(_) => return Err(corrupted()),
        };

        let registries: Vec<Registry> = serde_json::from_str(&content).map_err(|_| corrupted())?;
        self.log.in_scope(|| {
            info!(
                "Restored {} registries from backup {}",
                registries.len(),
                self.backup_path.display()
            )
        });
        Ok(registries)
    }

    /// Rewrite the full list.
    pub async fn save(&self, registries: &[Registry]) -> Result<()> {
        let content = serde_json::to_string_pretty(registries)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| RegistryError::io("create config directory", parent, e))?;
        }

        fs::write(&self.temp_path, content)
            .await
            .map_err(|e| RegistryError::io("write registry list", &self.temp_path, e))?;

        if fs::try_exists(&self.path).await.unwrap_or(false) {
            if let Err(e) = fs::copy(&self.path, &self.backup_path).await {
                self.log.in_scope(|| warn!("Failed to create registry list backup: {}", e));
            }
        }

        fs::rename(&self.temp_path, &self.path)
            .await
            .map_err(|e| RegistryError::io("replace registry list", &self.path, e))?;

        self.log.in_scope(|| {
            debug!(
                "Saved {} registries to {}",
                registries.len(),
                self.path.display()
            )
        });
        Ok(())
    }
}

fn sibling(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(extension);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> RegistryListStore {
        RegistryListStore::new(dir.path().join("registries.json"), Logger::disabled())
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(store(&dir).load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_writes_pretty_json_and_backup() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let first = vec![Registry::new("core", "https://github.com/shellify/core")];
        store.save(&first).await.unwrap();
        assert!(!store.backup_path().exists());

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert!(content.contains("\n  {"));

        let mut second = first.clone();
        second.push(Registry::new("extra", "https://github.com/shellify/extra"));
        store.save(&second).await.unwrap();

        let backup: Vec<Registry> =
            serde_json::from_str(&std::fs::read_to_string(store.backup_path()).unwrap()).unwrap();
        assert_eq!(backup, first);
        assert!(!dir.path().join("registries.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupted_list_falls_back_to_backup() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let registries = vec![Registry::new("core", "https://github.com/shellify/core")];
        store.save(&registries).await.unwrap();
        store.save(&registries).await.unwrap();
        std::fs::write(store.path(), "[{ truncated").unwrap();

        assert_eq!(store.load().await.unwrap(), registries);

        std::fs::remove_file(store.backup_path()).unwrap();
        let err = store.load().await.unwrap_err();
        assert!(matches!(err, RegistryError::CorruptedRegistryList { .. }));
    }
}
