//! Registry tree certification.
//!
//! A registry tree passes when its `index.json` is well formed, every module it
//! declares is valid and has a readable `module.json`, and the optional
//! top-level `modules` entry is a directory. Checks run in that order and stop
//! at the first failure.

use std::io;
use std::path::{Component, Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use super::{check_slug, is_semantic_version};
use crate::error::{ModuleError, StructureError};
use crate::logging::Logger;
use crate::models::{Module, ModuleType, RegistryIndex, Shell};

pub const INDEX_FILE: &str = "index.json";
pub const MODULE_MANIFEST_FILE: &str = "module.json";
pub const MODULES_DIR: &str = "modules";

type StructureResult<T> = std::result::Result<T, StructureError>;
type ModuleResult<T> = std::result::Result<T, ModuleError>;

/// Read and parse `index.json` under `root` without validating it.
pub async fn read_index(root: &Path) -> StructureResult<RegistryIndex> {
    let path = root.join(INDEX_FILE);
    let data = match tokio::fs::read(&path).await {
        Ok(data) => data,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(StructureError::IndexNotFound { path })
        }
        Err(source) => return Err(StructureError::Unreadable { path, source }),
    };

    serde_json::from_slice(&data).map_err(|source| StructureError::InvalidJson { path, source })
}

pub struct StructureValidator {
    root: PathBuf,
    log: Logger,
}

impl StructureValidator {
    pub fn new(root: impl Into<PathBuf>, log: Logger) -> Self {
        Self {
            root: root.into(),
            log,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Certify the tree and return its parsed index.
    pub async fn validate(&self) -> StructureResult<RegistryIndex> {
        self.log.in_scope(|| {
            debug!(
                "Starting registry structure validation for {}",
                self.root.display()
            )
        });

        let index = self.validate_index().await?;
        self.validate_modules(&index).await?;
        self.validate_directory_shape().await?;

        self.log.in_scope(|| {
            debug!(
                "Registry '{}' v{} passed structure validation ({} modules)",
                index.name,
                index.version,
                index.modules.len()
            )
        });
        Ok(index)
    }

    async fn validate_index(&self) -> StructureResult<RegistryIndex> {
        let index = read_index(&self.root).await?;

        if index.name.trim().is_empty() {
            return Err(StructureError::MissingField { field: "name" });
        }
        if index.description.trim().is_empty() {
            return Err(StructureError::MissingField {
                field: "description",
            });
        }
        if index.version.trim().is_empty() {
            return Err(StructureError::MissingField { field: "version" });
        }
        if !is_semantic_version(&index.version) {
            return Err(StructureError::InvalidVersion {
                version: index.version.clone(),
            });
        }
        check_slug(&index.name, 3, 50).map_err(|reason| StructureError::InvalidName {
            name: index.name.clone(),
            reason,
        })?;

        Ok(index)
    }

    async fn validate_modules(&self, index: &RegistryIndex) -> StructureResult<()> {
        if index.modules.is_empty() {
            return Err(StructureError::NoModules {
                registry: index.name.clone(),
            });
        }

        self.log.in_scope(|| debug!("Validating {} modules", index.modules.len()));

        for (key, module) in &index.modules {
            self.validate_module(key, module)
                .await
                .map_err(|source| StructureError::Module {
                    key: key.clone(),
                    source,
                })?;
            self.log.in_scope(|| debug!("Module '{}' validation passed", key));
        }
        Ok(())
    }

    async fn validate_module(&self, key: &str, module: &Module) -> ModuleResult<()> {
        if module.name.trim().is_empty() {
            return Err(ModuleError::MissingField { field: "name" });
        }
        if module.name != key {
            return Err(ModuleError::NameMismatch {
                name: module.name.clone(),
                key: key.to_string(),
            });
        }
        if module.description.trim().is_empty() {
            return Err(ModuleError::MissingField {
                field: "description",
            });
        }
        let path = match module.path.as_deref() {
            Some(path) if !path.trim().is_empty() => path,
            _ => return Err(ModuleError::MissingField { field: "path" }),
        };

        check_slug(&module.name, 2, 30).map_err(|reason| ModuleError::InvalidName {
            name: module.name.clone(),
            reason,
        })?;

        if let Some(version) = module.declared_version() {
            if !is_semantic_version(version) {
                return Err(ModuleError::InvalidVersion {
                    version: version.to_string(),
                });
            }
        }

        if let Some(shell) = module.declared_shell() {
            if Shell::from_name(shell).is_none() {
                return Err(ModuleError::UnsupportedShell {
                    shell: shell.to_string(),
                });
            }
        }

        self.validate_module_path(path).await
    }

    async fn validate_module_path(&self, relative: &str) -> ModuleResult<()> {
        let escapes = Path::new(relative).components().any(|component| {
            matches!(
                component,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes {
            return Err(ModuleError::PathEscapesRegistry {
                path: relative.to_string(),
            });
        }

        let dir = self.root.join(relative);
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => {}
            _ => {
                return Err(ModuleError::DirectoryMissing {
                    path: relative.to_string(),
                })
            }
        }

        let manifest = dir.join(MODULE_MANIFEST_FILE);
        let data = match tokio::fs::read(&manifest).await {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(ModuleError::ManifestMissing {
                    path: relative.to_string(),
                })
            }
            Err(source) => {
                return Err(ModuleError::ManifestUnreadable {
                    path: manifest,
                    source,
                })
            }
        };

        validate_manifest(&manifest, &data)
    }

    async fn validate_directory_shape(&self) -> StructureResult<()> {
        let modules_dir = self.root.join(MODULES_DIR);
        match tokio::fs::metadata(&modules_dir).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(StructureError::ModulesNotDirectory { path: modules_dir }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                self.log.in_scope(|| {
                    debug!("No top-level modules directory, modules live at the registry root")
                });
                Ok(())
            }
            Err(source) => Err(StructureError::Unreadable {
                path: modules_dir,
                source,
            }),
        }
    }
}

fn validate_manifest(path: &Path, data: &[u8]) -> ModuleResult<()> {
    let value: Value =
        serde_json::from_slice(data).map_err(|source| ModuleError::ManifestInvalidJson {
            path: path.to_path_buf(),
            source,
        })?;

    let Value::Object(fields) = value else {
        return Err(ModuleError::ManifestNotObject {
            path: path.to_path_buf(),
        });
    };

    for field in ["name", "description", "type"] {
        if !matches!(fields.get(field), Some(Value::String(_))) {
            return Err(ModuleError::ManifestField {
                path: path.to_path_buf(),
                field,
            });
        }
    }

    if let Some(Value::String(kind)) = fields.get("type") {
        if ModuleType::from_name(kind).is_none() {
            return Err(ModuleError::UnsupportedType {
                path: path.to_path_buf(),
                kind: kind.clone(),
            });
        }
    }

    Ok(())
}
