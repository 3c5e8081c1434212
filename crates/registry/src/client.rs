use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::ClientConfig;
use crate::error::{AddError, RegistryError, Result};
use crate::git::{GitBackend, GitCli, GitClient};
use crate::logging::Logger;
use crate::models::{Registry, RegistryIndex, RepositoryInfo};
use crate::store::RegistryListStore;
use crate::validation::{read_index, StructureValidator, UrlKind, UrlValidator};

/// Outcome of a successful [`RegistryClient::remove_registry`].
///
/// The record is gone either way; `cache_error` reports a cache directory that
/// could not be deleted.
#[derive(Debug)]
pub struct Removal {
    pub registry: Registry,
    pub cache_error: Option<RegistryError>,
}

/// Acquires, certifies and tracks registries.
///
/// The registry list is loaded once when the client is opened and rewritten in
/// full after every mutation.
pub struct RegistryClient {
    config: ClientConfig,
    registries: Vec<Registry>,
    store: RegistryListStore,
    git: GitClient,
    urls: UrlValidator,
    log: Logger,
}

impl RegistryClient {
    /// Open a client using the `git` executable and a networked URL validator.
    pub async fn open(config: ClientConfig, log: Logger) -> Result<Self> {
        let urls = UrlValidator::from_config(&config, log.clone())?;
        Self::open_with(config, Arc::new(GitCli::new()), urls, log).await
    }

    pub async fn open_with(
        config: ClientConfig,
        backend: Arc<dyn GitBackend>,
        urls: UrlValidator,
        log: Logger,
    ) -> Result<Self> {
        let store = RegistryListStore::new(&config.registries_file, log.clone());
        let registries = store.load().await?;
        let git = GitClient::new(&config.cache_dir, backend, log.clone());

        log.in_scope(|| {
            info!(
                "Registry client ready: {} registries, cache at {}",
                registries.len(),
                config.cache_dir.display()
            )
        });

        Ok(Self {
            config,
            registries,
            store,
            git,
            urls,
            log,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn logger(&self) -> &Logger {
        &self.log
    }

    pub fn git(&self) -> &GitClient {
        &self.git
    }

    /// The registered registries, in registration order.
    pub fn list_registries(&self) -> &[Registry] {
        &self.registries
    }

    /// Look up a registry by name or URL.
    pub fn get_registry(&self, identifier: &str) -> Result<&Registry> {
        self.registries
            .iter()
            .find(|registry| registry.matches(identifier))
            .ok_or_else(|| RegistryError::RegistryNotFound(identifier.to_string()))
    }

    /// Run the URL validator on its own.
    pub async fn validate_url(&self, url: &str) -> Result<UrlKind> {
        Ok(self.urls.validate_url(url).await?)
    }

    /// Register a new registry.
    ///
    /// Nothing is persisted unless the location passes the URL check, clones
    /// and certifies. Any clone left behind by a failure is discarded; a failed
    /// discard is reported in [`AddError::cleanup`] next to the real reason.
    pub async fn add_registry(
        &mut self,
        url: &str,
        name: &str,
    ) -> std::result::Result<Registry, AddError> {
        check_registry_name(name)?;

        if let Some(existing) = self.registries.iter().find(|r| r.url == url) {
            return Err(RegistryError::UrlAlreadyRegistered {
                url: url.to_string(),
                existing: existing.name.clone(),
            }
            .into());
        }
        if self.registries.iter().any(|r| r.name == name) {
            return Err(RegistryError::NameAlreadyRegistered(name.to_string()).into());
        }

        self.urls.validate_url(url).await?;

        // A directory without a registry record is left over from an
        // interrupted add and must not be mistaken for a working copy.
        if self.git.discard_repository(name).await? {
            self.log.in_scope(|| warn!("Removed stale cache directory for '{}'", name));
        }

        let index = match self.materialize(url, name).await {
            Ok(index) => index,
            Err(primary) => return Err(self.roll_back(name, primary).await),
        };

        let registry = Registry::new(name, url).with_description(index.description);
        self.registries.push(registry.clone());
        if let Err(primary) = self.persist().await {
            self.registries.pop();
            return Err(self.roll_back(name, primary).await);
        }

        self.log.in_scope(|| {
            info!(
                "Added registry '{}' from {} ({} modules)",
                name,
                url,
                index.modules.len()
            )
        });
        Ok(registry)
    }

    /// Unregister a registry by name or URL and delete its cache.
    pub async fn remove_registry(&mut self, identifier: &str) -> Result<Removal> {
        let position = self
            .registries
            .iter()
            .position(|registry| registry.matches(identifier))
            .ok_or_else(|| RegistryError::RegistryNotFound(identifier.to_string()))?;
        let name = self.registries[position].name.clone();

        let cache_error = match self.git.discard_repository(&name).await {
            Ok(_) => None,
            Err(err) => {
                self.log.in_scope(|| {
                    warn!("Failed to remove cache for registry '{}': {}", name, err)
                });
                Some(err)
            }
        };

        let registry = self.registries.remove(position);
        if let Err(err) = self.persist().await {
            self.registries.insert(position, registry);
            return Err(err);
        }

        self.log.in_scope(|| info!("Removed registry '{}'", registry.name));
        Ok(Removal {
            registry,
            cache_error,
        })
    }

    /// Refresh a registry's working copy and certify it again. `last_sync`
    /// only moves when the refreshed tree is valid.
    pub async fn sync_registry(&mut self, name: &str) -> Result<Registry> {
        let position = self
            .registries
            .iter()
            .position(|registry| registry.name == name)
            .ok_or_else(|| RegistryError::RegistryNotFound(name.to_string()))?;
        let url = self.registries[position].url.clone();

        if self.git.is_repository_cloned(name).await {
            self.git.update_repository(name).await?;
        } else {
            self.log.in_scope(|| info!("No working copy for '{}', cloning fresh", name));
            self.git.discard_repository(name).await?;
            self.git.clone_repository(&url, name).await?;
        }

        self.validate_tree(name).await?;

        let previous = self.registries[position].clone();
        self.registries[position].mark_synced();
        if let Err(err) = self.persist().await {
            self.registries[position] = previous;
            return Err(err);
        }

        self.log.in_scope(|| info!("Synced registry '{}'", name));
        Ok(self.registries[position].clone())
    }

    /// Sync every registry in list order. One failure does not stop the rest.
    pub async fn sync_all(&mut self) -> Vec<(String, Result<Registry>)> {
        let names: Vec<String> = self.registries.iter().map(|r| r.name.clone()).collect();

        let mut results = Vec::with_capacity(names.len());
        for name in names {
            let result = self.sync_registry(&name).await;
            if let Err(err) = &result {
                self.log.in_scope(|| warn!("Sync of '{}' failed: {}", name, err));
            }
            results.push((name, result));
        }
        results
    }

    /// Parse the cached index of a registry. Never clones or syncs.
    pub async fn get_registry_index(&self, identifier: &str) -> Result<RegistryIndex> {
        let registry = self.get_registry(identifier)?;
        let path = self.git.repository_path(&registry.name);

        read_index(&path)
            .await
            .map_err(|source| RegistryError::Structure {
                registry: registry.name.clone(),
                source,
            })
    }

    /// Diagnostic metadata of a registry's working copy.
    pub async fn repository_info(&self, identifier: &str) -> Result<RepositoryInfo> {
        let registry = self.get_registry(identifier)?;
        Ok(self.git.repository_info(&registry.name).await)
    }

    async fn materialize(&self, url: &str, name: &str) -> Result<RegistryIndex> {
        self.git.clone_repository(url, name).await?;
        self.validate_tree(name).await
    }

    async fn validate_tree(&self, name: &str) -> Result<RegistryIndex> {
        StructureValidator::new(self.git.repository_path(name), self.log.clone())
            .validate()
            .await
            .map_err(|source| RegistryError::Structure {
                registry: name.to_string(),
                source,
            })
    }

    async fn roll_back(&self, name: &str, primary: RegistryError) -> AddError {
        self.log.in_scope(|| {
            warn!(
                "Adding registry '{}' failed: {}, discarding its cache",
                name, primary
            )
        });

        let cleanup = match self.git.discard_repository(name).await {
            Ok(_) => None,
            Err(err) => {
                self.log.in_scope(|| {
                    error!("Failed to clean up cache for '{}': {}", name, err)
                });
                Some(err)
            }
        };

        AddError { primary, cleanup }
    }

    async fn persist(&self) -> Result<()> {
        self.store.save(&self.registries).await
    }
}

/// Registry names become directory names under the cache root.
pub fn check_registry_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| RegistryError::InvalidRegistryName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name cannot be empty"));
    }
    if name.starts_with('.') {
        return Err(invalid("name cannot start with '.'"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(invalid(
            "only letters, numbers, '.', '_' and '-' are allowed",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_name_guard() {
        assert!(check_registry_name("core-modules").is_ok());
        assert!(check_registry_name("team.tools_v2").is_ok());

        for bad in ["", ".", "..", ".hidden", "a/b", "../escape", "with space"] {
            let err = check_registry_name(bad).unwrap_err();
            assert!(
                matches!(err, RegistryError::InvalidRegistryName { .. }),
                "{bad:?} should be rejected"
            );
        }
    }
}
