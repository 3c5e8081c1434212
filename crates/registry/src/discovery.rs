//! Module lookup across every registered registry.
//!
//! Reads go through [`RegistryClient::get_registry_index`], so the catalog only
//! ever sees what is already cached locally.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::client::RegistryClient;
use crate::error::{RegistryError, Result};
use crate::models::{Module, Registry};

/// A module together with the registry that publishes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    #[serde(flatten)]
    pub module: Module,
    pub registry_name: String,
    pub registry_url: String,
}

impl ModuleInfo {
    fn new(module: Module, registry: &Registry) -> Self {
        Self {
            module,
            registry_name: registry.name.clone(),
            registry_url: registry.url.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.module.name
    }
}

pub struct ModuleCatalog<'a> {
    client: &'a RegistryClient,
}

impl<'a> ModuleCatalog<'a> {
    pub fn new(client: &'a RegistryClient) -> Self {
        Self { client }
    }

    /// Every module of every registry. Registries whose index cannot be read
    /// are skipped with a warning.
    pub async fn list_all_modules(&self) -> Vec<ModuleInfo> {
        let mut modules = Vec::new();
        for registry in self.client.list_registries() {
            match self.client.get_registry_index(&registry.name).await {
                Ok(index) => modules.extend(
                    index
                        .modules
                        .into_values()
                        .map(|module| ModuleInfo::new(module, registry)),
                ),
                Err(err) => self.client.logger().in_scope(|| {
                    warn!(
                        "Skipping modules of registry '{}': {}",
                        registry.name, err
                    )
                }),
            }
        }
        sort_modules(&mut modules);
        modules
    }

    pub async fn list_modules_by_registry(&self, identifier: &str) -> Result<Vec<ModuleInfo>> {
        let registry = self.client.get_registry(identifier)?;
        let index = self.client.get_registry_index(&registry.name).await?;

        let mut modules: Vec<ModuleInfo> = index
            .modules
            .into_values()
            .map(|module| ModuleInfo::new(module, registry))
            .collect();
        sort_modules(&mut modules);
        Ok(modules)
    }

    /// Case-insensitive substring match on name or description.
    pub async fn search_modules(&self, query: &str) -> Vec<ModuleInfo> {
        let query = query.to_lowercase();
        self.list_all_modules()
            .await
            .into_iter()
            .filter(|info| {
                info.module.name.to_lowercase().contains(&query)
                    || info.module.description.to_lowercase().contains(&query)
            })
            .collect()
    }

    /// Modules declaring `shell` (case-insensitively) plus modules that
    /// declare no shell at all.
    pub async fn filter_by_shell(&self, shell: &str) -> Vec<ModuleInfo> {
        self.list_all_modules()
            .await
            .into_iter()
            .filter(|info| match info.module.declared_shell() {
                Some(declared) => declared.eq_ignore_ascii_case(shell),
                None => true,
            })
            .collect()
    }

    /// First module named `name`, in catalog order.
    pub async fn module_details(&self, name: &str) -> Result<ModuleInfo> {
        self.list_all_modules()
            .await
            .into_iter()
            .find(|info| info.module.name == name)
            .ok_or_else(|| RegistryError::ModuleNotFound(name.to_string()))
    }
}

fn sort_modules(modules: &mut [ModuleInfo]) {
    modules.sort_by(|a, b| {
        a.module
            .name
            .cmp(&b.module.name)
            .then_with(|| a.registry_name.cmp(&b.registry_name))
    });
}
