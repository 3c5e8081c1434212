//! Shellify Registry - acquisition and validation of shell module registries
//!
//! A registry is a git repository publishing an `index.json` that maps module
//! keys to shell configuration modules (aliases, functions, exports, scripts,
//! config). This crate turns a user supplied location into a locally cached,
//! structurally verified registry and keeps it in sync.
//!
//! # Pipeline
//!
//! - **URL validation**: format rules per hosting service plus an HTTPS
//!   reachability probe ([`UrlValidator`])
//! - **Source control**: shallow clone and pull into `<cache>/<name>`
//!   ([`GitClient`], backed by [`GitCli`] or, with the `libgit2` feature, `LibGit`)
//! - **Structure validation**: index and per-module manifest checks
//!   ([`StructureValidator`])
//! - **Registry client**: add, remove, list and sync with a durable registry
//!   list ([`RegistryClient`])
//!
//! # Examples
//!
//! ```rust,no_run
//! use shellify_registry::{ClientConfig, Logger, ModuleCatalog, RegistryClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_default_dirs()?;
//! let mut client = RegistryClient::open(config, Logger::stderr("info")).await?;
//!
//! client
//!     .add_registry("https://github.com/shellify/core-modules", "core")
//!     .await?;
//!
//! for module in ModuleCatalog::new(&client).search_modules("git").await {
//!     println!("{} ({})", module.name(), module.registry_name);
//! }
//! # Ok(())
//! # }
//! ```
pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod git;
pub mod logging;
pub mod models;
pub mod store;
pub mod validation;

use std::path::Path;

pub use client::{check_registry_name, RegistryClient, Removal};
pub use config::ClientConfig;
pub use discovery::{ModuleCatalog, ModuleInfo};
pub use error::{
    AddError, ErrorKind, GitError, ModuleError, RegistryError, Result, StructureError, UrlError,
};
pub use git::{GitBackend, GitCli, GitClient};
#[cfg(feature = "libgit2")]
pub use git::LibGit;
pub use logging::Logger;
pub use models::{CommitInfo, Module, ModuleType, Registry, RegistryIndex, RepositoryInfo, Shell};
pub use store::RegistryListStore;
pub use validation::{
    derive_registry_name, validate_url_format, StructureValidator, UrlKind, UrlValidator,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name used in user agents and directory names
pub const NAME: &str = "shellify";

/// Run the structure validator on any local registry tree.
pub async fn validate_registry_dir(
    path: impl AsRef<Path>,
    log: &Logger,
) -> std::result::Result<RegistryIndex, StructureError> {
    StructureValidator::new(path.as_ref(), log.clone())
        .validate()
        .await
}
