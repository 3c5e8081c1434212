use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;

use crate::error::{RegistryError, Result};

pub const REGISTRIES_FILE: &str = "registries.json";
pub const CACHE_DIR: &str = "cache";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Locations and network settings used by [`crate::RegistryClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub config_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub registries_file: PathBuf,
    pub http_timeout: Duration,
    pub user_agent: String,
}

impl ClientConfig {
    /// Per-user defaults: the registry list lives in the config directory and
    /// clones under the data directory.
    pub fn from_default_dirs() -> Result<Self> {
        let dirs = ProjectDirs::from("dev", "shellify", "shellify").ok_or_else(|| {
            RegistryError::ConfigError("could not determine the home directory".to_string())
        })?;

        let config_dir = dirs.config_dir().to_path_buf();
        Ok(Self {
            registries_file: config_dir.join(REGISTRIES_FILE),
            cache_dir: dirs.data_dir().join(CACHE_DIR),
            config_dir,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            user_agent: default_user_agent(),
        })
    }

    /// Root every location under `root`.
    pub fn in_dir(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            config_dir: root.to_path_buf(),
            cache_dir: root.join(CACHE_DIR),
            registries_file: root.join(REGISTRIES_FILE),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            user_agent: default_user_agent(),
        }
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    pub fn with_registries_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.registries_file = path.into();
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

pub fn default_user_agent() -> String {
    format!("{}/{}", crate::NAME, crate::VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_dir_layout() {
        let config = ClientConfig::in_dir("/tmp/shellify-home");

        assert_eq!(config.cache_dir, PathBuf::from("/tmp/shellify-home/cache"));
        assert_eq!(
            config.registries_file,
            PathBuf::from("/tmp/shellify-home/registries.json")
        );
        assert_eq!(config.http_timeout, Duration::from_secs(15));
        assert!(config.user_agent.starts_with("shellify/"));
    }

    #[test]
    fn test_builder_overrides() {
        let config = ClientConfig::in_dir("/tmp/home")
            .with_cache_dir("/var/cache/shellify")
            .with_http_timeout(Duration::from_secs(3))
            .with_user_agent("test-agent");

        assert_eq!(config.cache_dir, PathBuf::from("/var/cache/shellify"));
        assert_eq!(config.http_timeout, Duration::from_secs(3));
        assert_eq!(config.user_agent, "test-agent");
    }
}
