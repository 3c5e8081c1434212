use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::Result;
use serde::{Deserialize, Serialize};
use shellify_registry::ClientConfig;
use shellify_registry::config::default_user_agent;
use tokio::fs;

pub const CONFIG_FILE: &str = "config.json";

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Config {
    /// Overrides where registry clones are kept
    #[serde(default)]
    pub cache_dir: Option<String>,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            user_agent: default_user_agent(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Library defaults, or everything rooted under `--home` when given.
fn base_client_config(home: Option<&Path>) -> Result<ClientConfig> {
    match home {
        Some(home) => Ok(ClientConfig::in_dir(home)),
        None => Ok(ClientConfig::from_default_dirs()?),
    }
}

/// Directory holding `config.json` next to the registry list.
pub fn config_dir(home: Option<&Path>) -> Result<PathBuf> {
    Ok(base_client_config(home)?.config_dir)
}

impl Config {
    pub fn path(dir: &Path) -> PathBuf {
        dir.join(CONFIG_FILE)
    }

    pub async fn load(dir: &Path) -> Result<Self> {
        let config_path = Self::path(dir);

        if !fs::try_exists(&config_path).await? {
            let default_config = Self::default();
            default_config.save(dir).await?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(&config_path).await?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| eyre::eyre!("Invalid config file {}: {}", config_path.display(), e))?;
        Ok(config)
    }

    pub async fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).await?;
        let content = serde_json::to_string_pretty(self)?;
        fs::write(Self::path(dir), content).await?;
        Ok(())
    }

    pub async fn reset(dir: &Path) -> Result<Self> {
        let config = Self::default();
        config.save(dir).await?;
        Ok(config)
    }

    /// Load, apply one `key = value` change and write it back. Returns the
    /// value as stored, after normalisation.
    pub async fn update(dir: &Path, key: &str, value: &str) -> Result<String> {
        let mut config = Self::load(dir).await?;
        config.set_value(key, value)?;
        config.save(dir).await?;
        config.get_value(key)
    }

    /// Registry client settings with this file's overrides applied.
    pub fn client_config(&self, home: Option<&Path>) -> Result<ClientConfig> {
        let mut client = base_client_config(home)?
            .with_http_timeout(Duration::from_secs(self.http.timeout_secs))
            .with_user_agent(self.http.user_agent.clone());
        if let Some(path) = &self.cache_dir {
            client = client.with_cache_dir(path);
        }
        Ok(client)
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["cache_dir"] => {
                self.cache_dir = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            ["http", "timeout_secs"] => {
                let secs = value
                    .parse::<u64>()
                    .map_err(|_| eyre::eyre!("Invalid number of seconds: {}", value))?;
                if secs == 0 {
                    return Err(eyre::eyre!("http.timeout_secs must be greater than zero"));
                }
                self.http.timeout_secs = secs;
            }
            ["http", "user_agent"] => {
                if value.trim().is_empty() {
                    return Err(eyre::eyre!("http.user_agent cannot be empty"));
                }
                self.http.user_agent = value.to_string();
            }
            ["logging", "level"] => {
                let level = value.to_lowercase();
                if !LOG_LEVELS.contains(&level.as_str()) {
                    return Err(eyre::eyre!(
                        "Invalid log level: {} (expected one of {})",
                        value,
                        LOG_LEVELS.join(", ")
                    ));
                }
                self.logging.level = level;
            }
            _ => {
                return Err(eyre::eyre!("Unknown configuration key: {}", key));
            }
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Result<String> {
        let parts: Vec<&str> = key.split('.').collect();

        let value = match parts.as_slice() {
            ["cache_dir"] => self.cache_dir.clone().unwrap_or_default(),
            ["http", "timeout_secs"] => self.http.timeout_secs.to_string(),
            ["http", "user_agent"] => self.http.user_agent.clone(),
            ["logging", "level"] => self.logging.level.clone(),
            _ => {
                return Err(eyre::eyre!("Unknown configuration key: {}", key));
            }
        };

        Ok(value)
    }

    pub fn show_all(&self) -> String {
        format!(
            "Configuration:\n\
             └─ cache_dir: {}\n\
             Http:\n\
             ├─ timeout_secs: {}\n\
             └─ user_agent: {}\n\
             Logging:\n\
             └─ level: {}",
            self.cache_dir.as_deref().unwrap_or("(default)"),
            self.http.timeout_secs,
            self.http.user_agent,
            self.logging.level,
        )
    }
}
