use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered registry as stored in the persisted registry list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub added_at: DateTime<Utc>,
    /// `None` means the registry has never been synced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
}

impl Registry {
    /// Create a freshly validated registry; it counts as synced at creation.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            url: url.into(),
            description: None,
            added_at: now,
            last_sync: Some(now),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = if description.trim().is_empty() {
            None
        } else {
            Some(description)
        };
        self
    }

    /// Whether `identifier` names this registry, by name or by URL.
    pub fn matches(&self, identifier: &str) -> bool {
        self.name == identifier || self.url == identifier
    }

    pub fn never_synced(&self) -> bool {
        self.last_sync.is_none()
    }

    /// Record a successful sync. `last_sync` never moves backwards.
    pub fn mark_synced(&mut self) {
        let now = Utc::now();
        self.last_sync = Some(match self.last_sync {
            Some(previous) if previous > now => previous,
            _ => now,
        });
    }
}

/// Parsed `index.json` of a registry.
///
/// Every field defaults so that missing values surface as validation errors
/// rather than parse errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryIndex {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub modules: BTreeMap<String, Module>,
}

impl RegistryIndex {
    pub fn module(&self, key: &str) -> Option<&Module> {
        self.modules.get(key)
    }
}

/// A module entry of a registry index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
}

impl Module {
    /// Declared version, treating an empty string as absent.
    pub fn declared_version(&self) -> Option<&str> {
        self.version.as_deref().filter(|v| !v.is_empty())
    }

    /// Declared shell, treating an empty string as absent.
    pub fn declared_shell(&self) -> Option<&str> {
        self.shell.as_deref().filter(|s| !s.is_empty())
    }

    pub fn shell_kind(&self) -> Option<Shell> {
        self.declared_shell().and_then(Shell::from_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Sh,
}

impl Shell {
    pub const ALL: [Shell; 5] = [
        Shell::Bash,
        Shell::Zsh,
        Shell::Fish,
        Shell::PowerShell,
        Shell::Sh,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Shell::Bash => "bash",
            Shell::Zsh => "zsh",
            Shell::Fish => "fish",
            Shell::PowerShell => "powershell",
            Shell::Sh => "sh",
        }
    }

    /// Case-insensitive lookup.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|shell| shell.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of content a module provides, declared in its `module.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleType {
    Aliases,
    Functions,
    Exports,
    Scripts,
    Config,
}

impl ModuleType {
    pub const ALL: [ModuleType; 5] = [
        ModuleType::Aliases,
        ModuleType::Functions,
        ModuleType::Exports,
        ModuleType::Scripts,
        ModuleType::Config,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleType::Aliases => "aliases",
            ModuleType::Functions => "functions",
            ModuleType::Exports => "exports",
            ModuleType::Scripts => "scripts",
            ModuleType::Config => "config",
        }
    }

    /// Case-insensitive lookup.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last commit of a local working copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitInfo {
    pub hash: String,
    pub message: String,
    pub time: Option<DateTime<Utc>>,
}

/// Diagnostic snapshot of a cached repository. Fields that could not be
/// determined are left empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryInfo {
    pub name: String,
    pub path: PathBuf,
    pub remote_url: String,
    pub last_commit_hash: String,
    pub last_commit_message: String,
    pub last_commit_time: Option<DateTime<Utc>>,
}

impl RepositoryInfo {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_commit(mut self, commit: CommitInfo) -> Self {
        self.last_commit_hash = commit.hash;
        self.last_commit_message = commit.message;
        self.last_commit_time = commit.time;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_registry_creation() {
        let registry = Registry::new("core", "https://github.com/shellify/core")
            .with_description("Core modules");

        assert_eq!(registry.name, "core");
        assert_eq!(registry.description.as_deref(), Some("Core modules"));
        assert_eq!(registry.last_sync, Some(registry.added_at));
        assert!(registry.matches("core"));
        assert!(registry.matches("https://github.com/shellify/core"));
        assert!(!registry.matches("other"));
    }

    #[test]
    fn test_mark_synced_is_monotonic() {
        let mut registry = Registry::new("core", "https://github.com/shellify/core");
        let future = Utc::now() + Duration::hours(1);
        registry.last_sync = Some(future);

        registry.mark_synced();
        assert_eq!(registry.last_sync, Some(future));

        registry.last_sync = None;
        assert!(registry.never_synced());
        registry.mark_synced();
        assert!(registry.last_sync.is_some());
    }

    #[test]
    fn test_never_synced_serialization() {
        let json = r#"{
            "name": "core",
            "url": "https://github.com/shellify/core",
            "added_at": "2024-05-01T10:00:00Z"
        }"#;
        let registry: Registry = serde_json::from_str(json).unwrap();
        assert!(registry.never_synced());

        let back = serde_json::to_string(&registry).unwrap();
        assert!(!back.contains("last_sync"));
    }

    #[test]
    fn test_shell_and_type_lookup() {
        assert_eq!(Shell::from_name("ZSH"), Some(Shell::Zsh));
        assert_eq!(Shell::from_name("PowerShell"), Some(Shell::PowerShell));
        assert_eq!(Shell::from_name("tcsh"), None);

        assert_eq!(ModuleType::from_name("Aliases"), Some(ModuleType::Aliases));
        assert_eq!(ModuleType::from_name("plugins"), None);
    }

    #[test]
    fn test_module_optional_fields() {
        let module: Module = serde_json::from_str(
            r#"{"name":"git","description":"Git helpers","version":"","shell":"Bash"}"#,
        )
        .unwrap();

        assert_eq!(module.declared_version(), None);
        assert_eq!(module.shell_kind(), Some(Shell::Bash));
        assert!(module.path.is_none());
    }
}
