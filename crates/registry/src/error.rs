use std::path::PathBuf;

use thiserror::Error;

/// Broad classification of a [`RegistryError`], used by callers that only need
/// to decide how to present a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Reachability,
    System,
    NotFound,
    AlreadyExists,
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Invalid registry URL: {0}")]
    Url(#[from] UrlError),

    #[error("Registry '{registry}' failed structure validation: {source}")]
    Structure {
        registry: String,
        source: StructureError,
    },

    #[error("Registry URL '{url}' is already registered as '{existing}'")]
    UrlAlreadyRegistered { url: String, existing: String },

    #[error("Registry name '{0}' is already in use")]
    NameAlreadyRegistered(String),

    #[error("Invalid registry name '{name}': {reason}")]
    InvalidRegistryName { name: String, reason: String },

    #[error("Registry '{0}' not found")]
    RegistryNotFound(String),

    #[error("Module '{0}' not found")]
    ModuleNotFound(String),

    #[error("Repository '{name}' is not cloned at '{}'", path.display())]
    RepositoryNotCloned { name: String, path: PathBuf },

    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("IO operation '{operation}' failed on path '{}': {source}", path.display())]
    IoOperation {
        operation: String,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupted registry list at '{}': {reason}", path.display())]
    CorruptedRegistryList { path: PathBuf, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, RegistryError>;

impl RegistryError {
    pub fn io(
        operation: impl Into<String>,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        RegistryError::IoOperation {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::Url(err) if err.is_reachability_error() => ErrorKind::Reachability,
            RegistryError::Url(_)
            | RegistryError::Structure { .. }
            | RegistryError::InvalidRegistryName { .. } => ErrorKind::Validation,
            RegistryError::UrlAlreadyRegistered { .. }
            | RegistryError::NameAlreadyRegistered(_) => ErrorKind::AlreadyExists,
            RegistryError::RegistryNotFound(_)
            | RegistryError::ModuleNotFound(_)
            | RegistryError::RepositoryNotCloned { .. } => ErrorKind::NotFound,
            RegistryError::Git(_)
            | RegistryError::IoOperation { .. }
            | RegistryError::Serialization(_)
            | RegistryError::CorruptedRegistryList { .. }
            | RegistryError::HttpClient(_)
            | RegistryError::ConfigError(_) => ErrorKind::System,
        }
    }

    /// Whether fixing the input (URL, name, registry contents) could make a retry succeed.
    pub fn is_user_error(&self) -> bool {
        !matches!(self.kind(), ErrorKind::System)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UrlError {
    #[error("URL must include a scheme (https:// or git@host:path): '{url}'")]
    MissingScheme { url: String },

    #[error("Failed to parse URL '{url}': {reason}")]
    Malformed { url: String, reason: String },

    #[error("Unsupported URL scheme '{scheme}' in '{url}', supported schemes: https, git@ (SSH)")]
    UnsupportedScheme { url: String, scheme: String },

    #[error("URL must include a host: '{url}'")]
    MissingHost { url: String },

    #[error("URL must include a repository path: '{url}'")]
    MissingPath { url: String },

    #[error("Repository path of '{url}' should be in format {expected}")]
    InsufficientPath { url: String, expected: &'static str },

    #[error("Invalid {host} owner name '{owner}' in '{url}'")]
    InvalidOwner {
        url: String,
        host: &'static str,
        owner: String,
    },

    #[error("Invalid repository name '{repository}' in '{url}'")]
    InvalidRepository { url: String, repository: String },

    #[error("Invalid SSH URL format '{url}', expected: git@host:path")]
    InvalidSsh { url: String },

    #[error("Repository not found (404) at {endpoint}")]
    NotFound { endpoint: String },

    #[error("Access forbidden (403) at {endpoint}, repository may be private")]
    Forbidden { endpoint: String },

    #[error("Unexpected status code {status} from {endpoint}")]
    UnexpectedStatus { endpoint: String, status: u16 },

    #[error("Request to {endpoint} failed: {reason}")]
    Unreachable { endpoint: String, reason: String },
}

impl UrlError {
    pub fn is_reachability_error(&self) -> bool {
        matches!(
            self,
            UrlError::NotFound { .. }
                | UrlError::Forbidden { .. }
                | UrlError::UnexpectedStatus { .. }
                | UrlError::Unreachable { .. }
        )
    }

    pub fn is_format_error(&self) -> bool {
        !self.is_reachability_error()
    }
}

/// Failure of the registry structure check. Index-level problems are reported
/// directly; module problems are wrapped with the offending module key.
#[derive(Error, Debug)]
pub enum StructureError {
    #[error("index.json not found at '{}'", path.display())]
    IndexNotFound { path: PathBuf },

    #[error("Failed to read '{}': {source}", path.display())]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid JSON format in '{}': {source}", path.display())]
    InvalidJson {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Index field '{field}' is required and cannot be empty")]
    MissingField { field: &'static str },

    #[error("Invalid version format: '{version}' does not follow semantic versioning (e.g. 1.0.0)")]
    InvalidVersion { version: String },

    #[error("Invalid registry name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Registry '{registry}' must contain at least one module")]
    NoModules { registry: String },

    #[error("Module '{key}' validation failed: {source}")]
    Module { key: String, source: ModuleError },

    #[error("'{}' exists but is not a directory", path.display())]
    ModulesNotDirectory { path: PathBuf },
}

impl StructureError {
    /// Module key of the failing module, if the failure is module-level.
    pub fn module_key(&self) -> Option<&str> {
        match self {
            StructureError::Module { key, .. } => Some(key),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("field '{field}' is required")]
    MissingField { field: &'static str },

    #[error("module name '{name}' does not match key '{key}'")]
    NameMismatch { name: String, key: String },

    #[error("invalid module name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("invalid module version '{version}', expected semantic versioning (e.g. 1.0.0)")]
    InvalidVersion { version: String },

    #[error("unsupported shell '{shell}', supported shells: bash, zsh, fish, powershell, sh")]
    UnsupportedShell { shell: String },

    #[error("module path '{path}' must stay inside the registry")]
    PathEscapesRegistry { path: String },

    #[error("module directory does not exist: {path}")]
    DirectoryMissing { path: String },

    #[error("module.json not found in: {path}")]
    ManifestMissing { path: String },

    #[error("failed to read '{}': {source}", path.display())]
    ManifestUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON format in '{}': {source}", path.display())]
    ManifestInvalidJson {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("'{}' must contain a JSON object", path.display())]
    ManifestNotObject { path: PathBuf },

    #[error("'{}' is missing required string field '{field}'", path.display())]
    ManifestField { path: PathBuf, field: &'static str },

    #[error(
        "unsupported module type '{kind}' in '{}', supported types: aliases, functions, exports, scripts, config",
        path.display()
    )]
    UnsupportedType { path: PathBuf, kind: String },
}

#[derive(Error, Debug)]
pub enum GitError {
    #[error("git {operation} failed in '{}' ({status}), output: {output}", path.display())]
    CommandFailed {
        operation: &'static str,
        path: PathBuf,
        status: String,
        output: String,
    },

    #[error("Failed to run git {operation}: {source}")]
    Spawn {
        operation: &'static str,
        source: std::io::Error,
    },

    #[error("Unexpected output from git {operation}: {output}")]
    UnexpectedOutput {
        operation: &'static str,
        output: String,
    },

    #[cfg(feature = "libgit2")]
    #[error("libgit2 {operation} failed for '{target}': {source}")]
    Library {
        operation: &'static str,
        target: String,
        source: git2::Error,
    },

    #[error("git {operation} was interrupted: {reason}")]
    Interrupted {
        operation: &'static str,
        reason: String,
    },
}

/// Failure of `add_registry`.
///
/// `primary` is the reason the registry was not added. `cleanup` holds the error
/// raised while discarding the partially materialized clone, if that failed too;
/// it never replaces the primary reason.
#[derive(Error, Debug)]
#[error("{primary}")]
pub struct AddError {
    pub primary: RegistryError,
    pub cleanup: Option<RegistryError>,
}

impl AddError {
    pub fn kind(&self) -> ErrorKind {
        self.primary.kind()
    }
}

impl From<RegistryError> for AddError {
    fn from(primary: RegistryError) -> Self {
        Self {
            primary,
            cleanup: None,
        }
    }
}

impl From<UrlError> for AddError {
    fn from(err: UrlError) -> Self {
        RegistryError::from(err).into()
    }
}
