use std::path::PathBuf;

#[derive(clap::Parser, Debug)]
#[clap(name = "shellify", version, about = "Discover and manage shell module registries")]
pub struct Cli {
    /// Enable debug logging
    #[clap(short, long, global = true)]
    pub verbose: bool,
    /// Keep configuration, registry list and cache under this directory
    #[clap(long, global = true)]
    pub home: Option<PathBuf>,
    /// Show what would be done without making changes
    #[clap(long, global = true)]
    pub dry_run: bool,
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Manage registries
    Registry {
        #[clap(subcommand)]
        command: RegistryCommands,
    },
    /// Browse modules published by registered registries
    Module {
        #[clap(subcommand)]
        command: ModuleCommands,
    },
    /// Manage configuration
    Config {
        #[clap(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand, Debug)]
pub enum RegistryCommands {
    /// Validate, clone and register a registry
    Add {
        /// Repository URL (https://host/owner/repo or git@host:owner/repo)
        url: String,
        /// Registry name (derived from the URL when omitted)
        name: Option<String>,
    },
    /// List registered registries
    List,
    /// Unregister a registry and delete its cache
    Remove {
        /// Registry name or URL
        identifier: String,
        /// Skip confirmation prompt
        #[clap(long)]
        force: bool,
    },
    /// Pull and re-validate registries
    Sync {
        /// Registry name
        name: Option<String>,
        /// Sync every registered registry
        #[clap(long, conflicts_with = "name")]
        all: bool,
    },
    /// Show details of a registry and its working copy
    Info {
        /// Registry name or URL
        identifier: String,
    },
    /// Validate a registry URL or a local registry directory without registering it
    Validate {
        /// URL or path to a local directory
        target: String,
    },
}

#[derive(clap::Subcommand, Debug)]
pub enum ModuleCommands {
    /// List modules
    List {
        /// Only modules of this registry (name or URL)
        #[clap(long)]
        registry: Option<String>,
        /// Only modules for this shell, plus shell-agnostic ones
        #[clap(long)]
        shell: Option<String>,
    },
    /// Show a module
    Show {
        /// Module name
        name: String,
    },
    /// Search module names and descriptions
    Search {
        /// Search query
        query: String,
    },
}

#[derive(clap::Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show all configuration
    Show,
    /// Get a configuration value
    Get {
        /// Dotted key, e.g. http.timeout_secs
        key: String,
    },
    /// Set a configuration value
    Set {
        /// Dotted key, e.g. http.timeout_secs
        key: String,
        /// New value
        value: String,
    },
    /// Reset configuration to defaults
    Reset {
        /// Skip confirmation prompt
        #[clap(long)]
        force: bool,
    },
}
