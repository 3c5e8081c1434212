use std::path::Path;

use clap::Parser;
use eyre::{Context, Result};
use shellify_registry::{Logger, RegistryClient};
use tracing::debug;

mod cli;
mod commands;
mod config;

use cli::{Cli, Commands};
use commands::{handle_config_command, handle_module_command, handle_registry_command};
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let home = cli.home.as_deref();
    let config_dir = config::config_dir(home)?;

    match cli.command {
        // Config commands never open the registry list
        Commands::Config { command } => {
            handle_config_command(command, &config_dir, cli.dry_run).await
        }
        Commands::Registry { command } => {
            let mut client = open_client(&config_dir, home, cli.verbose).await?;
            handle_registry_command(command, &mut client, cli.dry_run).await
        }
        Commands::Module { command } => {
            let client = open_client(&config_dir, home, cli.verbose).await?;
            handle_module_command(command, &client).await
        }
    }
}

async fn open_client(
    config_dir: &Path,
    home: Option<&Path>,
    verbose: bool,
) -> Result<RegistryClient> {
    let config = Config::load(config_dir)
        .await
        .context("Failed to load configuration")?;

    let log = Logger::stderr(if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    });

    let client_config = config.client_config(home)?;
    log.in_scope(|| {
        debug!(
            registries = %client_config.registries_file.display(),
            cache = %client_config.cache_dir.display(),
            "Opening registry client"
        )
    });

    RegistryClient::open(client_config, log)
        .await
        .context("Failed to open registry list")
}
