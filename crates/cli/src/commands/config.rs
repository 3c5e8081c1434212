use eyre::Result;
use std::path::Path;

use crate::cli::ConfigCommands;
use crate::commands::confirm;
use crate::config::Config;

pub async fn handle_config_command(cmd: ConfigCommands, dir: &Path, dry_run: bool) -> Result<()> {
    match cmd {
        ConfigCommands::Show => {
            let config = Config::load(dir).await?;
            println!("{}", config.show_all());
            println!("📁 {}", Config::path(dir).display());
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let value = Config::load(dir).await?.get_value(&key).inspect_err(|e| {
                println!("❌ {}", e);
            })?;
            println!("{}: {}", key, value);
            Ok(())
        }
        ConfigCommands::Set { key, value } if dry_run => {
            // Validate the change without saving it
            Config::load(dir).await?.set_value(&key, &value)?;
            println!("Would set config: {} = {}", key, value);
            Ok(())
        }
        ConfigCommands::Set { key, value } => match Config::update(dir, &key, &value).await {
            Ok(stored) => {
                println!("✅ {} = {}", key, stored);
                Ok(())
            }
            Err(e) => {
                println!("❌ Failed to set {}: {}", key, e);
                Err(e)
            }
        },
        ConfigCommands::Reset { .. } if dry_run => {
            println!("Would reset configuration to defaults");
            Ok(())
        }
        ConfigCommands::Reset { force } => {
            if !force && !confirm("Reset all configuration to defaults?")? {
                println!("❌ Cancelled");
                return Ok(());
            }
            Config::reset(dir).await?;
            println!("✅ Configuration reset to defaults");
            Ok(())
        }
    }
}
