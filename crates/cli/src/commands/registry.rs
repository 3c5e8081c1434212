use eyre::Result;
use std::path::Path;

use shellify_registry::{
    ErrorKind, RegistryClient, RegistryError, UrlKind, derive_registry_name,
    validate_registry_dir,
};

use crate::cli::RegistryCommands;
use crate::commands::{confirm, format_time};

pub async fn handle_registry_command(
    cmd: RegistryCommands,
    client: &mut RegistryClient,
    dry_run: bool,
) -> Result<()> {
    match cmd {
        RegistryCommands::Add { url, name } => {
            handle_add_registry(client, url, name, dry_run).await
        }
        RegistryCommands::List => handle_list_registries(client),
        RegistryCommands::Remove { identifier, force } => {
            handle_remove_registry(client, identifier, force, dry_run).await
        }
        RegistryCommands::Sync { name, all } => {
            handle_sync_registry(client, name, all, dry_run).await
        }
        RegistryCommands::Info { identifier } => handle_registry_info(client, identifier).await,
        RegistryCommands::Validate { target } => handle_validate(client, target).await,
    }
}

async fn handle_add_registry(
    client: &mut RegistryClient,
    url: String,
    name: Option<String>,
    dry_run: bool,
) -> Result<()> {
    let name = name.unwrap_or_else(|| derive_registry_name(&url));

    if dry_run {
        println!("Would add registry '{}' from {}", name, url);
        return Ok(());
    }

    println!("📦 Adding registry '{}' from {}", name, url);
    match client.add_registry(&url, &name).await {
        Ok(registry) => {
            println!("✅ Registry '{}' added", registry.name);
            if let Some(description) = &registry.description {
                println!("   {}", description);
            }
            Ok(())
        }
        Err(e) => {
            println!("❌ Failed to add registry: {}", e.primary);
            match e.kind() {
                ErrorKind::AlreadyExists => {
                    println!("💡 Use 'shellify registry list' to see registered registries")
                }
                ErrorKind::Reachability => {
                    println!("💡 Check the URL and that the repository is public")
                }
                _ => {}
            }
            if let Some(cleanup) = &e.cleanup {
                println!("⚠️  Could not clean up the partial clone: {}", cleanup);
            }
            Err(e.into())
        }
    }
}

fn handle_list_registries(client: &RegistryClient) -> Result<()> {
    let registries = client.list_registries();

    if registries.is_empty() {
        println!("📭 No registries registered");
        println!("💡 Add one with 'shellify registry add <url>'");
        return Ok(());
    }

    println!("📦 Registries ({}):", registries.len());
    for registry in registries {
        println!("  • {} ({})", registry.name, registry.url);
        if let Some(description) = &registry.description {
            println!("    {}", description);
        }
        println!("    Last sync: {}", format_time(registry.last_sync));
    }
    Ok(())
}

async fn handle_remove_registry(
    client: &mut RegistryClient,
    identifier: String,
    force: bool,
    dry_run: bool,
) -> Result<()> {
    let registry = client.get_registry(&identifier)?.clone();

    if dry_run {
        println!(
            "Would remove registry '{}' and delete {}",
            registry.name,
            client.git().repository_path(&registry.name).display()
        );
        return Ok(());
    }

    let question = format!("Remove registry '{}' and its cached copy?", registry.name);
    if !force && !confirm(&question)? {
        println!("❌ Cancelled");
        return Ok(());
    }

    let removal = client.remove_registry(&registry.name).await?;
    println!("✅ Registry '{}' removed", removal.registry.name);
    if let Some(e) = removal.cache_error {
        println!("⚠️  Cached copy could not be deleted: {}", e);
    }
    Ok(())
}

async fn handle_sync_registry(
    client: &mut RegistryClient,
    name: Option<String>,
    all: bool,
    dry_run: bool,
) -> Result<()> {
    let targets: Vec<String> = match (name, all) {
        (Some(name), _) => vec![name],
        (None, true) => client
            .list_registries()
            .iter()
            .map(|r| r.name.clone())
            .collect(),
        (None, false) => {
            println!("❌ Specify a registry name or --all");
            return Err(eyre::eyre!("No registry selected for sync"));
        }
    };

    if dry_run {
        for name in &targets {
            println!("Would sync registry '{}'", name);
        }
        return Ok(());
    }

    if all {
        if targets.is_empty() {
            println!("📭 No registries to sync");
            return Ok(());
        }

        let results = client.sync_all().await;
        let mut failed = 0;
        for (name, result) in results {
            match result {
                Ok(_) => println!("✅ {}", name),
                Err(e) => {
                    failed += 1;
                    println!("❌ {}: {}", name, e);
                }
            }
        }
        if failed > 0 {
            return Err(eyre::eyre!("{} registries failed to sync", failed));
        }
        return Ok(());
    }

    for name in targets {
        println!("🔄 Syncing '{}'...", name);
        let registry = client.sync_registry(&name).await?;
        println!(
            "✅ Registry '{}' synced at {}",
            registry.name,
            format_time(registry.last_sync)
        );
    }
    Ok(())
}

async fn handle_registry_info(client: &RegistryClient, identifier: String) -> Result<()> {
    let registry = client.get_registry(&identifier)?.clone();
    let repo = client.repository_info(&registry.name).await?;

    println!("📦 {}", registry.name);
    println!("├─ url: {}", registry.url);
    if let Some(description) = &registry.description {
        println!("├─ description: {}", description);
    }
    println!("├─ added: {}", format_time(Some(registry.added_at)));
    println!("├─ last sync: {}", format_time(registry.last_sync));
    println!("├─ path: {}", repo.path.display());
    if !repo.last_commit_hash.is_empty() {
        println!(
            "├─ commit: {} {}",
            short_hash(&repo.last_commit_hash),
            repo.last_commit_message
        );
        println!("├─ committed: {}", format_time(repo.last_commit_time));
    }

    match client.get_registry_index(&registry.name).await {
        Ok(index) => println!("└─ modules: {}", index.modules.len()),
        Err(e) => println!("└─ modules: unavailable ({})", e),
    }
    Ok(())
}

async fn handle_validate(client: &RegistryClient, target: String) -> Result<()> {
    let path = Path::new(&target);
    if path.is_dir() {
        return match validate_registry_dir(path, client.logger()).await {
            Ok(index) => {
                println!(
                    "✅ '{}' v{} is a valid registry with {} modules",
                    index.name,
                    index.version,
                    index.modules.len()
                );
                Ok(())
            }
            Err(e) => {
                println!("❌ {}", e);
                Err(e.into())
            }
        };
    }

    match client.validate_url(&target).await {
        Ok(kind) => {
            let transport = match kind {
                UrlKind::Https => "HTTPS",
                UrlKind::Ssh => "SSH",
            };
            println!("✅ {} URL is valid: {}", transport, target);
            Ok(())
        }
        Err(e) => {
            println!("❌ {}", e);
            if matches!(e, RegistryError::Url(ref url) if url.is_format_error()) {
                println!("💡 Expected https://host/owner/repo or git@host:owner/repo");
            }
            Err(e.into())
        }
    }
}

fn short_hash(hash: &str) -> &str {
    hash.get(..7).unwrap_or(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortens_commit_hashes() {
        assert_eq!(short_hash("0123456789abcdef"), "0123456");
        assert_eq!(short_hash("abc"), "abc");
    }
}
