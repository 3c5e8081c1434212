use eyre::Result;

use shellify_registry::{ModuleCatalog, ModuleInfo, RegistryClient, Shell};

use crate::cli::ModuleCommands;

pub async fn handle_module_command(cmd: ModuleCommands, client: &RegistryClient) -> Result<()> {
    let catalog = ModuleCatalog::new(client);
    match cmd {
        ModuleCommands::List { registry, shell } => {
            handle_list_modules(&catalog, registry, shell).await
        }
        ModuleCommands::Show { name } => handle_show_module(&catalog, name).await,
        ModuleCommands::Search { query } => handle_search_modules(&catalog, query).await,
    }
}

async fn handle_list_modules(
    catalog: &ModuleCatalog<'_>,
    registry: Option<String>,
    shell: Option<String>,
) -> Result<()> {
    let shell = match shell {
        Some(name) => match Shell::from_name(&name) {
            Some(shell) => Some(shell),
            None => {
                let known: Vec<&str> = Shell::ALL.iter().map(|s| s.as_str()).collect();
                println!("❌ Unknown shell: {}", name);
                println!("💡 Valid shells: {}", known.join(", "));
                return Err(eyre::eyre!("Unknown shell: {}", name));
            }
        },
        None => None,
    };

    let mut modules = match (&registry, shell) {
        (Some(registry), _) => catalog.list_modules_by_registry(registry).await?,
        (None, Some(shell)) => catalog.filter_by_shell(shell.as_str()).await,
        (None, None) => catalog.list_all_modules().await,
    };

    // The catalog filters by shell only across every registry
    if let (Some(_), Some(shell)) = (&registry, shell) {
        modules.retain(|m| match m.module.declared_shell() {
            Some(declared) => declared.eq_ignore_ascii_case(shell.as_str()),
            None => true,
        });
    }

    if modules.is_empty() {
        println!("📭 No modules found");
        return Ok(());
    }

    println!("📦 Modules ({}):", modules.len());
    for module in &modules {
        print_summary(module);
    }
    Ok(())
}

async fn handle_show_module(catalog: &ModuleCatalog<'_>, name: String) -> Result<()> {
    let info = match catalog.module_details(&name).await {
        Ok(info) => info,
        Err(e) => {
            println!("❌ {}", e);
            println!("💡 Use 'shellify module search <query>' to find modules");
            return Err(e.into());
        }
    };

    let module = &info.module;
    println!("📦 {}", module.name);
    println!("├─ description: {}", module.description);
    println!("├─ version: {}", module.declared_version().unwrap_or("(unspecified)"));
    let shell = match (module.declared_shell(), module.shell_kind()) {
        (None, _) => "any".to_string(),
        (Some(_), Some(kind)) => kind.to_string(),
        (Some(raw), None) => format!("{} (unrecognized)", raw),
    };
    println!("├─ shell: {}", shell);
    if let Some(path) = &module.path {
        println!("├─ path: {}", path);
    }
    println!("└─ registry: {} ({})", info.registry_name, info.registry_url);
    Ok(())
}

async fn handle_search_modules(catalog: &ModuleCatalog<'_>, query: String) -> Result<()> {
    let modules = catalog.search_modules(&query).await;

    if modules.is_empty() {
        println!("🔍 No modules match '{}'", query);
        return Ok(());
    }

    println!("🔍 {} modules match '{}':", modules.len(), query);
    for module in &modules {
        print_summary(module);
    }
    Ok(())
}

fn print_summary(info: &ModuleInfo) {
    let shell = info.module.declared_shell().unwrap_or("any");
    println!("  • {} [{}] ({})", info.name(), shell, info.registry_name);
    println!("    {}", info.module.description);
}
