pub mod config;
pub mod module;
pub mod registry;

use std::io::{self, Write};

use chrono::{DateTime, Local, Utc};

pub use config::handle_config_command;
pub use module::handle_module_command;
pub use registry::handle_registry_command;

/// Ask a y/N question on stdout. Anything but an answer starting with `y` is no.
pub(crate) fn confirm(question: &str) -> io::Result<bool> {
    print!("{} (y/N): ", question);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_lowercase().starts_with('y'))
}

pub(crate) fn format_time(time: Option<DateTime<Utc>>) -> String {
    match time {
        Some(time) => time
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => "never".to_string(),
    }
}
