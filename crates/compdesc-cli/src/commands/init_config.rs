use super::{CommandError, CommandResult, EXIT_SUCCESS};
use crate::config::{default_config_path, Config};
use std::path::Path;

/// Write a config file holding the defaults.
pub fn run(path: Option<&Path>, force: bool) -> CommandResult {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()
            .ok_or_else(|| CommandError::failure("HOME not set and no --config given"))?,
    };
    if path.exists() && !force {
        return Err(CommandError::failure(format!(
            "{} already exists, use --force to overwrite",
            path.display()
        )));
    }
    Config::default().save(&path)?;
    println!("wrote {}", path.display());
    Ok(EXIT_SUCCESS)
}
