use compdesc_schema::{JSON_NORMALISATION_V3, SHA256};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Settings read from `~/.config/compdesc/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Target version for `convert` when `--to` is not given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    pub normalisation: String,
    pub hash_algorithm: String,
    pub strict: bool,
    pub disable_validation: bool,
    /// Directory stores consulted by `resolve`, in order.
    pub lookup_dirs: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: None,
            normalisation: JSON_NORMALISATION_V3.to_owned(),
            hash_algorithm: SHA256.to_owned(),
            strict: false,
            disable_validation: false,
            lookup_dirs: Vec::new(),
        }
    }
}

impl Config {
    /// Load the file given with `--config`, or the default file when it exists.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, String> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                debug!("no config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config {}: {e}", path.display()))?;
        let mut config: Self = toml::from_str(&content)
            .map_err(|e| format!("invalid config {}: {e}", path.display()))?;
        config.lookup_dirs = config.lookup_dirs.iter().map(|p| expand_tilde(p)).collect();
        debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Write the config atomically, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)
            .map_err(|e| format!("failed to create {}: {e}", dir.display()))?;
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("failed to encode config: {e}"))?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| format!("failed to write config: {e}"))?;
        tmp.write_all(content.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| format!("failed to write config: {e}"))?;
        tmp.persist(path)
            .map_err(|e| format!("failed to write config {}: {}", path.display(), e.error))?;
        Ok(())
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config/compdesc/config.toml"))
}

pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}
