//! Configuration file resolution and TOML loading
//!
//! Config file lookup follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Per-user config directory (`<config dir>/picu/<module>.toml`)
//! 4. System-wide config (`/etc/picu/<module>.toml`)

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Directory name used under the platform config directories
pub const CONFIG_DIR_NAME: &str = "picu";

/// Resolves which configuration file a PICU module should read
#[derive(Debug, Clone)]
pub struct ConfigFileResolver {
    module_name: String,
    env_var_name: String,
}

impl ConfigFileResolver {
    /// Create resolver for a module
    ///
    /// The environment variable is derived from the module name:
    /// `picu-loader` → `PICU_LOADER_CONFIG`.
    pub fn new(module_name: &str) -> Self {
        let env_var_name = format!(
            "{}_CONFIG",
            module_name.to_ascii_uppercase().replace('-', "_")
        );
        Self {
            module_name: module_name.to_string(),
            env_var_name,
        }
    }

    /// Name of the environment variable consulted in tier 2
    pub fn env_var_name(&self) -> &str {
        &self.env_var_name
    }

    /// Candidate paths for tiers 3 and 4, in priority order
    pub fn default_locations(&self) -> Vec<PathBuf> {
        let file_name = format!("{}.toml", self.module_name);
        let mut locations = Vec::new();
        if let Some(dir) = dirs::config_dir() {
            locations.push(dir.join(CONFIG_DIR_NAME).join(&file_name));
        }
        if cfg!(unix) {
            locations.push(PathBuf::from("/etc").join(CONFIG_DIR_NAME).join(&file_name));
        }
        locations
    }

    /// Resolve the config file path
    ///
    /// An explicit CLI path or environment path is returned even if it does not
    /// exist yet, so the caller reports the exact path it tried. Default
    /// locations are only used when the file is present.
    pub fn resolve(&self, cli_arg: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = cli_arg {
            return Ok(path.to_path_buf());
        }

        if let Ok(path) = std::env::var(&self.env_var_name) {
            if !path.trim().is_empty() {
                return Ok(PathBuf::from(path));
            }
        }

        let locations = self.default_locations();
        locations
            .iter()
            .find(|p| p.is_file())
            .cloned()
            .ok_or_else(|| {
                Error::Config(format!(
                    "No config file found for {}. Pass --config, set {}, or create one of: {}",
                    self.module_name,
                    self.env_var_name,
                    locations
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }
}

/// Read and deserialize a TOML file
pub fn read_toml_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    toml::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse TOML {}: {}", path.display(), e))
    })
}
