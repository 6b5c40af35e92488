//! Configuration loading: YAML file, then environment overrides.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::domain::config::HcutilsConfig;
use crate::domain::error::HcError;

pub const TOKEN_ENV: &str = "HCLOUD_TOKEN";
pub const ENDPOINT_ENV: &str = "HCLOUD_ENDPOINT";
pub const CONFIG_ENV: &str = "HCUTILS_CONFIG";

/// Loads `HcutilsConfig` from a YAML file on disk.
pub struct YamlConfigStore;

impl YamlConfigStore {
    /// Load the config file, falling back to defaults when it does not exist,
    /// then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<HcutilsConfig> {
        let mut config = self.load_file(&self.path()?)?;
        apply_env(&mut config, |key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse `path`, or return defaults if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_file(&self, path: &Path) -> Result<HcutilsConfig> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(HcutilsConfig::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        serde_yaml::from_str(&content).with_context(|| format!("cannot parse {}", path.display()))
    }

    /// `$HCUTILS_CONFIG`, or `~/.config/hcutils/config.yaml`.
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn path(&self) -> Result<PathBuf> {
        if let Ok(val) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(val));
        }
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(home.join(".config").join("hcutils").join("config.yaml"))
    }
}

/// Apply environment overrides read through `lookup`.
pub fn apply_env(config: &mut HcutilsConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(endpoint) = lookup(ENDPOINT_ENV)
        && !endpoint.trim().is_empty()
    {
        config.endpoint = endpoint.trim().to_string();
    }
}

/// The API token from `HCLOUD_TOKEN`.
///
/// # Errors
///
/// Returns `HcError::MissingToken` if the variable is unset or blank.
pub fn api_token() -> Result<String> {
    token_from(std::env::var(TOKEN_ENV).ok())
}

fn token_from(value: Option<String>) -> Result<String> {
    match value {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => Err(HcError::MissingToken.into()),
    }
}
