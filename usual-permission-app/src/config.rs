use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use usual_permission_core::{LocationOptions, OverlapPolicy};

pub const CONFIG_ENV: &str = "USUAL_PERMISSION_CONFIG";
pub const PROFILE_ENV: &str = "USUAL_PERMISSION_PROFILE";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// YAML description of the simulated device. Defaults apply when unset.
    #[serde(default)]
    pub device_profile: Option<PathBuf>,
    #[serde(default)]
    pub location: LocationConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default)]
    pub overlap: OverlapPolicy,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LocationConfig {
    pub fn options(&self) -> LocationOptions {
        LocationOptions {
            overlap: self.overlap,
            timeout: self.timeout_ms.map(Duration::from_millis),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            device_profile: None,
            location: LocationConfig::default(),
        }
    }
}

impl Config {
    /// `$USUAL_PERMISSION_CONFIG`, else `config.toml` in the working directory.
    pub fn path() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Loads from [`Config::path`]; a missing file yields the defaults.
    pub fn load() -> Result<Self> {
        let path = Self::path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.log_level.trim().is_empty() {
            bail!("log_level must not be empty");
        }
        if self.location.timeout_ms == Some(0) {
            bail!("location.timeout_ms must be greater than zero");
        }
        Ok(())
    }

    /// `$USUAL_PERMISSION_PROFILE` wins over the configured profile path.
    pub fn profile_path(&self) -> Option<PathBuf> {
        std::env::var_os(PROFILE_ENV)
            .map(PathBuf::from)
            .or_else(|| self.device_profile.clone())
    }
}
