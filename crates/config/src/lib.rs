use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;
use zendesk_api::{ConfigProvider, CONFIG_DOMAIN, CONFIG_EMAIL, CONFIG_PASSWORD};

/// Stored defaults for the integration. Every field is optional so a
/// partially configured setup still loads; the executor resolves whatever
/// is present and sends empty strings for the rest.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub api_token: Option<String>,
}

impl Settings {
    /// Load settings from the provided path or the default config file.
    /// A missing file yields the defaults.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let path = path
            .map(|p| p.as_ref().to_path_buf())
            .unwrap_or_else(Settings::default_path);

        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Settings::default());
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Unable to read config file at {}", path.display()))?;

        serde_yaml::from_str(&raw)
            .with_context(|| format!("Malformed YAML in config file {}", path.display()))
    }

    /// Persist the settings to disk, creating parent directories if needed.
    pub fn save<P: AsRef<Path>>(&self, path: Option<P>) -> Result<()> {
        let path = path
            .map(|p| p.as_ref().to_path_buf())
            .unwrap_or_else(Settings::default_path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Unable to create config directory {}", parent.display())
            })?;
        }

        let serialized = serde_yaml::to_string(self)?;
        fs::write(&path, serialized)
            .with_context(|| format!("Unable to write config file {}", path.display()))?;

        Ok(())
    }

    fn default_path() -> PathBuf {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".zendesk");
        path.push("config.yaml");
        path
    }
}

impl ConfigProvider for Settings {
    fn get(&self, key: &str) -> Option<String> {
        match key {
            CONFIG_DOMAIN => self.domain.clone(),
            CONFIG_EMAIL => self.email.clone(),
            CONFIG_PASSWORD => self.api_token.clone(),
            _ => None,
        }
    }
}
