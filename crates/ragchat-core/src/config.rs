use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

use crate::session_api::SessionApi;
use crate::settings::ChatSettings;

/// Backend used when nothing else is configured, fixed at build time
pub const BACKEND_URI: &str = match option_env!("RAGCHAT_BACKEND_URI") {
    Some(uri) => uri,
    None => "http://localhost:5000",
};

/// Runtime override for the backend, checked before the config file
pub const BACKEND_URI_ENV: &str = "RAGCHAT_BACKEND_URI";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub backend_uri: Option<String>,
    pub session_api: Option<SessionApi>,
    #[serde(default)]
    pub settings: ChatSettings,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    pub fn save_settings(settings: &ChatSettings) -> Result<()> {
        Self::save_settings_to(&Self::get_config_path()?, settings)
    }

    /// Replace only the settings in the file at `config_path`. An unreadable
    /// file is left untouched.
    pub fn save_settings_to(config_path: &Path, settings: &ChatSettings) -> Result<()> {
        let mut config = Self::load_from(config_path)?;
        config.settings = settings.clone();
        config.save_to(config_path)
    }

    /// Backend base URL: environment first, then the config file, then the
    /// build-time default.
    pub fn backend_uri(&self) -> String {
        std::env::var(BACKEND_URI_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.backend_uri.clone())
            .unwrap_or_else(|| BACKEND_URI.to_string())
    }

    pub fn session_api(&self) -> SessionApi {
        self.session_api.unwrap_or_default()
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("ragchat").join("config.json"))
    }
}
