//! Configuration file support for fitlog.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/fitlog/config.toml`.
//! `FITLOG_BACKEND_URL` overrides the configured API base URL.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the backend base URL
pub const BACKEND_URL_ENV: &str = "FITLOG_BACKEND_URL";

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub goals: GoalsConfig,
}

/// Backend connection configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// Local storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Targets shown on the progress screen
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GoalsConfig {
    #[serde(default = "default_weekly_workouts")]
    pub weekly_workouts: u64,
}

impl Default for GoalsConfig {
    fn default() -> Self {
        Self {
            weekly_workouts: default_weekly_workouts(),
        }
    }
}

// Default value functions
fn default_base_url() -> String {
    "http://localhost:8001".into()
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fitlog")
}

fn default_weekly_workouts() -> u64 {
    3
}

impl Config {
    /// Load configuration from the standard config path, then apply the environment
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        let mut config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            tracing::debug!("No config file found at {:?}, using defaults", config_path);
            Self::default()
        };
        config.apply_env_override(std::env::var(BACKEND_URL_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Replace the base URL with a non-empty environment value
    pub fn apply_env_override(&mut self, value: Option<String>) {
        if let Some(url) = value.filter(|v| !v.trim().is_empty()) {
            tracing::debug!("Using backend URL from {}", BACKEND_URL_ENV);
            self.api.base_url = url.trim().to_string();
        }
    }

    /// Reject settings the client cannot work with
    pub fn validate(&self) -> Result<()> {
        let url = self.api.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "api.base_url must start with http:// or https://, got '{}'",
                url
            )));
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fitlog")
            .join("config.toml")
    }

    /// Path of the persisted draft workout
    pub fn draft_path(&self) -> PathBuf {
        self.data.data_dir.join("draft.json")
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:8001");
        assert_eq!(config.goals.weekly_workouts, 3);
        assert!(config.draft_path().ends_with("fitlog/draft.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[api]
base_url = "https://fit.example.com"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api.base_url, "https://fit.example.com");
        assert_eq!(config.goals.weekly_workouts, 3); // default
    }

    #[test]
    fn test_env_override() {
        let mut config = Config::default();
        config.apply_env_override(Some("https://env.example.com ".into()));
        assert_eq!(config.api.base_url, "https://env.example.com");

        config.apply_env_override(Some("   ".into()));
        assert_eq!(config.api.base_url, "https://env.example.com");

        config.apply_env_override(None);
        assert_eq!(config.api.base_url, "https://env.example.com");
    }

    #[test]
    fn test_invalid_base_url() {
        let mut config = Config::default();
        config.api.base_url = "localhost:8001".into();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
