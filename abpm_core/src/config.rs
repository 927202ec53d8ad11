//! Configuration file support for the ABPM tools.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/abpm/config.toml`.

use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub pull: PullConfig,
}

/// Data storage configuration
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

impl DataConfig {
    /// Directory holding one JSON file per pulled test
    pub fn records_dir(&self) -> PathBuf {
        self.data_dir.join("api-data")
    }

    /// Default location of the assembled dataset
    pub fn dataset_path(&self) -> PathBuf {
        self.data_dir.join("sleep_dataset.csv")
    }
}

/// Clinical API connection settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_url")]
    pub url: String,

    #[serde(default)]
    pub username: String,

    /// Usually left empty and supplied through `ABPM_API_PASSWORD`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            username: String::new(),
            password: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Puller parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PullConfig {
    /// Tests that started after this date end the pull
    #[serde(default = "default_end_date")]
    pub end_date: NaiveDate,

    #[serde(default = "default_concurrent_workers")]
    pub concurrent_workers: usize,

    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: usize,
}

impl Default for PullConfig {
    fn default() -> Self {
        Self {
            end_date: default_end_date(),
            concurrent_workers: default_concurrent_workers(),
            max_consecutive_errors: default_max_consecutive_errors(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("abpm")
}

fn default_api_url() -> String {
    "https://apimapa.sicor.com.co".into()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_end_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default()
}

fn default_concurrent_workers() -> usize {
    100
}

fn default_max_consecutive_errors() -> usize {
    150
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("abpm").join("config.toml")
    }

    /// Reject values the puller cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.pull.concurrent_workers == 0 {
            return Err(Error::Config(
                "pull.concurrent_workers must be at least 1".into(),
            ));
        }
        if self.api.url.trim().is_empty() {
            return Err(Error::Config("api.url must not be empty".into()));
        }
        Ok(())
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.url, "https://apimapa.sicor.com.co");
        assert_eq!(config.pull.concurrent_workers, 100);
        assert_eq!(config.pull.max_consecutive_errors, 150);
        assert_eq!(
            config.pull.end_date,
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
        );
        assert!(config.data.records_dir().ends_with("api-data"));
    }

    #[test]
    fn test_config_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("abpm").join("config.toml");

        let mut config = Config::default();
        config.api.username = "clinic".into();
        config.pull.concurrent_workers = 8;
        config.save_to(&path).unwrap();

        let parsed = Config::load_from(&path).unwrap();
        assert_eq!(parsed.api.username, "clinic");
        assert_eq!(parsed.pull.concurrent_workers, 8);
        assert_eq!(parsed.pull.end_date, config.pull.end_date);
    }

    #[test]
    fn test_password_not_written_when_empty() {
        let toml_str = toml::to_string(&Config::default()).unwrap();
        assert!(!toml_str.contains("password"));
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[pull]
end_date = "2019-06-30"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.pull.end_date,
            NaiveDate::from_ymd_opt(2019, 6, 30).unwrap()
        );
        assert_eq!(config.pull.concurrent_workers, 100); // default
        assert_eq!(config.api.timeout_secs, 30); // default
    }

    #[test]
    fn test_zero_workers_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[pull]\nconcurrent_workers = 0\n").unwrap();

        let result = Config::load_from(&path);
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
