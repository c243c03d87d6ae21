use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Database configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: String,
}

/// Currency-rate API configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CurrencyConfig {
    /// Base URL of the rate endpoint
    pub api_url: String,
    /// API key; when unset, the API_KEY_CURRENCIES environment variable is used
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl CurrencyConfig {
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("API_KEY_CURRENCIES").ok())
    }
}

/// Global application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Application name
    pub app_name: String,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Currency-rate API configuration
    pub currency: CurrencyConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "Bank Ledger".to_string(),
            database: DatabaseConfig {
                path: "data/ledger.db".to_string(),
            },
            currency: CurrencyConfig {
                api_url: "https://api.freecurrencyapi.com/v1/latest".to_string(),
                api_key: None,
                timeout_secs: 10,
            },
        }
    }
}

/// Load configuration from file, writing the defaults on first run.
pub fn load_config(path: &str) -> Result<Config> {
    if !Path::new(path).exists() {
        let default_config = Config::default();
        save_config(path, &default_config)?;
        return Ok(default_config);
    }

    let mut file = File::open(path).with_context(|| format!("Failed to open config file: {}", path))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .context("Failed to read config file")?;

    let config: Config = match path.ends_with(".toml") {
        true => toml::from_str(&contents).context("Failed to parse TOML config")?,
        false => serde_json::from_str(&contents).context("Failed to parse JSON config")?,
    };

    Ok(config)
}

/// Save configuration to file
pub fn save_config(path: &str, config: &Config) -> Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
    }

    let serialized = match path.ends_with(".toml") {
        true => toml::to_string_pretty(config).context("Failed to serialize config to TOML")?,
        false => serde_json::to_string_pretty(config).context("Failed to serialize config to JSON")?,
    };

    std::fs::write(path, serialized)
        .with_context(|| format!("Failed to write config to file: {}", path))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.app_name, "Bank Ledger");
        assert_eq!(config.database.path, "data/ledger.db");
        assert_eq!(
            config.currency.api_url,
            "https://api.freecurrencyapi.com/v1/latest"
        );
        assert_eq!(config.currency.timeout_secs, 10);
    }

    #[test]
    fn test_load_save_config() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("test_config.toml");
        let config_path_str = config_path.to_str().unwrap();

        let mut config = Config::default();
        config.database.path = "scratch/other.db".to_string();
        save_config(config_path_str, &config).unwrap();

        let loaded_config = load_config(config_path_str).unwrap();
        assert_eq!(loaded_config.app_name, config.app_name);
        assert_eq!(loaded_config.database.path, "scratch/other.db");
    }

    #[test]
    fn test_missing_config_creates_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("fresh.toml");
        let config_path_str = config_path.to_str().unwrap();

        let config = load_config(config_path_str).unwrap();
        assert_eq!(config.app_name, Config::default().app_name);
        assert!(config_path.exists());
    }
}
