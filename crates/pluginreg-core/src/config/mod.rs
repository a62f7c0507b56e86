//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use pluginreg_manifest::Schema;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::split_list;

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "PLUGINREG_CONFIG_DIR";

/// Pluginreg configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub registry: RegistryConfig,
    pub fetch: FetchConfig,
    pub schema: Schema,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Registry file; `.json` selects JSON, anything else TOML
    pub path: PathBuf,
    /// API version written into new registries
    pub api_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub manifest_file: String,
    pub user_agent: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("plugins.toml"),
            api_version: "3.0".to_string(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            manifest_file: pluginreg_manifest::fetcher::MANIFEST_FILE.to_string(),
            user_agent: format!("pluginreg/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration keys in display order
pub const KEYS: &[&str] = &[
    "registry.path",
    "registry.api_version",
    "fetch.timeout_secs",
    "fetch.manifest_file",
    "fetch.user_agent",
    "schema.trust_levels",
    "schema.categories",
    "schema.id_max_length",
];

impl Config {
    /// Keys accepted by [`Config::get`] and [`Config::set`]
    pub fn keys() -> &'static [&'static str] {
        KEYS
    }

    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var(CONFIG_DIR_ENV) {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("pluginreg")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, or use defaults if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        self.validate()?;

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.registry.path.as_os_str().is_empty() {
            return Err(anyhow!("registry.path cannot be empty"));
        }
        if self.registry.api_version.trim().is_empty() {
            return Err(anyhow!("registry.api_version cannot be empty"));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(anyhow!("fetch.timeout_secs must be greater than zero"));
        }
        if self.fetch.manifest_file.trim().is_empty() {
            return Err(anyhow!("fetch.manifest_file cannot be empty"));
        }
        self.schema.check().map_err(|e| anyhow!(e))
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            "registry.path" => Ok(self.registry.path.display().to_string()),
            "registry.api_version" => Ok(self.registry.api_version.clone()),
            "fetch.timeout_secs" => Ok(self.fetch.timeout_secs.to_string()),
            "fetch.manifest_file" => Ok(self.fetch.manifest_file.clone()),
            "fetch.user_agent" => Ok(self.fetch.user_agent.clone()),
            "schema.trust_levels" => Ok(self.schema.trust_levels.join(", ")),
            "schema.categories" => Ok(self.schema.categories.join(", ")),
            "schema.id_max_length" => Ok(self.schema.id_max_length.to_string()),
            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `pluginreg config list` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut updated = self.clone();
        match key {
            "registry.path" => {
                updated.registry.path = PathBuf::from(value);
            }
            "registry.api_version" => {
                updated.registry.api_version = value.to_string();
            }
            "fetch.timeout_secs" => {
                updated.fetch.timeout_secs = value
                    .parse()
                    .with_context(|| format!("Invalid timeout_secs value: {}", value))?;
            }
            "fetch.manifest_file" => {
                updated.fetch.manifest_file = value.to_string();
            }
            "fetch.user_agent" => {
                updated.fetch.user_agent = value.to_string();
            }
            "schema.trust_levels" => {
                updated.schema.trust_levels = split_list(value);
            }
            "schema.categories" => {
                updated.schema.categories = split_list(value);
            }
            "schema.id_max_length" => {
                updated.schema.id_max_length = value
                    .parse()
                    .with_context(|| format!("Invalid id_max_length value: {}", value))?;
            }
            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `pluginreg config list` to see available keys.",
                    key
                ));
            }
        }
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.registry.path, PathBuf::from("plugins.toml"));
        assert_eq!(config.registry.api_version, "3.0");
        assert_eq!(config.fetch.timeout(), Duration::from_secs(10));
        assert_eq!(config.fetch.manifest_file, "MANIFEST.toml");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_get_and_set() {
        let mut config = Config::default();
        config.set("schema.categories", "metadata, lyrics").unwrap();
        assert_eq!(config.get("schema.categories").unwrap(), "metadata, lyrics");
        assert!(config.schema.is_category("lyrics"));

        config.set("fetch.timeout_secs", "30").unwrap();
        assert_eq!(config.fetch.timeout_secs, 30);

        assert!(config.set("fetch.timeout_secs", "soon").is_err());
        assert!(config.set("fetch.timeout_secs", "0").is_err());
        assert!(config.set("schema.trust_levels", "").is_err());
        assert!(config.get("nope").is_err());
    }

    #[test]
    fn test_rejected_set_leaves_config_unchanged() {
        let mut config = Config::default();
        config.set("fetch.timeout_secs", "45").unwrap();
        let before = config.clone();

        assert!(config.set("fetch.timeout_secs", "0").is_err());
        assert!(config.set("schema.trust_levels", "").is_err());
        assert!(config.set("schema.categories", " , ").is_err());
        assert_eq!(config, before);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_every_key_is_readable() {
        let config = Config::default();
        for key in KEYS {
            assert!(config.get(key).is_ok(), "key {} not readable", key);
        }
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.set("registry.path", "registry/plugins.json").unwrap();
        config.set("schema.categories", "metadata,other").unwrap();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[fetch]\ntimeout_secs = 3\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.fetch.timeout_secs, 3);
        assert_eq!(config.registry.api_version, "3.0");
        assert!(config.schema.is_trust_level("official"));
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }
}
