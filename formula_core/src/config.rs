//! Configuration file support for formulary.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/formulary/config.toml`.

use crate::classifier::{RuleTable, SafetyRule};
use crate::{Error, Region, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub owner: OwnerConfig,

    #[serde(default)]
    pub formula: FormulaConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,
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
    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join("ingredients.json")
    }

    pub fn formulas_path(&self) -> PathBuf {
        self.data_dir.join("formulas.json")
    }
}

/// Identity used to scope formulas
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OwnerConfig {
    #[serde(default = "default_owner")]
    pub name: String,
}

impl Default for OwnerConfig {
    fn default() -> Self {
        Self {
            name: default_owner(),
        }
    }
}

/// Defaults for newly created formulas
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct FormulaConfig {
    #[serde(default)]
    pub default_region: Region,
}

/// Custom classification policy; empty means the built-in table
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct ClassifierConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<SafetyRule>,
}

fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("formulary")
}

fn default_owner() -> String {
    std::env::var("USER")
        .ok()
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| "default".to_string())
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!(
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
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("formulary").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// The classification policy in effect.
    ///
    /// A custom table that fails validation is rejected rather than used
    /// partially.
    pub fn rule_table(&self) -> Result<RuleTable> {
        if self.classifier.rules.is_empty() {
            return Ok(RuleTable::default());
        }

        let table = RuleTable::new(self.classifier.rules.clone());
        let problems = table.validate();
        if !problems.is_empty() {
            return Err(Error::Config(format!(
                "Invalid classifier rules: {}",
                problems.join("; ")
            )));
        }
        Ok(table)
    }
}
