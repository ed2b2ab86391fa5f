//! Configuration management
//!
//! Holds the power rule table, the only place tariff regulation is encoded.

use crate::core::{Error, Result, TariffCode};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Tariff whose rule set applies when an access code is unrecognized
pub const DEFAULT_TARIFF: TariffCode = TariffCode::Td30;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tarifas: TariffTable,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tarifas: TariffTable::default(),
        }
    }
}

impl Config {
    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

        let app_config_dir = config_dir.join("tunergia-comparador");

        if !app_config_dir.exists() {
            fs::create_dir_all(&app_config_dir)?;
        }

        Ok(app_config_dir.join("config.toml"))
    }

    /// Load configuration from disk
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Constraint set for one access tariff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerRule {
    /// Upper bound applied to every period, kW; None means unbounded
    #[serde(default)]
    pub max_power: Option<f64>,
    /// Lower bound on period 6 only, kW
    #[serde(default)]
    pub min_p6: Option<f64>,
    /// Number of power periods billed under this tariff (2 or 6)
    pub period_count: usize,
    /// Whether period values must be non-decreasing by period index
    #[serde(default)]
    pub ascending: bool,
}

/// Power rules per access tariff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffTable {
    /// Rules for 2.0TD supplies
    #[serde(default = "default_rule_20td")]
    pub td_20: PowerRule,
    /// Rules for 3.0TD supplies
    #[serde(default = "default_rule_30td")]
    pub td_30: PowerRule,
    /// Rules for 6.1TD supplies
    #[serde(default = "default_rule_61td")]
    pub td_61: PowerRule,
}

fn default_rule_20td() -> PowerRule {
    PowerRule {
        max_power: Some(15.0),
        min_p6: None,
        period_count: 2,
        ascending: false,
    }
}

fn default_rule_30td() -> PowerRule {
    PowerRule {
        max_power: None,
        min_p6: Some(15.1),
        period_count: 6,
        ascending: true,
    }
}

fn default_rule_61td() -> PowerRule {
    PowerRule {
        max_power: None,
        min_p6: None,
        period_count: 6,
        ascending: true,
    }
}

impl Default for TariffTable {
    fn default() -> Self {
        Self {
            td_20: default_rule_20td(),
            td_30: default_rule_30td(),
            td_61: default_rule_61td(),
        }
    }
}

impl TariffTable {
    /// Rule set for a parsed tariff code
    pub fn rules(&self, code: TariffCode) -> &PowerRule {
        match code {
            TariffCode::Td20 => &self.td_20,
            TariffCode::Td30 => &self.td_30,
            TariffCode::Td61 => &self.td_61,
        }
    }

    /// Rule set for a raw access-tariff string
    ///
    /// Unrecognized codes resolve to the `DEFAULT_TARIFF` rules.
    pub fn rules_for(&self, tarifa: &str) -> &PowerRule {
        match TariffCode::parse(tarifa) {
            Some(code) => self.rules(code),
            None => {
                log::warn!(
                    "Unknown access tariff '{}', using {} rules",
                    tarifa,
                    DEFAULT_TARIFF
                );
                self.rules(DEFAULT_TARIFF)
            }
        }
    }
}
