use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::modules::store::Money;

/// Errors raised while reading or writing the settings file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("config file corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Application settings: token issuer/audience identity, the fixed charge
/// amount and the store location. The signing secret is deliberately not
/// here; it lives in the OS keyring (see the security module).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    pub issuer: String,
    pub audience: String,
    pub charge_amount: Money,
    pub store_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            issuer: "paygate".to_string(),
            audience: "paygate-clients".to_string(),
            charge_amount: Money::from_cents(110),
            store_file: "paygate-store.json".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a file, falling back to defaults when the
    /// file does not exist. A present-but-unreadable file is an error.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.issuer, "paygate");
        assert_eq!(config.audience, "paygate-clients");
        assert_eq!(config.charge_amount.to_string(), "1.10");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config.issuer, Config::default().issuer);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("paygate.json");

        let mut config = Config::default();
        config.issuer = "custom".to_string();
        config.charge_amount = Money::from_cents(250);
        config.save(&path).unwrap();

        let loaded = Config::load_or_default(&path).unwrap();
        assert_eq!(loaded.issuer, "custom");
        assert_eq!(loaded.charge_amount.to_string(), "2.50");
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("paygate.json");
        std::fs::write(&path, "{{{{").unwrap();
        assert!(matches!(
            Config::load_or_default(&path),
            Err(ConfigError::Corrupt(_))
        ));
    }
}
