//! Ledger configuration.
//!
//! The ledger's authorization roots and monetary constants are explicit
//! configuration handed to [`Ledger::new`](crate::ledger::Ledger::new); there
//! is no "first caller becomes owner" path. Configuration is usually loaded
//! from the `[ledger]` table of a TOML file:
//!
//! ```toml
//! [ledger]
//! owner = "owner"
//! controller = "controller"
//! genesis_airline = "airline-1"
//! funding_threshold = 10000000000
//! max_insurance = 1000000000
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::amount::{Amount, DEFAULT_FUNDING_THRESHOLD, DEFAULT_MAX_INSURANCE};
use crate::identity::AccountId;

/// Configuration for a ledger instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// Immutable owner; the only identity that may flip the operational
    /// switch or rotate the controller.
    pub owner: AccountId,

    /// Initially authorized controller.
    pub controller: AccountId,

    /// Airline registered at construction, if any.
    #[serde(default)]
    pub genesis_airline: Option<AccountId>,

    /// Cumulative funding at which an airline becomes operational.
    #[serde(default = "default_funding_threshold")]
    pub funding_threshold: Amount,

    /// Maximum insurable amount per policy.
    #[serde(default = "default_max_insurance")]
    pub max_insurance: Amount,
}

const fn default_funding_threshold() -> Amount {
    DEFAULT_FUNDING_THRESHOLD
}

const fn default_max_insurance() -> Amount {
    DEFAULT_MAX_INSURANCE
}

impl LedgerConfig {
    /// Creates a configuration with default monetary constants.
    #[must_use]
    pub const fn new(owner: AccountId, controller: AccountId) -> Self {
        Self {
            owner,
            controller,
            genesis_airline: None,
            funding_threshold: DEFAULT_FUNDING_THRESHOLD,
            max_insurance: DEFAULT_MAX_INSURANCE,
        }
    }

    /// Sets the genesis airline (builder pattern).
    #[must_use]
    pub fn with_genesis_airline(mut self, airline: AccountId) -> Self {
        self.genesis_airline = Some(airline);
        self
    }

    /// Sets the funding threshold (builder pattern).
    #[must_use]
    pub const fn with_funding_threshold(mut self, threshold: Amount) -> Self {
        self.funding_threshold = threshold;
        self
    }

    /// Sets the insurance cap (builder pattern).
    #[must_use]
    pub const fn with_max_insurance(mut self, cap: Amount) -> Self {
        self.max_insurance = cap;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if a monetary constant is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.funding_threshold == 0 {
            return Err(ConfigError::Validation(
                "funding_threshold must be greater than zero".to_string(),
            ));
        }
        if self.max_insurance == 0 {
            return Err(ConfigError::Validation(
                "max_insurance must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Wrapper for files that carry the ledger config in a `[ledger]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LedgerConfigFile {
    ledger: LedgerConfig,
}

impl LedgerConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string containing a `[ledger]` table.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails validation.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let file: LedgerConfigFile = toml::from_str(content)?;
        file.ledger.validate()?;
        Ok(file.ledger)
    }

    /// Serialize configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        let file = LedgerConfigFile {
            ledger: self.clone(),
        };
        toml::to_string_pretty(&file).map_err(ConfigError::Serialize)
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error reading configuration file.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Validation error.
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::amount::UNIT;

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
            [ledger]
            owner = "owner"
            controller = "controller"
        "#;

        let config = LedgerConfig::from_toml(toml).unwrap();
        assert_eq!(config.owner.as_str(), "owner");
        assert_eq!(config.controller.as_str(), "controller");
        assert_eq!(config.genesis_airline, None);
        assert_eq!(config.funding_threshold, 10 * UNIT);
        assert_eq!(config.max_insurance, UNIT);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [ledger]
            owner = "owner"
            controller = "controller"
            genesis_airline = "airline-1"
            funding_threshold = 5000
            max_insurance = 100
        "#;

        let config = LedgerConfig::from_toml(toml).unwrap();
        assert_eq!(config.genesis_airline.unwrap().as_str(), "airline-1");
        assert_eq!(config.funding_threshold, 5000);
        assert_eq!(config.max_insurance, 100);
    }

    #[test]
    fn config_rejects_zero_threshold() {
        let toml = r#"
            [ledger]
            owner = "owner"
            controller = "controller"
            funding_threshold = 0
        "#;

        let result = LedgerConfig::from_toml(toml);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn config_rejects_invalid_identity() {
        let toml = r#"
            [ledger]
            owner = ""
            controller = "controller"
        "#;

        assert!(matches!(
            LedgerConfig::from_toml(toml),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn config_rejects_unknown_fields() {
        let toml = r#"
            [ledger]
            owner = "owner"
            controller = "controller"
            first_caller_is_owner = true
        "#;

        assert!(LedgerConfig::from_toml(toml).is_err());
    }

    #[test]
    fn config_toml_round_trip() {
        let config = LedgerConfig::new(
            AccountId::new("owner").unwrap(),
            AccountId::new("controller").unwrap(),
        )
        .with_genesis_airline(AccountId::new("airline-1").unwrap());

        let text = config.to_toml().unwrap();
        assert_eq!(LedgerConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[ledger]\nowner = \"owner\"\ncontroller = \"controller\"\nmax_insurance = 7"
        )
        .unwrap();

        let config = LedgerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.max_insurance, 7);
    }

    #[test]
    fn config_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = LedgerConfig::from_file(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
