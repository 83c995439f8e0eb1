//! Controller configuration.
//!
//! A controller file carries the ledger's `[ledger]` table plus an optional
//! `[policy]` table:
//!
//! ```toml
//! [ledger]
//! owner = "owner"
//! controller = "controller"
//! genesis_airline = "airline-1"
//!
//! [policy]
//! consensus_threshold = 4
//! payout_multiplier_percent = 150
//! ```

use std::path::Path;

use flightsurety_core::config::{ConfigError, LedgerConfig};
use serde::{Deserialize, Serialize};

use crate::policy::PolicyConfig;

/// Complete configuration of a [`Controller`](crate::Controller).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControllerConfig {
    /// Ledger core configuration. Its `controller` is the identity the
    /// controller calls the ledger with.
    pub ledger: LedgerConfig,

    /// Admission and payout policy.
    #[serde(default)]
    pub policy: PolicyConfig,
}

impl ControllerConfig {
    /// Creates a configuration with the default policy.
    #[must_use]
    pub fn new(ledger: LedgerConfig) -> Self {
        Self {
            ledger,
            policy: PolicyConfig::default(),
        }
    }

    /// Sets the policy (builder pattern).
    #[must_use]
    pub const fn with_policy(mut self, policy: PolicyConfig) -> Self {
        self.policy = policy;
        self
    }

    /// Validates both tables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` describing the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ledger.validate()?;
        self.policy.validate()
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails validation.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flightsurety_core::identity::AccountId;

    use super::*;

    const FULL: &str = r#"
        [ledger]
        owner = "owner"
        controller = "controller"
        genesis_airline = "airline-1"

        [policy]
        consensus_threshold = 6
        payout_multiplier_percent = 200
    "#;

    #[test]
    fn test_parse_full_config() {
        let config = ControllerConfig::from_toml(FULL).unwrap();
        assert_eq!(config.ledger.controller.as_str(), "controller");
        assert_eq!(config.policy.consensus_threshold, 6);
        assert_eq!(config.policy.payout_multiplier_percent, 200);
    }

    #[test]
    fn test_policy_table_is_optional() {
        let toml = r#"
            [ledger]
            owner = "owner"
            controller = "controller"
        "#;
        let config = ControllerConfig::from_toml(toml).unwrap();
        assert_eq!(config.policy, PolicyConfig::default());
    }

    #[test]
    fn test_invalid_policy_is_rejected() {
        let toml = r#"
            [ledger]
            owner = "owner"
            controller = "controller"

            [policy]
            payout_multiplier_percent = 0
        "#;
        assert!(matches!(
            ControllerConfig::from_toml(toml),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();

        let config = ControllerConfig::from_file(file.path()).unwrap();
        assert_eq!(
            config.ledger.genesis_airline,
            Some(AccountId::new("airline-1").unwrap())
        );
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = ControllerConfig::from_file(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ControllerConfig::from_toml(FULL).unwrap();
        let text = config.to_toml().unwrap();
        assert_eq!(ControllerConfig::from_toml(&text).unwrap(), config);
    }
}
