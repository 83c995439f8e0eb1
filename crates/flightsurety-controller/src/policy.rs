//! Admission and payout policy.

use flightsurety_core::config::ConfigError;
use serde::{Deserialize, Serialize};

/// Operational-airline count from which admissions require a vote.
pub const DEFAULT_CONSENSUS_THRESHOLD: usize = 4;

/// Payout multiplier applied to newly registered flights, in percent.
pub const DEFAULT_PAYOUT_MULTIPLIER_PERCENT: u32 = 150;

/// Policy knobs applied by the controller on top of the ledger core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    /// Below this many operational airlines, sponsors admit candidates
    /// directly; at or above it, admission is voted.
    #[serde(default = "default_consensus_threshold")]
    pub consensus_threshold: usize,

    /// Multiplier stored on every flight the controller registers.
    #[serde(default = "default_payout_multiplier_percent")]
    pub payout_multiplier_percent: u32,
}

const fn default_consensus_threshold() -> usize {
    DEFAULT_CONSENSUS_THRESHOLD
}

const fn default_payout_multiplier_percent() -> u32 {
    DEFAULT_PAYOUT_MULTIPLIER_PERCENT
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            consensus_threshold: DEFAULT_CONSENSUS_THRESHOLD,
            payout_multiplier_percent: DEFAULT_PAYOUT_MULTIPLIER_PERCENT,
        }
    }
}

impl PolicyConfig {
    /// Returns `true` if a candidate must be voted in given the current
    /// number of operational airlines.
    #[must_use]
    pub const fn requires_vote(&self, operational_airlines: usize) -> bool {
        operational_airlines >= self.consensus_threshold
    }

    /// Returns the votes needed to admit a candidate: half the operational
    /// airlines, rounded up, and never less than one.
    #[must_use]
    pub const fn required_votes(&self, operational_airlines: usize) -> usize {
        let half = operational_airlines.div_ceil(2);
        if half == 0 { 1 } else { half }
    }

    /// Validates the policy.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the payout multiplier is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.payout_multiplier_percent == 0 {
            return Err(ConfigError::Validation(
                "payout_multiplier_percent must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let policy = PolicyConfig::default();
        assert_eq!(policy.consensus_threshold, 4);
        assert_eq!(policy.payout_multiplier_percent, 150);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn vote_required_from_threshold() {
        let policy = PolicyConfig::default();
        assert!(!policy.requires_vote(3));
        assert!(policy.requires_vote(4));
        assert!(policy.requires_vote(9));
    }

    #[test]
    fn required_votes_is_half_rounded_up() {
        let policy = PolicyConfig::default();
        assert_eq!(policy.required_votes(0), 1);
        assert_eq!(policy.required_votes(1), 1);
        assert_eq!(policy.required_votes(4), 2);
        assert_eq!(policy.required_votes(5), 3);
        assert_eq!(policy.required_votes(6), 3);
    }

    #[test]
    fn zero_multiplier_is_invalid() {
        let policy = PolicyConfig {
            payout_multiplier_percent: 0,
            ..PolicyConfig::default()
        };
        assert!(matches!(policy.validate(), Err(ConfigError::Validation(_))));
    }
}
