//! Monetary amounts.
//!
//! Amounts are integer counts of the smallest currency unit. One whole
//! currency unit is [`UNIT`] smallest units. All ledger arithmetic is checked:
//! an overflow is reported as [`LedgerError::AmountOverflow`] and never wraps.

use crate::error::LedgerError;

/// Count of the smallest currency unit.
pub type Amount = u64;

/// Smallest units per whole currency unit.
pub const UNIT: Amount = 1_000_000_000;

/// Default funding an airline must provide before it becomes operational.
pub const DEFAULT_FUNDING_THRESHOLD: Amount = 10 * UNIT;

/// Default maximum insurable amount per policy.
pub const DEFAULT_MAX_INSURANCE: Amount = UNIT;

/// Percentage base for payout multipliers (`150` means 1.5x).
pub const PERCENT_BASE: u64 = 100;

/// Returns `n` whole currency units.
///
/// # Errors
///
/// Returns `LedgerError::AmountOverflow` if the result does not fit.
pub fn units(n: u64) -> Result<Amount, LedgerError> {
    n.checked_mul(UNIT).ok_or(LedgerError::AmountOverflow)
}

/// Adds two amounts.
///
/// # Errors
///
/// Returns `LedgerError::AmountOverflow` on overflow.
pub fn checked_add(a: Amount, b: Amount) -> Result<Amount, LedgerError> {
    a.checked_add(b).ok_or(LedgerError::AmountOverflow)
}

/// Computes `insured * multiplier_percent / 100`, truncating.
///
/// # Errors
///
/// Returns `LedgerError::AmountOverflow` if the intermediate product does not
/// fit.
pub fn payout(insured: Amount, multiplier_percent: u32) -> Result<Amount, LedgerError> {
    insured
        .checked_mul(u64::from(multiplier_percent))
        .map(|product| product / PERCENT_BASE)
        .ok_or(LedgerError::AmountOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payout_applies_multiplier() {
        assert_eq!(payout(UNIT, 150).unwrap(), UNIT + UNIT / 2);
        assert_eq!(payout(UNIT, 100).unwrap(), UNIT);
    }

    #[test]
    fn payout_truncates() {
        // 3 * 150 / 100 = 4.5
        assert_eq!(payout(3, 150).unwrap(), 4);
        assert_eq!(payout(1, 99).unwrap(), 0);
    }

    #[test]
    fn payout_overflow_is_reported() {
        assert!(matches!(
            payout(Amount::MAX, 150),
            Err(LedgerError::AmountOverflow)
        ));
    }

    #[test]
    fn units_scale() {
        assert_eq!(units(10).unwrap(), DEFAULT_FUNDING_THRESHOLD);
        assert!(units(u64::MAX).is_err());
    }
}
