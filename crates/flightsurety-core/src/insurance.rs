//! Passenger insurance records.
//!
//! Records are keyed by [`PolicyKey`] (passenger, flight), so one passenger
//! can hold cover on several flights at once.
//!
//! ```text
//! buy ----------> Insured   (credit = 0, credited = false)
//! credit -------> Credited  (credit = insured * multiplier / 100)
//! pay ----------> Settled   (credit = 0, insured = 0)
//! ```

use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::flight::FlightKey;
use crate::identity::AccountId;

/// Identity of one insurance policy.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyKey {
    /// The insured passenger.
    pub passenger: AccountId,
    /// The insured flight.
    pub flight: FlightKey,
}

impl PolicyKey {
    /// Creates a policy key.
    #[must_use]
    pub const fn new(passenger: AccountId, flight: FlightKey) -> Self {
        Self { passenger, flight }
    }
}

/// A passenger's cover on one flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InsuranceRecord {
    /// Wallet that receives payouts.
    pub wallet: AccountId,
    /// Premium paid (zeroed on withdrawal).
    pub insured_amount: Amount,
    /// Payout owed but not yet withdrawn.
    pub insurance_credit: Amount,
    /// Whether the policy has been credited.
    pub credited: bool,
}

impl InsuranceRecord {
    pub(crate) const fn new(wallet: AccountId, insured_amount: Amount) -> Self {
        Self {
            wallet,
            insured_amount,
            insurance_credit: 0,
            credited: false,
        }
    }
}

/// A withdrawal whose state change is committed but whose transfer is in
/// flight.
///
/// Returned by `Ledger::begin_payout` and handed back to either
/// `Ledger::complete_payout` or `Ledger::revert_payout`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PendingPayout {
    /// The policy being paid out.
    pub policy: PolicyKey,
    /// Amount to transfer.
    pub amount: Amount,
    /// Premium that was zeroed alongside the credit.
    pub insured_amount: Amount,
}

/// Outcome of crediting a flight's passengers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreditSummary {
    /// Passengers credited by this call.
    pub passengers_credited: usize,
    /// Sum of payouts credited by this call.
    pub total_credited: Amount,
}
