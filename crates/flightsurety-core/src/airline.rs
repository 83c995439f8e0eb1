//! Airline membership records.
//!
//! ```text
//! Unregistered --register--> Registered (funds < threshold)
//!                                 |
//!                               fund (cumulative funds >= threshold)
//!                                 v
//!                             Operational
//! ```
//!
//! Operability is monotonic: funding only ever increases and the ledger
//! never revokes an airline's operational flag.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::amount::{Amount, checked_add};
use crate::error::LedgerError;
use crate::identity::AccountId;

/// A registered airline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Airline {
    /// Cumulative funding provided by the airline.
    pub funds: Amount,
    /// Whether `funds` has reached the funding threshold.
    pub operational: bool,
}

impl Airline {
    /// Returns the airline state after adding `amount` of funding.
    ///
    /// The receiver is left untouched so callers can validate before
    /// committing.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::AmountOverflow` if cumulative funds overflow.
    pub fn funded(&self, amount: Amount, threshold: Amount) -> Result<Self, LedgerError> {
        let funds = checked_add(self.funds, amount)?;
        Ok(Self {
            funds,
            operational: self.operational || funds >= threshold,
        })
    }
}

/// Votes cast for a single candidate airline.
///
/// Voters are kept in a set so a repeated vote cannot inflate the count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoteRecord {
    voters: BTreeSet<AccountId>,
}

impl VoteRecord {
    /// Returns the number of distinct voters.
    #[must_use]
    pub fn count(&self) -> usize {
        self.voters.len()
    }

    /// Returns `true` if `voter` has voted.
    #[must_use]
    pub fn contains(&self, voter: &AccountId) -> bool {
        self.voters.contains(voter)
    }

    /// Iterates voters in identity order.
    pub fn voters(&self) -> impl Iterator<Item = &AccountId> {
        self.voters.iter()
    }

    pub(crate) fn insert(&mut self, voter: AccountId) -> bool {
        self.voters.insert(voter)
    }
}
