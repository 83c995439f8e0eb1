//! Outbound value transfer seam.
//!
//! Settlement mechanics are out of scope for the ledger; a payout only needs
//! an opaque "transfer value to party" primitive. Embedders supply a
//! [`ValueTransfer`] implementation. [`RecordingTransfer`] keeps settled
//! payouts in memory.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use crate::amount::Amount;
use crate::identity::AccountId;

/// Errors reported by a [`ValueTransfer`] implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransferError {
    /// The transfer target refused the value.
    #[error("transfer rejected: {reason}")]
    Rejected {
        /// Why the transfer was rejected.
        reason: String,
    },

    /// The settlement backend is unavailable.
    #[error("transfer backend unavailable: {reason}")]
    Unavailable {
        /// Why the backend is unavailable.
        reason: String,
    },
}

/// Moves value from the ledger to a party.
///
/// Called after the ledger has already zeroed the payee's credit, so an
/// implementation that re-enters the ledger observes the post-withdrawal
/// state.
pub trait ValueTransfer: Send + Sync {
    /// Transfers `amount` to `to`.
    ///
    /// # Errors
    ///
    /// Returns `TransferError` if the value could not be delivered. The
    /// ledger restores the payee's credit in that case.
    fn transfer(&self, to: &AccountId, amount: Amount) -> Result<(), TransferError>;
}

/// A settled transfer recorded by [`RecordingTransfer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledTransfer {
    /// The payee.
    pub to: AccountId,
    /// The amount delivered.
    pub amount: Amount,
}

/// In-memory [`ValueTransfer`] that records every settled transfer.
#[derive(Debug, Default)]
pub struct RecordingTransfer {
    settled: Mutex<Vec<SettledTransfer>>,
    failing: AtomicBool,
}

impl RecordingTransfer {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent transfers fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns a copy of all settled transfers in order.
    #[must_use]
    pub fn settled(&self) -> Vec<SettledTransfer> {
        self.settled
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Returns the total amount delivered to `to`, saturating at
    /// `Amount::MAX`.
    #[must_use]
    pub fn total_to(&self, to: &AccountId) -> Amount {
        self.settled
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .filter(|t| &t.to == to)
            .fold(0, |total: Amount, t| total.saturating_add(t.amount))
    }
}

impl ValueTransfer for RecordingTransfer {
    fn transfer(&self, to: &AccountId, amount: Amount) -> Result<(), TransferError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransferError::Rejected {
                reason: "recorder set to fail".to_string(),
            });
        }
        self.settled
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(SettledTransfer {
                to: to.clone(),
                amount,
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_tracks_transfers() {
        let recorder = RecordingTransfer::new();
        let alice = AccountId::new("alice").unwrap();
        let bob = AccountId::new("bob").unwrap();

        recorder.transfer(&alice, 5).unwrap();
        recorder.transfer(&bob, 7).unwrap();
        recorder.transfer(&alice, 1).unwrap();

        assert_eq!(recorder.settled().len(), 3);
        assert_eq!(recorder.total_to(&alice), 6);
        assert_eq!(recorder.total_to(&bob), 7);
    }

    #[test]
    fn failing_recorder_records_nothing() {
        let recorder = RecordingTransfer::new();
        let alice = AccountId::new("alice").unwrap();
        recorder.set_failing(true);

        assert!(recorder.transfer(&alice, 5).is_err());
        assert!(recorder.settled().is_empty());
    }

    #[test]
    fn total_saturates_instead_of_overflowing() {
        let recorder = RecordingTransfer::new();
        let whale = AccountId::new("whale").unwrap();
        recorder.transfer(&whale, Amount::MAX).unwrap();
        recorder.transfer(&whale, 1).unwrap();

        assert_eq!(recorder.total_to(&whale), Amount::MAX);
    }
}
