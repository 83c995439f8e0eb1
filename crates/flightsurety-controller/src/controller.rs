//! The controller: policy layer and sole caller of the ledger core.
//!
//! The [`Controller`] owns one [`Ledger`] behind a single mutex. Every
//! operation takes the lock once, makes its policy decision and performs the
//! core mutation under that one acquisition, so operations are serialized
//! exactly as if the ledger ran on a single-threaded substrate.
//!
//! The one exception is [`Controller::pay`]: the value transfer runs outside
//! the lock, between the ledger's `begin_payout` and `complete_payout` (or
//! `revert_payout`) phases. The credit is zeroed before the lock is
//! released, so a transfer target that re-enters the controller finds
//! nothing left to withdraw. While the payout is outstanding the ledger
//! refuses to pause or rotate its controller, so the settling phase always
//! runs under the same authority as the first.
//!
//! # Admission policy
//!
//! ```text
//! no airlines yet            -> register directly (bootstrap)
//! sponsor not operational    -> Unauthorized
//! operational < threshold    -> register directly
//! otherwise                  -> record sponsor's vote; register once
//!                               votes >= ceil(operational / 2)
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use flightsurety_core::amount::Amount;
use flightsurety_core::error::{LedgerError, Role};
use flightsurety_core::events::EventRecord;
use flightsurety_core::flight::{FlightKey, FlightStatus, Route};
use flightsurety_core::identity::AccountId;
use flightsurety_core::insurance::CreditSummary;
use flightsurety_core::ledger::{Ledger, LedgerReader, LedgerSnapshot};
use flightsurety_core::transfer::ValueTransfer;
use tracing::{debug, info, warn};

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::policy::PolicyConfig;

/// Outcome of an admission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The candidate is now a registered airline.
    Registered {
        /// Votes held at admission (0 for direct admission).
        votes: usize,
    },
    /// The vote was recorded; the candidate needs more votes.
    Pending {
        /// Distinct votes collected so far.
        votes: usize,
        /// Votes needed for admission.
        required: usize,
    },
}

impl Admission {
    /// Returns `true` if the candidate was admitted.
    #[must_use]
    pub const fn is_registered(&self) -> bool {
        matches!(self, Self::Registered { .. })
    }
}

/// Policy layer in front of one ledger instance.
pub struct Controller {
    id: AccountId,
    policy: PolicyConfig,
    ledger: Mutex<Ledger>,
    transfer: Arc<dyn ValueTransfer>,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("id", &self.id)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Controller {
    /// Creates a controller and the ledger it drives.
    ///
    /// The controller calls the ledger as `config.ledger.controller`.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::Config` if the configuration is invalid.
    pub fn new(
        config: ControllerConfig,
        transfer: Arc<dyn ValueTransfer>,
    ) -> Result<Self, ControllerError> {
        config.validate()?;
        let id = config.ledger.controller.clone();
        let ledger = Ledger::new(config.ledger)?;
        Ok(Self::with_ledger(id, config.policy, ledger, transfer))
    }

    /// Creates a controller around a ledger restored from `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::Config` if the configuration is invalid, or
    /// `ControllerError::Ledger` if the snapshot is inconsistent.
    pub fn restore(
        config: ControllerConfig,
        snapshot: LedgerSnapshot,
        transfer: Arc<dyn ValueTransfer>,
    ) -> Result<Self, ControllerError> {
        config.validate()?;
        let id = config.ledger.controller.clone();
        let ledger = Ledger::restore(config.ledger, snapshot)?;
        Ok(Self::with_ledger(id, config.policy, ledger, transfer))
    }

    /// Wraps an existing ledger.
    ///
    /// `id` must be the ledger's authorized controller for calls to succeed.
    #[must_use]
    pub fn with_ledger(
        id: AccountId,
        policy: PolicyConfig,
        ledger: Ledger,
        transfer: Arc<dyn ValueTransfer>,
    ) -> Self {
        Self {
            id,
            policy,
            ledger: Mutex::new(ledger),
            transfer,
        }
    }

    /// Returns the identity this controller calls the ledger with.
    #[must_use]
    pub const fn id(&self) -> &AccountId {
        &self.id
    }

    /// Returns the active policy.
    #[must_use]
    pub const fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    fn lock(&self) -> MutexGuard<'_, Ledger> {
        // Core operations never leave partial state, so a poisoned lock
        // still guards a consistent ledger.
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Airlines
    // =========================================================================

    /// Asks to admit `candidate`, sponsored by `sponsor`.
    ///
    /// # Errors
    ///
    /// - `LedgerError::NotOperational` while paused
    /// - `LedgerError::AlreadyRegistered` if `candidate` is registered
    /// - `LedgerError::Unauthorized` if `sponsor` is not an operational
    ///   airline (outside the bootstrap case)
    /// - `LedgerError::DuplicateVote` if `sponsor` already voted for
    ///   `candidate`
    pub fn register_airline(
        &self,
        sponsor: &AccountId,
        candidate: &AccountId,
    ) -> Result<Admission, ControllerError> {
        let mut ledger = self.lock();
        if !ledger.is_operational_mode() {
            return Err(LedgerError::NotOperational.into());
        }
        let reader = ledger.reader(&self.id)?;
        if reader.is_registered(candidate) {
            return Err(LedgerError::AlreadyRegistered {
                airline: candidate.clone(),
            }
            .into());
        }

        if reader.airline_count() == 0 {
            ledger.register_airline(&self.id, candidate)?;
            info!(airline = %candidate, "bootstrap airline registered");
            return Ok(Admission::Registered { votes: 0 });
        }
        if !reader.is_operational(sponsor) {
            warn!(sponsor = %sponsor, candidate = %candidate, "admission sponsor is not operational");
            return Err(LedgerError::unauthorized(sponsor, Role::OperationalAirline).into());
        }

        let operational = reader.operational_airline_count();
        if self.policy.requires_vote(operational) {
            self.record_vote(&mut ledger, sponsor, candidate, operational)
        } else {
            ledger.register_airline(&self.id, candidate)?;
            debug!(sponsor = %sponsor, airline = %candidate, "airline admitted directly");
            Ok(Admission::Registered { votes: 0 })
        }
    }

    /// Casts `voter`'s vote for `candidate` and admits it once the vote
    /// threshold is met.
    ///
    /// # Errors
    ///
    /// - `LedgerError::NotOperational` while paused, or if `voter` is not
    ///   funded
    /// - `LedgerError::AirlineNotRegistered` if `voter` is not an airline
    /// - `LedgerError::AlreadyRegistered` if `candidate` is registered
    /// - `LedgerError::DuplicateVote` if `voter` already voted
    pub fn vote(&self, voter: &AccountId, candidate: &AccountId) -> Result<Admission, ControllerError> {
        let mut ledger = self.lock();
        let operational = ledger.reader(&self.id)?.operational_airline_count();
        self.record_vote(&mut ledger, voter, candidate, operational)
    }

    fn record_vote(
        &self,
        ledger: &mut Ledger,
        voter: &AccountId,
        candidate: &AccountId,
        operational: usize,
    ) -> Result<Admission, ControllerError> {
        let votes = ledger.set_vote(&self.id, candidate, voter)?;
        let required = self.policy.required_votes(operational);
        if votes >= required {
            ledger.register_airline(&self.id, candidate)?;
            info!(airline = %candidate, votes, required, "airline admitted by vote");
            Ok(Admission::Registered { votes })
        } else {
            debug!(candidate = %candidate, votes, required, "admission pending");
            Ok(Admission::Pending { votes, required })
        }
    }

    /// Adds `amount` of funding for `airline`. Returns `true` if the airline
    /// is operational afterwards.
    ///
    /// # Errors
    ///
    /// Any error of [`Ledger::fund`].
    pub fn fund(&self, airline: &AccountId, amount: Amount) -> Result<bool, ControllerError> {
        let record = self.lock().fund(&self.id, airline, amount)?;
        Ok(record.operational)
    }

    // =========================================================================
    // Flights
    // =========================================================================

    /// Registers a flight for `airline` with the policy's payout multiplier.
    ///
    /// # Errors
    ///
    /// `LedgerError::InvalidInput` for bad route endpoints, or any error of
    /// [`Ledger::register_flight`].
    pub fn register_flight(
        &self,
        airline: &AccountId,
        flight_code: &str,
        from: &str,
        to: &str,
        timestamp: u64,
    ) -> Result<FlightKey, ControllerError> {
        let route = Route::new(from, to)?;
        let key = self.lock().register_flight(
            &self.id,
            airline,
            flight_code,
            route,
            timestamp,
            self.policy.payout_multiplier_percent,
        )?;
        Ok(key)
    }

    /// Applies an oracle status report.
    ///
    /// Sets the flight's status and, for [`FlightStatus::LateAirline`],
    /// credits its insurees in the same step. Returns the credit summary
    /// when crediting ran. Either both effects happen or neither does.
    ///
    /// # Errors
    ///
    /// Any error of [`Ledger::report_flight_status`].
    pub fn process_flight_status(
        &self,
        key: &FlightKey,
        status: FlightStatus,
        updated_at: u64,
    ) -> Result<Option<CreditSummary>, ControllerError> {
        Ok(self
            .lock()
            .report_flight_status(&self.id, key, status, updated_at)?)
    }

    // =========================================================================
    // Insurance
    // =========================================================================

    /// Buys `amount` of cover for `passenger` on `key`.
    ///
    /// # Errors
    ///
    /// Any error of [`Ledger::buy`].
    pub fn buy(
        &self,
        passenger: &AccountId,
        key: &FlightKey,
        amount: Amount,
    ) -> Result<(), ControllerError> {
        self.lock().buy(&self.id, passenger, key, amount)?;
        Ok(())
    }

    /// Withdraws `passenger`'s credit on `key` and returns the amount paid.
    ///
    /// The caller is the passenger: only their own policy is reachable, so a
    /// withdrawal on behalf of anyone else finds no credit.
    ///
    /// # Errors
    ///
    /// - `LedgerError::NotOperational` while paused
    /// - `LedgerError::NoFundsAvailable` if there is nothing to withdraw
    /// - `LedgerError::TransferFailed` if the transfer failed; the credit is
    ///   restored
    pub fn pay(&self, passenger: &AccountId, key: &FlightKey) -> Result<Amount, ControllerError> {
        let pending = self.lock().begin_payout(&self.id, passenger, key)?;

        let outcome = self.transfer.transfer(passenger, pending.amount);

        let mut ledger = self.lock();
        match outcome {
            Ok(()) => {
                ledger.complete_payout(&self.id, &pending)?;
                Ok(pending.amount)
            },
            Err(source) => {
                ledger.revert_payout(&self.id, &pending)?;
                warn!(passenger = %passenger, flight = %key, error = %source, "payout transfer failed");
                Err(LedgerError::TransferFailed {
                    passenger: passenger.clone(),
                    amount: pending.amount,
                    source,
                }
                .into())
            },
        }
    }

    // =========================================================================
    // Owner pass-through
    // =========================================================================

    /// Flips the ledger's operational switch on behalf of `caller`.
    ///
    /// # Errors
    ///
    /// Any error of [`Ledger::set_operational`].
    pub fn set_operational(&self, caller: &AccountId, mode: bool) -> Result<(), ControllerError> {
        self.lock().set_operational(caller, mode)?;
        Ok(())
    }

    /// Rotates the ledger's authorized controller on behalf of `caller`.
    ///
    /// After rotating away from [`id`](Self::id), this controller's calls
    /// are rejected.
    ///
    /// # Errors
    ///
    /// Any error of [`Ledger::authorize_caller`].
    pub fn authorize_caller(
        &self,
        caller: &AccountId,
        controller: &AccountId,
    ) -> Result<(), ControllerError> {
        self.lock().authorize_caller(caller, controller)?;
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Runs `f` against a read view of the ledger.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Unauthorized` if this controller is no longer
    /// the authorized one.
    pub fn read<R>(&self, f: impl FnOnce(LedgerReader<'_>) -> R) -> Result<R, ControllerError> {
        let ledger = self.lock();
        let reader = ledger.reader(&self.id)?;
        Ok(f(reader))
    }

    /// Returns `true` if `airline` is registered.
    ///
    /// # Errors
    ///
    /// See [`read`](Self::read).
    pub fn is_registered(&self, airline: &AccountId) -> Result<bool, ControllerError> {
        self.read(|r| r.is_registered(airline))
    }

    /// Returns `true` if `airline` is operational.
    ///
    /// # Errors
    ///
    /// See [`read`](Self::read).
    pub fn is_operational(&self, airline: &AccountId) -> Result<bool, ControllerError> {
        self.read(|r| r.is_operational(airline))
    }

    /// Returns the cumulative funds of `airline`.
    ///
    /// # Errors
    ///
    /// See [`read`](Self::read).
    pub fn get_funds(&self, airline: &AccountId) -> Result<Option<Amount>, ControllerError> {
        self.read(|r| r.get_funds(airline))
    }

    /// Returns the votes collected for `candidate`.
    ///
    /// # Errors
    ///
    /// See [`read`](Self::read).
    pub fn get_votes(&self, candidate: &AccountId) -> Result<usize, ControllerError> {
        self.read(|r| r.get_votes(candidate))
    }

    /// Returns the number of registered flights.
    ///
    /// # Errors
    ///
    /// See [`read`](Self::read).
    pub fn get_flight_count(&self) -> Result<usize, ControllerError> {
        self.read(|r| r.get_flight_count())
    }

    /// Returns `true` if the flight is registered.
    ///
    /// # Errors
    ///
    /// See [`read`](Self::read).
    pub fn is_valid_flight(
        &self,
        airline: &AccountId,
        flight_code: &str,
        timestamp: u64,
    ) -> Result<bool, ControllerError> {
        self.read(|r| r.is_valid_flight(airline, flight_code, timestamp))
    }

    /// Returns the latest status of `key`.
    ///
    /// # Errors
    ///
    /// See [`read`](Self::read).
    pub fn flight_status(&self, key: &FlightKey) -> Result<Option<FlightStatus>, ControllerError> {
        self.read(|r| r.flight(key).map(|f| f.status))
    }

    /// Returns the withdrawable credit of `passenger` on `key`.
    ///
    /// # Errors
    ///
    /// See [`read`](Self::read).
    pub fn insurance_credit(
        &self,
        passenger: &AccountId,
        key: &FlightKey,
    ) -> Result<Amount, ControllerError> {
        self.read(|r| r.insurance_credit(passenger, key))
    }

    /// Returns `true` if the ledger's operational switch is on.
    #[must_use]
    pub fn is_operational_mode(&self) -> bool {
        self.lock().is_operational_mode()
    }

    /// Returns a serializable copy of the ledger state.
    #[must_use]
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.lock().snapshot()
    }

    /// Returns up to `limit` journal records after `cursor`.
    #[must_use]
    pub fn events(&self, cursor: u64, limit: usize) -> Vec<EventRecord> {
        self.lock().journal().read_from(cursor, limit).to_vec()
    }

    /// Returns the number of committed events.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.lock().journal().len()
    }

    /// Checks ledger invariants and the journal chain.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidState` describing the first violation.
    pub fn verify(&self) -> Result<(), ControllerError> {
        let ledger = self.lock();
        ledger.check_invariants()?;
        ledger
            .journal()
            .verify_chain()
            .map_err(|e| LedgerError::invalid_state(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod proptest_payouts;
