//! Flight registration and status reports.

use tracing::info;

use super::Ledger;
use crate::error::LedgerError;
use crate::events::LedgerEvent;
use crate::flight::{Flight, FlightKey, FlightStatus, Route};
use crate::identity::AccountId;

impl Ledger {
    /// Registers a flight owned by `airline` and returns its composite key.
    ///
    /// The flight starts in [`FlightStatus::Unknown`] with an empty passenger
    /// list. `payout_multiplier` is the percentage applied to insured amounts
    /// when passengers are credited.
    ///
    /// # Errors
    ///
    /// - `LedgerError::NotOperational` while paused
    /// - `LedgerError::Unauthorized` if `caller` is not the controller
    /// - `LedgerError::InvalidInput` for a bad flight code or a zero multiplier
    /// - `LedgerError::DuplicateFlight` if the key is already registered
    /// - `LedgerError::AirlineNotOperational` if `airline` is not a funded
    ///   airline
    pub fn register_flight(
        &mut self,
        caller: &AccountId,
        airline: &AccountId,
        flight_code: &str,
        route: Route,
        timestamp: u64,
        payout_multiplier: u32,
    ) -> Result<FlightKey, LedgerError> {
        self.guard_mutation(caller)?;
        if payout_multiplier == 0 {
            return Err(LedgerError::invalid_input(
                "payout_multiplier must be non-zero",
            ));
        }
        let key = FlightKey::new(airline.clone(), flight_code, timestamp)?;
        if self.state.flights.contains_key(&key) {
            return Err(LedgerError::DuplicateFlight { key });
        }
        let operational = self
            .state
            .airlines
            .get(airline)
            .is_some_and(|a| a.operational);
        if !operational {
            return Err(LedgerError::AirlineNotOperational {
                airline: airline.clone(),
            });
        }

        self.state
            .flights
            .insert(key.clone(), Flight::new(route.clone(), payout_multiplier));
        self.commit(vec![LedgerEvent::FlightRegistered {
            key: key.clone(),
            digest: key.digest_hex(),
            route,
            payout_multiplier,
        }]);

        info!(flight = %key, payout_multiplier, "flight registered");
        Ok(key)
    }

    /// Records a status report for a flight.
    ///
    /// Overwrites the status and report timestamp; no transition rules are
    /// applied beyond key existence.
    ///
    /// # Errors
    ///
    /// - `LedgerError::NotOperational` while paused
    /// - `LedgerError::Unauthorized` if `caller` is not the controller
    /// - `LedgerError::FlightNotFound` if `key` is not registered
    pub fn set_flight_status(
        &mut self,
        caller: &AccountId,
        key: &FlightKey,
        status: FlightStatus,
        updated_at: u64,
    ) -> Result<(), LedgerError> {
        self.guard_mutation(caller)?;
        let flight = self
            .state
            .flights
            .get_mut(key)
            .ok_or_else(|| LedgerError::FlightNotFound { key: key.clone() })?;

        flight.status = status;
        flight.updated_at = updated_at;
        self.commit(vec![LedgerEvent::FlightStatusUpdated {
            key: key.clone(),
            status,
            updated_at,
        }]);

        info!(flight = %key, status = %status, updated_at, "flight status updated");
        Ok(())
    }
}
