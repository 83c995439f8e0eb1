//! Controller-only read accessors.

use super::Ledger;
use crate::airline::Airline;
use crate::amount::Amount;
use crate::flight::{Flight, FlightKey};
use crate::identity::AccountId;
use crate::insurance::{InsuranceRecord, PolicyKey};

/// Read view handed out by [`Ledger::reader`] after the caller check.
#[derive(Debug, Clone, Copy)]
pub struct LedgerReader<'a> {
    ledger: &'a Ledger,
}

impl<'a> LedgerReader<'a> {
    pub(super) const fn new(ledger: &'a Ledger) -> Self {
        Self { ledger }
    }

    /// Returns `true` if `airline` is registered.
    #[must_use]
    pub fn is_registered(&self, airline: &AccountId) -> bool {
        self.ledger.state.airlines.contains_key(airline)
    }

    /// Returns `true` if `airline` is registered and funded.
    #[must_use]
    pub fn is_operational(&self, airline: &AccountId) -> bool {
        self.ledger
            .state
            .airlines
            .get(airline)
            .is_some_and(|a| a.operational)
    }

    /// Returns the cumulative funds of `airline`, if registered.
    #[must_use]
    pub fn get_funds(&self, airline: &AccountId) -> Option<Amount> {
        self.ledger.state.airlines.get(airline).map(|a| a.funds)
    }

    /// Returns the record of `airline`, if registered.
    #[must_use]
    pub fn airline(&self, airline: &AccountId) -> Option<&'a Airline> {
        self.ledger.state.airlines.get(airline)
    }

    /// Returns the number of distinct votes collected for `candidate`.
    #[must_use]
    pub fn get_votes(&self, candidate: &AccountId) -> usize {
        self.ledger
            .state
            .votes
            .get(candidate)
            .map_or(0, crate::airline::VoteRecord::count)
    }

    /// Returns `true` if `voter` has an outstanding vote for `candidate`.
    #[must_use]
    pub fn has_voted(&self, candidate: &AccountId, voter: &AccountId) -> bool {
        self.ledger
            .state
            .votes
            .get(candidate)
            .is_some_and(|record| record.contains(voter))
    }

    /// Returns the number of registered airlines.
    #[must_use]
    pub fn airline_count(&self) -> usize {
        self.ledger.state.airlines.len()
    }

    /// Returns the number of operational airlines.
    #[must_use]
    pub fn operational_airline_count(&self) -> usize {
        self.ledger
            .state
            .airlines
            .values()
            .filter(|a| a.operational)
            .count()
    }

    /// Returns the number of registered flights.
    #[must_use]
    pub fn get_flight_count(&self) -> usize {
        self.ledger.state.flights.len()
    }

    /// Returns `true` if a flight is registered under the key components.
    ///
    /// Components that cannot form a key (e.g. an empty flight code) yield
    /// `false`.
    #[must_use]
    pub fn is_valid_flight(&self, airline: &AccountId, flight_code: &str, timestamp: u64) -> bool {
        FlightKey::new(airline.clone(), flight_code, timestamp)
            .is_ok_and(|key| self.ledger.state.flights.contains_key(&key))
    }

    /// Returns the flight registered under `key`.
    #[must_use]
    pub fn flight(&self, key: &FlightKey) -> Option<&'a Flight> {
        self.ledger.state.flights.get(key)
    }

    /// Iterates registered flight keys in key order.
    pub fn flight_keys(&self) -> impl Iterator<Item = &'a FlightKey> + use<'a> {
        self.ledger.state.flights.keys()
    }

    /// Returns the insured passengers of a flight in purchase order.
    #[must_use]
    pub fn passengers(&self, key: &FlightKey) -> Option<&'a [AccountId]> {
        self.ledger
            .state
            .flights
            .get(key)
            .map(|f| f.passengers.as_slice())
    }

    /// Returns the policy of `passenger` on `key`.
    #[must_use]
    pub fn policy(&self, passenger: &AccountId, key: &FlightKey) -> Option<&'a InsuranceRecord> {
        self.ledger
            .state
            .policies
            .get(&PolicyKey::new(passenger.clone(), key.clone()))
    }

    /// Returns the withdrawable credit of `passenger` on `key` (0 if none).
    #[must_use]
    pub fn insurance_credit(&self, passenger: &AccountId, key: &FlightKey) -> Amount {
        self.policy(passenger, key)
            .map_or(0, |record| record.insurance_credit)
    }

    /// Returns every policy held by `passenger`.
    #[must_use]
    pub fn policies_of(&self, passenger: &AccountId) -> Vec<(&'a FlightKey, &'a InsuranceRecord)> {
        self.ledger
            .state
            .policies
            .iter()
            .filter(|(policy, _)| &policy.passenger == passenger)
            .map(|(policy, record)| (&policy.flight, record))
            .collect()
    }

    /// Returns the number of withdrawals awaiting their transfer.
    #[must_use]
    pub fn pending_payout_count(&self) -> usize {
        self.ledger.state.pending_payouts.len()
    }
}
