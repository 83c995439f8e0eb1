//! The ledger state machine.
//!
//! [`Ledger`] holds every airline, vote, flight and insurance record and
//! enforces the ledger invariants on each mutation:
//!
//! - An airline is operational iff its cumulative funds reached the funding
//!   threshold; operability is never revoked.
//! - A flight key is registered at most once.
//! - A policy's credit is non-zero only between crediting and withdrawal.
//! - A candidate's vote count never exceeds the number of distinct
//!   operational airlines that voted for it.
//! - While the operational switch is off, nothing but the switch changes.
//!
//! A withdrawal spans two calls (see [`Ledger::begin_payout`]). While one is
//! outstanding the owner can neither pause the ledger nor rotate the
//! controller, so the caller that began a payout can always settle it.
//!
//! # Atomicity
//!
//! Every operation validates all of its preconditions (and computes every
//! derived amount with checked arithmetic) before it writes anything, then
//! applies its writes and commits its staged events together. A returned
//! error therefore always means "no state changed and no event emitted".
//!
//! # Authorization
//!
//! Mutating entry points take the calling identity and reject anything but
//! the authorized controller with [`LedgerError::Unauthorized`]. The owner
//! (fixed at construction) may flip the operational switch and rotate the
//! controller. Reads go through [`Ledger::reader`], which performs the same
//! controller check.
//!
//! # Concurrency
//!
//! `Ledger` is a plain single-threaded value; operations take `&mut self`
//! and run to completion. Multi-threaded embedders wrap one instance in a
//! single mutex (as the controller crate does).
//!
//! # Example
//!
//! ```rust
//! use flightsurety_core::amount::UNIT;
//! use flightsurety_core::config::LedgerConfig;
//! use flightsurety_core::flight::Route;
//! use flightsurety_core::identity::AccountId;
//! use flightsurety_core::ledger::Ledger;
//!
//! # fn main() -> Result<(), flightsurety_core::error::LedgerError> {
//! let owner = AccountId::new("owner")?;
//! let controller = AccountId::new("controller")?;
//! let airline = AccountId::new("airline-1")?;
//!
//! let config = LedgerConfig::new(owner, controller.clone())
//!     .with_genesis_airline(airline.clone());
//! let mut ledger = Ledger::new(config)?;
//!
//! ledger.fund(&controller, &airline, 10 * UNIT)?;
//! let key = ledger.register_flight(
//!     &controller,
//!     &airline,
//!     "ND1309",
//!     Route::new("LAX", "JFK")?,
//!     1_700_000_000,
//!     150,
//! )?;
//! assert!(ledger.reader(&controller)?.is_valid_flight(&airline, "ND1309", 1_700_000_000));
//! # let _ = key;
//! # Ok(())
//! # }
//! ```

mod admission;
mod insurance;
mod reader;
mod registry;

#[cfg(test)]
mod proptest_invariants;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub use reader::LedgerReader;

use crate::airline::{Airline, VoteRecord};
use crate::amount::Amount;
use crate::config::LedgerConfig;
use crate::error::{LedgerError, Role};
use crate::events::{EventJournal, LedgerEvent};
use crate::flight::{Flight, FlightKey};
use crate::identity::AccountId;
use crate::insurance::{InsuranceRecord, PendingPayout, PolicyKey};

/// Mutable ledger state.
#[derive(Debug, Clone, PartialEq, Eq)]
struct State {
    operational: bool,
    controller: AccountId,
    airlines: BTreeMap<AccountId, Airline>,
    votes: BTreeMap<AccountId, VoteRecord>,
    flights: BTreeMap<FlightKey, Flight>,
    policies: BTreeMap<PolicyKey, InsuranceRecord>,
    pending_payouts: BTreeMap<PolicyKey, PendingPayout>,
}

/// Serializable copy of the complete ledger state.
///
/// Maps are flattened to entry lists so the snapshot encodes to JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerSnapshot {
    /// Global operational switch.
    pub operational: bool,
    /// Authorized controller.
    pub controller: AccountId,
    /// Registered airlines.
    pub airlines: Vec<(AccountId, Airline)>,
    /// Outstanding votes by candidate.
    pub votes: Vec<(AccountId, VoteRecord)>,
    /// Registered flights.
    pub flights: Vec<(FlightKey, Flight)>,
    /// Insurance records.
    pub policies: Vec<(PolicyKey, InsuranceRecord)>,
    /// Withdrawals whose transfer has not completed.
    pub pending_payouts: Vec<PendingPayout>,
}

/// The flight insurance ledger.
#[derive(Debug, Clone)]
pub struct Ledger {
    config: LedgerConfig,
    state: State,
    journal: EventJournal,
}

impl Ledger {
    /// Creates a ledger from configuration.
    ///
    /// The ledger starts operational. The configured controller is
    /// authorized and the genesis airline, if any, is registered (unfunded).
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidInput` if the configuration fails
    /// validation.
    pub fn new(config: LedgerConfig) -> Result<Self, LedgerError> {
        config
            .validate()
            .map_err(|e| LedgerError::invalid_input(e.to_string()))?;

        let mut ledger = Self {
            state: State {
                operational: true,
                controller: config.controller.clone(),
                airlines: BTreeMap::new(),
                votes: BTreeMap::new(),
                flights: BTreeMap::new(),
                policies: BTreeMap::new(),
                pending_payouts: BTreeMap::new(),
            },
            journal: EventJournal::new(),
            config,
        };

        let mut events = vec![LedgerEvent::ControllerAuthorized {
            controller: ledger.state.controller.clone(),
        }];
        if let Some(airline) = ledger.config.genesis_airline.clone() {
            ledger.state.airlines.insert(airline.clone(), Airline::default());
            events.push(LedgerEvent::AirlineRegistered { airline, votes: 0 });
        }
        ledger.commit(events);

        info!(
            owner = %ledger.config.owner,
            controller = %ledger.state.controller,
            "ledger initialized"
        );
        Ok(ledger)
    }

    /// Rebuilds a ledger from a snapshot.
    ///
    /// The journal restarts empty; history before the snapshot lives wherever
    /// the previous journal was archived.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidInput` if the configuration fails
    /// validation, or `LedgerError::InvalidState` if the snapshot violates a
    /// ledger invariant.
    pub fn restore(config: LedgerConfig, snapshot: LedgerSnapshot) -> Result<Self, LedgerError> {
        config
            .validate()
            .map_err(|e| LedgerError::invalid_input(e.to_string()))?;

        let state = State {
            operational: snapshot.operational,
            controller: snapshot.controller,
            airlines: snapshot.airlines.into_iter().collect(),
            votes: snapshot.votes.into_iter().collect(),
            flights: snapshot.flights.into_iter().collect(),
            policies: snapshot.policies.into_iter().collect(),
            pending_payouts: snapshot
                .pending_payouts
                .into_iter()
                .map(|p| (p.policy.clone(), p))
                .collect(),
        };
        check_state(&state, &config)?;

        Ok(Self {
            config,
            state,
            journal: EventJournal::new(),
        })
    }

    /// Returns a serializable copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> LedgerSnapshot {
        let state = &self.state;
        LedgerSnapshot {
            operational: state.operational,
            controller: state.controller.clone(),
            airlines: clone_entries(&state.airlines),
            votes: clone_entries(&state.votes),
            flights: clone_entries(&state.flights),
            policies: clone_entries(&state.policies),
            pending_payouts: state.pending_payouts.values().cloned().collect(),
        }
    }

    /// Verifies every ledger invariant against the current state.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidState` describing the first violation.
    pub fn check_invariants(&self) -> Result<(), LedgerError> {
        check_state(&self.state, &self.config)
    }

    /// Returns the configuration the ledger was built with.
    #[must_use]
    pub const fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Returns the immutable owner.
    #[must_use]
    pub const fn owner(&self) -> &AccountId {
        &self.config.owner
    }

    /// Returns the currently authorized controller.
    #[must_use]
    pub const fn authorized_controller(&self) -> &AccountId {
        &self.state.controller
    }

    /// Returns the global operational switch.
    #[must_use]
    pub const fn is_operational_mode(&self) -> bool {
        self.state.operational
    }

    /// Returns the funding threshold.
    #[must_use]
    pub const fn funding_threshold(&self) -> Amount {
        self.config.funding_threshold
    }

    /// Returns the maximum insurable amount per policy.
    #[must_use]
    pub const fn max_insurance(&self) -> Amount {
        self.config.max_insurance
    }

    /// Returns the event journal.
    #[must_use]
    pub const fn journal(&self) -> &EventJournal {
        &self.journal
    }

    /// Returns a read view for the authorized controller.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Unauthorized` if `caller` is not the authorized
    /// controller.
    pub fn reader(&self, caller: &AccountId) -> Result<LedgerReader<'_>, LedgerError> {
        self.require_controller(caller)?;
        Ok(LedgerReader::new(self))
    }

    /// Flips the global operational switch.
    ///
    /// This is the only entry point that works while the ledger is paused.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Unauthorized` if `caller` is not the owner, or
    /// `LedgerError::InvalidState` if the switch is already in `mode` or a
    /// pause is requested while a payout is outstanding.
    pub fn set_operational(&mut self, caller: &AccountId, mode: bool) -> Result<(), LedgerError> {
        self.require_owner(caller)?;
        if self.state.operational == mode {
            return Err(LedgerError::invalid_state(format!(
                "operational mode is already {mode}"
            )));
        }
        if !mode {
            self.require_no_pending_payouts("pause")?;
        }

        self.state.operational = mode;
        self.commit(vec![LedgerEvent::OperationalModeChanged { operational: mode }]);
        info!(operational = mode, "operational mode changed");
        Ok(())
    }

    /// Designates the identity allowed to call controller entry points.
    ///
    /// # Errors
    ///
    /// - `LedgerError::NotOperational` while paused
    /// - `LedgerError::Unauthorized` if `caller` is not the owner
    /// - `LedgerError::InvalidState` while a payout is outstanding
    pub fn authorize_caller(
        &mut self,
        caller: &AccountId,
        controller: &AccountId,
    ) -> Result<(), LedgerError> {
        self.require_operational()?;
        self.require_owner(caller)?;
        self.require_no_pending_payouts("controller rotation")?;

        self.state.controller = controller.clone();
        self.commit(vec![LedgerEvent::ControllerAuthorized {
            controller: controller.clone(),
        }]);
        info!(controller = %controller, "controller authorized");
        Ok(())
    }

    // =========================================================================
    // Guards
    // =========================================================================

    fn require_operational(&self) -> Result<(), LedgerError> {
        if self.state.operational {
            Ok(())
        } else {
            Err(LedgerError::NotOperational)
        }
    }

    fn require_owner(&self, caller: &AccountId) -> Result<(), LedgerError> {
        if caller == &self.config.owner {
            Ok(())
        } else {
            warn!(caller = %caller, "rejected owner-only call");
            Err(LedgerError::unauthorized(caller, Role::Owner))
        }
    }

    fn require_controller(&self, caller: &AccountId) -> Result<(), LedgerError> {
        if caller == &self.state.controller {
            Ok(())
        } else {
            warn!(caller = %caller, "rejected call from unauthorized controller");
            Err(LedgerError::unauthorized(caller, Role::Controller))
        }
    }

    fn require_no_pending_payouts(&self, action: &str) -> Result<(), LedgerError> {
        match self.state.pending_payouts.len() {
            0 => Ok(()),
            n => {
                warn!(outstanding = n, action, "rejected while payouts are outstanding");
                Err(LedgerError::invalid_state(format!(
                    "{action} refused: {n} payout(s) outstanding"
                )))
            },
        }
    }

    /// Precondition shared by every controller mutation.
    fn guard_mutation(&self, caller: &AccountId) -> Result<(), LedgerError> {
        self.require_operational()?;
        self.require_controller(caller)
    }

    fn commit(&mut self, events: Vec<LedgerEvent>) {
        for event in events {
            self.journal.append(event);
        }
    }
}

fn clone_entries<K: Clone, V: Clone>(map: &BTreeMap<K, V>) -> Vec<(K, V)> {
    map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

fn check_state(state: &State, config: &LedgerConfig) -> Result<(), LedgerError> {
    for (id, airline) in &state.airlines {
        if airline.operational != (airline.funds >= config.funding_threshold) {
            return Err(LedgerError::invalid_state(format!(
                "airline {id} operational flag disagrees with funds {}",
                airline.funds
            )));
        }
    }

    for (candidate, record) in &state.votes {
        if state.airlines.contains_key(candidate) {
            return Err(LedgerError::invalid_state(format!(
                "votes retained for registered airline {candidate}"
            )));
        }
        for voter in record.voters() {
            let operational = state.airlines.get(voter).is_some_and(|a| a.operational);
            if !operational {
                return Err(LedgerError::invalid_state(format!(
                    "vote for {candidate} from non-operational {voter}"
                )));
            }
        }
    }

    for (key, flight) in &state.flights {
        for passenger in &flight.passengers {
            let policy = PolicyKey::new(passenger.clone(), key.clone());
            if !state.policies.contains_key(&policy) {
                return Err(LedgerError::invalid_state(format!(
                    "passenger {passenger} listed on {key} without a policy"
                )));
            }
        }
    }

    for (policy, record) in &state.policies {
        let listed = state
            .flights
            .get(&policy.flight)
            .is_some_and(|f| f.passengers.contains(&policy.passenger));
        if !listed {
            return Err(LedgerError::invalid_state(format!(
                "policy of {} on {} is not on the passenger list",
                policy.passenger, policy.flight
            )));
        }
        if record.insurance_credit > 0 && !record.credited {
            return Err(LedgerError::invalid_state(format!(
                "uncredited policy of {} on {} holds credit",
                policy.passenger, policy.flight
            )));
        }
    }

    if !state.operational && !state.pending_payouts.is_empty() {
        return Err(LedgerError::invalid_state(
            "paused ledger holds outstanding payouts",
        ));
    }
    for (policy, pending) in &state.pending_payouts {
        let zeroed = state
            .policies
            .get(policy)
            .is_some_and(|r| r.insurance_credit == 0);
        if !zeroed {
            return Err(LedgerError::invalid_state(format!(
                "pending payout of {} for {} without a zeroed policy",
                pending.amount, policy.passenger
            )));
        }
    }

    Ok(())
}
