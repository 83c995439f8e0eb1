//! Replay projections over the event journal.
//!
//! A [`Reducer`] folds committed [`EventRecord`]s into derived state without
//! ever reading ledger internals. [`HistoryProjection`] rebuilds the
//! externally visible ledger picture (airlines, flight statuses and policy
//! credit) from the event stream alone.
//!
//! # Determinism
//!
//! Reducers must be deterministic: replaying the same records always yields
//! the same state. Replay is strict about ordering; records must arrive with
//! contiguous sequence IDs.
//!
//! # Example
//!
//! ```rust
//! use flightsurety_core::amount::UNIT;
//! use flightsurety_core::config::LedgerConfig;
//! use flightsurety_core::identity::AccountId;
//! use flightsurety_core::ledger::Ledger;
//! use flightsurety_core::projection::{HistoryProjection, Reducer, replay};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let controller = AccountId::new("controller")?;
//! let airline = AccountId::new("airline-1")?;
//! let config = LedgerConfig::new(AccountId::new("owner")?, controller.clone())
//!     .with_genesis_airline(airline.clone());
//! let mut ledger = Ledger::new(config)?;
//! ledger.fund(&controller, &airline, 10 * UNIT)?;
//!
//! let mut projection = HistoryProjection::new();
//! replay(&mut projection, ledger.journal().records())?;
//! assert!(projection.state().is_operational(&airline));
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;

use thiserror::Error;

use crate::airline::Airline;
use crate::amount::Amount;
use crate::events::{EventRecord, LedgerEvent};
use crate::flight::{FlightKey, FlightStatus};
use crate::identity::AccountId;
use crate::insurance::PolicyKey;

// =============================================================================
// Reducer
// =============================================================================

/// Folds journal records into a projection.
pub trait Reducer {
    /// The projected state.
    type State;

    /// Error raised when a record cannot be applied.
    type Error: std::error::Error;

    /// Returns a stable name for this reducer.
    fn name(&self) -> &'static str;

    /// Applies one record.
    ///
    /// # Errors
    ///
    /// Returns `Self::Error` if the record is inconsistent with the state
    /// built so far.
    fn apply(&mut self, record: &EventRecord) -> Result<(), Self::Error>;

    /// Returns the current projection.
    fn state(&self) -> &Self::State;

    /// Resets the projection to its empty state.
    fn reset(&mut self);
}

/// Applies `records` in order and returns how many were applied.
///
/// # Errors
///
/// Stops at and returns the first error raised by the reducer.
pub fn replay<R: Reducer>(reducer: &mut R, records: &[EventRecord]) -> Result<usize, R::Error> {
    for record in records {
        reducer.apply(record)?;
    }
    Ok(records.len())
}

// =============================================================================
// HistoryProjection
// =============================================================================

/// Errors raised while replaying ledger history.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProjectionError {
    /// A record arrived out of sequence.
    #[error("expected seq_id {expected}, got {actual}")]
    SequenceGap {
        /// Next expected sequence ID.
        expected: u64,
        /// Sequence ID received.
        actual: u64,
    },

    /// An event references an airline never registered in the stream.
    #[error("event references unknown airline: {airline}")]
    UnknownAirline {
        /// The airline.
        airline: AccountId,
    },

    /// An event references a flight never registered in the stream.
    #[error("event references unknown flight: {key}")]
    UnknownFlight {
        /// The flight key.
        key: FlightKey,
    },

    /// An event references a policy never purchased in the stream.
    #[error("event references unknown policy of {passenger} on {key}")]
    UnknownPolicy {
        /// The passenger.
        passenger: AccountId,
        /// The flight key.
        key: FlightKey,
    },
}

/// Projected view of one policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolicyView {
    /// Premium still held on the policy.
    pub insured_amount: Amount,
    /// Withdrawable credit.
    pub insurance_credit: Amount,
}

/// Ledger picture rebuilt from events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryState {
    /// Global operational switch.
    pub operational: bool,
    /// Last authorized controller.
    pub controller: Option<AccountId>,
    /// Registered airlines.
    pub airlines: BTreeMap<AccountId, Airline>,
    /// Outstanding vote counts by candidate.
    pub votes: BTreeMap<AccountId, u64>,
    /// Latest status of every registered flight.
    pub flights: BTreeMap<FlightKey, FlightStatus>,
    /// Policies by holder and flight.
    pub policies: BTreeMap<PolicyKey, PolicyView>,
    /// Sequence ID of the last applied record.
    pub last_seq_id: u64,
}

impl Default for HistoryState {
    fn default() -> Self {
        // A fresh ledger starts operational.
        Self {
            operational: true,
            controller: None,
            airlines: BTreeMap::new(),
            votes: BTreeMap::new(),
            flights: BTreeMap::new(),
            policies: BTreeMap::new(),
            last_seq_id: 0,
        }
    }
}

impl HistoryState {
    /// Returns `true` if `airline` was registered.
    #[must_use]
    pub fn is_registered(&self, airline: &AccountId) -> bool {
        self.airlines.contains_key(airline)
    }

    /// Returns `true` if `airline` reached the funding threshold.
    #[must_use]
    pub fn is_operational(&self, airline: &AccountId) -> bool {
        self.airlines.get(airline).is_some_and(|a| a.operational)
    }

    /// Returns the latest status of `key`.
    #[must_use]
    pub fn flight_status(&self, key: &FlightKey) -> Option<FlightStatus> {
        self.flights.get(key).copied()
    }

    /// Returns the credit of `passenger` on `key` (0 if none).
    #[must_use]
    pub fn insurance_credit(&self, passenger: &AccountId, key: &FlightKey) -> Amount {
        self.policies
            .get(&PolicyKey::new(passenger.clone(), key.clone()))
            .map_or(0, |view| view.insurance_credit)
    }
}

/// Reducer that rebuilds [`HistoryState`].
#[derive(Debug, Default)]
pub struct HistoryProjection {
    state: HistoryState,
}

impl HistoryProjection {
    /// Creates an empty projection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the projection and returns its state.
    #[must_use]
    pub fn into_state(self) -> HistoryState {
        self.state
    }

    fn apply_event(&mut self, event: &LedgerEvent) -> Result<(), ProjectionError> {
        let state = &mut self.state;
        match event {
            LedgerEvent::AirlineRegistered { airline, .. } => {
                state.votes.remove(airline);
                state.airlines.insert(airline.clone(), Airline::default());
            },
            LedgerEvent::AirlineVoted {
                candidate, votes, ..
            } => {
                state.votes.insert(candidate.clone(), *votes);
            },
            LedgerEvent::AirlineFunded {
                airline,
                total_funds,
                operational,
                ..
            } => {
                let entry = state.airlines.get_mut(airline).ok_or_else(|| {
                    ProjectionError::UnknownAirline {
                        airline: airline.clone(),
                    }
                })?;
                entry.funds = *total_funds;
                entry.operational = *operational;
            },
            LedgerEvent::OperationalModeChanged { operational } => {
                state.operational = *operational;
            },
            LedgerEvent::ControllerAuthorized { controller } => {
                state.controller = Some(controller.clone());
            },
            LedgerEvent::FlightRegistered { key, .. } => {
                state.flights.insert(key.clone(), FlightStatus::Unknown);
            },
            LedgerEvent::FlightStatusUpdated { key, status, .. } => {
                let entry = state
                    .flights
                    .get_mut(key)
                    .ok_or_else(|| ProjectionError::UnknownFlight { key: key.clone() })?;
                *entry = *status;
            },
            LedgerEvent::InsurancePurchased {
                passenger,
                key,
                amount,
            } => {
                if !state.flights.contains_key(key) {
                    return Err(ProjectionError::UnknownFlight { key: key.clone() });
                }
                state.policies.insert(
                    PolicyKey::new(passenger.clone(), key.clone()),
                    PolicyView {
                        insured_amount: *amount,
                        insurance_credit: 0,
                    },
                );
            },
            LedgerEvent::InsureeCredited {
                passenger,
                key,
                credit,
                ..
            } => {
                policy_mut(state, passenger, key)?.insurance_credit = *credit;
            },
            LedgerEvent::InsureePaid { passenger, key, .. } => {
                let view = policy_mut(state, passenger, key)?;
                view.insurance_credit = 0;
                view.insured_amount = 0;
            },
        }
        Ok(())
    }
}

fn policy_mut<'a>(
    state: &'a mut HistoryState,
    passenger: &AccountId,
    key: &FlightKey,
) -> Result<&'a mut PolicyView, ProjectionError> {
    state
        .policies
        .get_mut(&PolicyKey::new(passenger.clone(), key.clone()))
        .ok_or_else(|| ProjectionError::UnknownPolicy {
            passenger: passenger.clone(),
            key: key.clone(),
        })
}

impl Reducer for HistoryProjection {
    type State = HistoryState;
    type Error = ProjectionError;

    fn name(&self) -> &'static str {
        "ledger-history"
    }

    fn apply(&mut self, record: &EventRecord) -> Result<(), Self::Error> {
        let expected = self.state.last_seq_id + 1;
        if record.seq_id != expected {
            return Err(ProjectionError::SequenceGap {
                expected,
                actual: record.seq_id,
            });
        }
        self.apply_event(&record.event)?;
        self.state.last_seq_id = record.seq_id;
        Ok(())
    }

    fn state(&self) -> &Self::State {
        &self.state
    }

    fn reset(&mut self) {
        self.state = HistoryState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::UNIT;
    use crate::config::LedgerConfig;
    use crate::flight::Route;
    use crate::ledger::Ledger;
    use crate::transfer::RecordingTransfer;

    fn id(s: &str) -> AccountId {
        AccountId::new(s).unwrap()
    }

    /// Runs a full purchase, delay and partial withdrawal history.
    fn scripted_ledger() -> (Ledger, FlightKey) {
        let controller = id("controller");
        let airline = id("airline-1");
        let config =
            LedgerConfig::new(id("owner"), controller.clone()).with_genesis_airline(airline.clone());
        let mut ledger = Ledger::new(config).unwrap();
        ledger.fund(&controller, &airline, 10 * UNIT).unwrap();
        ledger.register_airline(&controller, &id("airline-2")).unwrap();
        ledger
            .set_vote(&controller, &id("airline-3"), &airline)
            .unwrap();
        let key = ledger
            .register_flight(
                &controller,
                &airline,
                "ND1309",
                Route::new("LAX", "JFK").unwrap(),
                1_700_000_000,
                150,
            )
            .unwrap();
        ledger.buy(&controller, &id("alice"), &key, UNIT).unwrap();
        ledger
            .buy(&controller, &id("bob"), &key, UNIT / 2)
            .unwrap();
        ledger
            .set_flight_status(&controller, &key, FlightStatus::LateAirline, 1_700_000_100)
            .unwrap();
        ledger.credit_insurees(&controller, &key).unwrap();
        ledger
            .pay(&controller, &id("alice"), &key, &RecordingTransfer::new())
            .unwrap();
        (ledger, key)
    }

    #[test]
    fn replay_matches_ledger_state() {
        let (ledger, key) = scripted_ledger();
        let controller = id("controller");
        let reader = ledger.reader(&controller).unwrap();

        let mut projection = HistoryProjection::new();
        let applied = replay(&mut projection, ledger.journal().records()).unwrap();
        assert_eq!(applied, ledger.journal().len());

        let state = projection.state();
        assert_eq!(state.controller.as_ref(), Some(&controller));
        assert!(state.operational);
        assert_eq!(state.airlines.len(), reader.airline_count());
        for (airline, view) in &state.airlines {
            assert_eq!(Some(view.funds), reader.get_funds(airline));
            assert_eq!(view.operational, reader.is_operational(airline));
        }
        assert_eq!(state.votes.get(&id("airline-3")), Some(&1));
        assert_eq!(state.flight_status(&key), Some(FlightStatus::LateAirline));
        for passenger in ["alice", "bob"] {
            let passenger = id(passenger);
            assert_eq!(
                state.insurance_credit(&passenger, &key),
                reader.insurance_credit(&passenger, &key)
            );
        }
        assert_eq!(state.insurance_credit(&id("bob"), &key), 750_000_000);
        assert_eq!(state.insurance_credit(&id("alice"), &key), 0);
    }

    #[test]
    fn replay_is_deterministic_after_reset() {
        let (ledger, _) = scripted_ledger();
        let records = ledger.journal().records();

        let mut projection = HistoryProjection::new();
        replay(&mut projection, records).unwrap();
        let first = projection.state().clone();

        projection.reset();
        assert_eq!(projection.state(), &HistoryState::default());
        replay(&mut projection, records).unwrap();
        assert_eq!(projection.state(), &first);
    }

    #[test]
    fn incremental_replay_equals_full_replay() {
        let (ledger, _) = scripted_ledger();
        let journal = ledger.journal();

        let mut full = HistoryProjection::new();
        replay(&mut full, journal.records()).unwrap();

        let mut incremental = HistoryProjection::new();
        let mut cursor = 0;
        loop {
            let page = journal.read_from(cursor, 3);
            if page.is_empty() {
                break;
            }
            replay(&mut incremental, page).unwrap();
            cursor = incremental.state().last_seq_id;
        }
        assert_eq!(incremental.into_state(), full.into_state());
    }

    #[test]
    fn sequence_gap_is_rejected() {
        let (ledger, _) = scripted_ledger();
        let records = ledger.journal().records();

        let mut projection = HistoryProjection::new();
        let err = projection.apply(&records[1]).unwrap_err();
        assert_eq!(
            err,
            ProjectionError::SequenceGap {
                expected: 1,
                actual: 2
            }
        );
        assert_eq!(projection.state().last_seq_id, 0);
    }

    #[test]
    fn funding_unknown_airline_is_rejected() {
        let (ledger, _) = scripted_ledger();
        // Skip the genesis registration (seq 2) by replaying a doctored stream.
        let mut records: Vec<EventRecord> = ledger.journal().records().to_vec();
        records.remove(1);
        for (i, record) in records.iter_mut().enumerate() {
            record.seq_id = i as u64 + 1;
        }

        let mut projection = HistoryProjection::new();
        let err = replay(&mut projection, &records).unwrap_err();
        assert!(matches!(err, ProjectionError::UnknownAirline { .. }));
    }

    #[test]
    fn reducer_name_is_stable() {
        assert_eq!(HistoryProjection::new().name(), "ledger-history");
    }
}
