//! Ledger events.
//!
//! Every committed state change emits one or more [`LedgerEvent`]s. Each
//! event carries the subject identity and the amount or key involved, so an
//! observer can rebuild ledger history from the stream alone (see
//! [`crate::projection`]).
//!
//! Events are appended to an [`EventJournal`] as hash-chained
//! [`EventRecord`]s. A failed operation appends nothing.

mod journal;


use serde::{Deserialize, Serialize};

pub use journal::{EventJournal, EventRecord, GENESIS_HASH, JournalError, verify_records};

use crate::amount::Amount;
use crate::flight::{FlightKey, FlightStatus, Route};
use crate::identity::AccountId;

/// State-change notification emitted by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum LedgerEvent {
    /// An airline was admitted.
    AirlineRegistered {
        /// The admitted airline.
        airline: AccountId,
        /// Votes held at admission (0 for direct admission).
        votes: u64,
    },

    /// An operational airline voted for a candidate.
    AirlineVoted {
        /// The candidate.
        candidate: AccountId,
        /// The voter.
        voter: AccountId,
        /// Distinct votes for the candidate after this one.
        votes: u64,
    },

    /// An airline added funding.
    AirlineFunded {
        /// The funded airline.
        airline: AccountId,
        /// Amount added by this call.
        amount: Amount,
        /// Cumulative funds after this call.
        total_funds: Amount,
        /// Whether the airline is operational after this call.
        operational: bool,
    },

    /// The global operational switch was flipped.
    OperationalModeChanged {
        /// New mode.
        operational: bool,
    },

    /// The owner designated a new controller.
    ControllerAuthorized {
        /// The newly authorized controller.
        controller: AccountId,
    },

    /// A flight was registered.
    FlightRegistered {
        /// The flight key.
        key: FlightKey,
        /// Hex BLAKE3 digest of the key.
        digest: String,
        /// Route flown.
        route: Route,
        /// Payout multiplier in percent.
        payout_multiplier: u32,
    },

    /// A flight's status was reported.
    FlightStatusUpdated {
        /// The flight key.
        key: FlightKey,
        /// Reported status.
        status: FlightStatus,
        /// Report timestamp.
        updated_at: u64,
    },

    /// A passenger bought cover.
    InsurancePurchased {
        /// The passenger.
        passenger: AccountId,
        /// The flight.
        key: FlightKey,
        /// Premium paid.
        amount: Amount,
    },

    /// A passenger's payout was credited.
    InsureeCredited {
        /// The passenger.
        passenger: AccountId,
        /// The flight.
        key: FlightKey,
        /// Payout added by this credit.
        amount: Amount,
        /// Credit balance after this event.
        credit: Amount,
    },

    /// A passenger withdrew their credit.
    InsureePaid {
        /// The passenger.
        passenger: AccountId,
        /// The flight.
        key: FlightKey,
        /// Amount transferred.
        amount: Amount,
    },
}

impl LedgerEvent {
    /// Returns the event type as a string.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::AirlineRegistered { .. } => "airline_registered",
            Self::AirlineVoted { .. } => "airline_voted",
            Self::AirlineFunded { .. } => "airline_funded",
            Self::OperationalModeChanged { .. } => "operational_mode_changed",
            Self::ControllerAuthorized { .. } => "controller_authorized",
            Self::FlightRegistered { .. } => "flight_registered",
            Self::FlightStatusUpdated { .. } => "flight_status_updated",
            Self::InsurancePurchased { .. } => "insurance_purchased",
            Self::InsureeCredited { .. } => "insuree_credited",
            Self::InsureePaid { .. } => "insuree_paid",
        }
    }

    /// Returns the deterministic byte encoding used for hash chaining.
    ///
    /// Strings are length-prefixed, integers big-endian, booleans one byte.
    /// The event type string leads so distinct variants never share an
    /// encoding.
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut enc = CanonicalEncoder::default();
        enc.put_str(self.event_type());
        match self {
            Self::AirlineRegistered { airline, votes } => {
                enc.put_str(airline.as_str());
                enc.put_u64(*votes);
            },
            Self::AirlineVoted {
                candidate,
                voter,
                votes,
            } => {
                enc.put_str(candidate.as_str());
                enc.put_str(voter.as_str());
                enc.put_u64(*votes);
            },
            Self::AirlineFunded {
                airline,
                amount,
                total_funds,
                operational,
            } => {
                enc.put_str(airline.as_str());
                enc.put_u64(*amount);
                enc.put_u64(*total_funds);
                enc.put_bool(*operational);
            },
            Self::OperationalModeChanged { operational } => enc.put_bool(*operational),
            Self::ControllerAuthorized { controller } => enc.put_str(controller.as_str()),
            Self::FlightRegistered {
                key,
                digest,
                route,
                payout_multiplier,
            } => {
                enc.put_key(key);
                enc.put_str(digest);
                enc.put_str(&route.from);
                enc.put_str(&route.to);
                enc.put_u64(u64::from(*payout_multiplier));
            },
            Self::FlightStatusUpdated {
                key,
                status,
                updated_at,
            } => {
                enc.put_key(key);
                enc.put_u64(u64::from(status.code()));
                enc.put_u64(*updated_at);
            },
            Self::InsurancePurchased {
                passenger,
                key,
                amount,
            }
            | Self::InsureePaid {
                passenger,
                key,
                amount,
            } => {
                enc.put_str(passenger.as_str());
                enc.put_key(key);
                enc.put_u64(*amount);
            },
            Self::InsureeCredited {
                passenger,
                key,
                amount,
                credit,
            } => {
                enc.put_str(passenger.as_str());
                enc.put_key(key);
                enc.put_u64(*amount);
                enc.put_u64(*credit);
            },
        }
        enc.finish()
    }
}

#[derive(Default)]
struct CanonicalEncoder {
    buf: Vec<u8>,
}

impl CanonicalEncoder {
    fn put_str(&mut self, value: &str) {
        self.put_u64(value.len() as u64);
        self.buf.extend_from_slice(value.as_bytes());
    }

    fn put_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    fn put_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    fn put_key(&mut self, key: &FlightKey) {
        self.put_str(key.airline().as_str());
        self.put_str(key.flight_code());
        self.put_u64(key.timestamp());
    }

    fn finish(self) -> Vec<u8> {
        self.buf
    }
}
