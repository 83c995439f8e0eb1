//! # flightsurety-core
//!
//! Ledger core for parametric flight-delay insurance.
//!
//! The [`Ledger`](ledger::Ledger) is the single source of truth for airline
//! membership, flight registrations and passenger insurance records. It is
//! driven by one authorized controller and exposes:
//!
//! - Airline admission and voting via [`Ledger::register_airline`] and
//!   [`Ledger::set_vote`]
//! - Funding toward operational status via [`Ledger::fund`]
//! - Flight registration and status reports via [`Ledger::register_flight`]
//!   and [`Ledger::set_flight_status`]
//! - Insurance purchase, crediting and withdrawal via [`Ledger::buy`],
//!   [`Ledger::credit_insurees`] and [`Ledger::pay`]
//! - An owner-controlled operational switch via [`Ledger::set_operational`]
//!
//! ## Core Concepts
//!
//! - **Operational airline**: a registered airline whose cumulative funding
//!   reached the funding threshold
//! - **Flight key**: the composite `(airline, flight code, timestamp)`
//!   identity of a flight instance
//! - **Credit**: the withdrawable payout of a policy on an airline-delayed
//!   flight
//! - **Journal**: the append-only, hash-chained record of every committed
//!   state change
//!
//! Value transfer is abstracted behind [`ValueTransfer`](transfer::ValueTransfer);
//! the admission policy (direct vs voted) lives in the controller crate.
//!
//! [`Ledger::register_airline`]: ledger::Ledger::register_airline
//! [`Ledger::set_vote`]: ledger::Ledger::set_vote
//! [`Ledger::fund`]: ledger::Ledger::fund
//! [`Ledger::register_flight`]: ledger::Ledger::register_flight
//! [`Ledger::set_flight_status`]: ledger::Ledger::set_flight_status
//! [`Ledger::buy`]: ledger::Ledger::buy
//! [`Ledger::credit_insurees`]: ledger::Ledger::credit_insurees
//! [`Ledger::pay`]: ledger::Ledger::pay
//! [`Ledger::set_operational`]: ledger::Ledger::set_operational

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod airline;
pub mod amount;
pub mod config;
pub mod error;
pub mod events;
pub mod flight;
pub mod identity;
pub mod insurance;
pub mod ledger;
pub mod projection;
pub mod transfer;

// Re-export main types at crate root for convenience
pub use airline::{Airline, VoteRecord};
pub use amount::{Amount, UNIT};
pub use config::{ConfigError, LedgerConfig};
pub use error::{ErrorKind, LedgerError, Role};
pub use events::{EventJournal, EventRecord, JournalError, LedgerEvent};
pub use flight::{Flight, FlightKey, FlightStatus, Route};
pub use identity::AccountId;
pub use insurance::{CreditSummary, InsuranceRecord, PendingPayout, PolicyKey};
pub use ledger::{Ledger, LedgerReader, LedgerSnapshot};
pub use projection::{HistoryProjection, ProjectionError, Reducer};
pub use transfer::{RecordingTransfer, TransferError, ValueTransfer};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::amount::{Amount, UNIT};
    pub use crate::config::LedgerConfig;
    pub use crate::error::{ErrorKind, LedgerError};
    pub use crate::events::LedgerEvent;
    pub use crate::flight::{FlightKey, FlightStatus, Route};
    pub use crate::identity::AccountId;
    pub use crate::ledger::Ledger;
    pub use crate::transfer::ValueTransfer;
}
