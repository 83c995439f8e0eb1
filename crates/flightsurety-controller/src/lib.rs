//! # flightsurety-controller
//!
//! Policy layer and sole authorized caller of the flight insurance ledger.
//!
//! The [`Controller`] decides *when* the ledger is asked to do something:
//!
//! - Whether a new airline is admitted directly or must be voted in
//!   ([`Controller::register_airline`], [`Controller::vote`])
//! - Which payout multiplier newly registered flights carry
//!   ([`Controller::register_flight`])
//! - How oracle status reports turn into credits
//!   ([`Controller::process_flight_status`])
//! - How a withdrawal's value transfer is sequenced around the ledger lock
//!   ([`Controller::pay`])
//!
//! All state lives in one [`flightsurety_core::Ledger`] guarded by a single
//! mutex, so concurrent callers observe one serialized history.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use flightsurety_controller::{Controller, ControllerConfig};
//! use flightsurety_core::prelude::*;
//! use flightsurety_core::transfer::RecordingTransfer;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let airline = AccountId::new("airline-1")?;
//! let passenger = AccountId::new("alice")?;
//! let ledger = LedgerConfig::new(AccountId::new("owner")?, AccountId::new("controller")?)
//!     .with_genesis_airline(airline.clone());
//! let transfer = Arc::new(RecordingTransfer::new());
//! let controller = Controller::new(ControllerConfig::new(ledger), transfer.clone())?;
//!
//! controller.fund(&airline, 10 * UNIT)?;
//! let flight = controller.register_flight(&airline, "ND1309", "LAX", "JFK", 1_700_000_000)?;
//! controller.buy(&passenger, &flight, UNIT)?;
//! controller.process_flight_status(&flight, FlightStatus::LateAirline, 1_700_003_600)?;
//!
//! assert_eq!(controller.pay(&passenger, &flight)?, 3 * UNIT / 2);
//! assert_eq!(transfer.total_to(&passenger), 3 * UNIT / 2);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod controller;
pub mod error;
pub mod policy;

pub use config::ControllerConfig;
pub use controller::{Admission, Controller};
pub use error::ControllerError;
pub use policy::PolicyConfig;
