//! Fuzz harness for controller operation sequences.
//!
//! Each input byte chunk decodes into one controller operation over a small
//! pool of airlines, passengers and flights. After every operation the
//! ledger invariants and the journal chain must hold, and a failed
//! operation must leave the snapshot untouched.

#![no_main]
use std::sync::Arc;

use flightsurety_controller::{Controller, ControllerConfig};
use flightsurety_core::amount::UNIT;
use flightsurety_core::config::LedgerConfig;
use flightsurety_core::flight::{FlightKey, FlightStatus};
use flightsurety_core::identity::AccountId;
use flightsurety_core::transfer::RecordingTransfer;
use libfuzzer_sys::fuzz_target;

const AIRLINES: [&str; 6] = ["air-0", "air-1", "air-2", "air-3", "air-4", "air-5"];
const PASSENGERS: [&str; 3] = ["pax-0", "pax-1", "pax-2"];
const CODES: [&str; 2] = ["F1", "F2"];
const DEPARTURE: u64 = 1_700_000_000;

fn account(name: &str) -> AccountId {
    AccountId::new(name).expect("fuzz identities are valid")
}

fn airline(byte: u8) -> AccountId {
    account(AIRLINES[usize::from(byte) % AIRLINES.len()])
}

fn passenger(byte: u8) -> AccountId {
    account(PASSENGERS[usize::from(byte) % PASSENGERS.len()])
}

fn flight(a: u8, c: u8) -> FlightKey {
    FlightKey::new(airline(a), CODES[usize::from(c) % CODES.len()], DEPARTURE)
        .expect("fuzz flight keys are valid")
}

fn run(controller: &Controller, transfer: &RecordingTransfer, op: &[u8; 4]) -> bool {
    let [tag, a, b, c] = *op;
    match tag % 10 {
        0 => controller.register_airline(&airline(a), &airline(b)).is_ok(),
        1 => controller.vote(&airline(a), &airline(b)).is_ok(),
        2 => controller
            .fund(&airline(a), u64::from(b) * UNIT / 16)
            .is_ok(),
        3 => controller
            .register_flight(&airline(a), CODES[usize::from(b) % CODES.len()], "AAA", "BBB", DEPARTURE)
            .is_ok(),
        4 => {
            let status = FlightStatus::all()[usize::from(c) % FlightStatus::all().len()];
            controller
                .process_flight_status(&flight(a, b), status, DEPARTURE + u64::from(c))
                .is_ok()
        },
        5 => controller
            .buy(&passenger(c), &flight(a, b), u64::from(c) * UNIT / 200)
            .is_ok(),
        6 => {
            transfer.set_failing(c % 4 == 0);
            controller.pay(&passenger(c), &flight(a, b)).is_ok()
        },
        7 => {
            let mode = !controller.is_operational_mode();
            controller.set_operational(&account("owner"), mode).is_ok()
        },
        8 => controller
            .authorize_caller(&airline(a), &account("controller"))
            .is_ok(),
        _ => controller.is_valid_flight(&airline(a), "F1", DEPARTURE).is_ok(),
    }
}

fuzz_target!(|data: &[u8]| {
    let ledger = LedgerConfig::new(account("owner"), account("controller"))
        .with_genesis_airline(account(AIRLINES[0]));
    let transfer = Arc::new(RecordingTransfer::new());
    let Ok(controller) = Controller::new(ControllerConfig::new(ledger), transfer.clone()) else {
        return;
    };

    for chunk in data.chunks_exact(4).take(256) {
        let op = [chunk[0], chunk[1], chunk[2], chunk[3]];
        let before = controller.snapshot();
        let events = controller.event_count();

        if !run(&controller, &transfer, &op) {
            assert_eq!(controller.snapshot(), before, "failed op {op:?} changed state");
            assert_eq!(controller.event_count(), events, "failed op {op:?} emitted events");
        }
        controller
            .verify()
            .unwrap_or_else(|e| panic!("invariant violated after {op:?}: {e}"));
    }
});
