//! Property-based tests for payouts through the controller.
//!
//! `Controller::pay` releases the ledger lock while value moves. These
//! properties run random operation sequences in which the transfer target
//! acts on the controller mid-payout, and check that every payout settles
//! exactly once and that the journal agrees with what was delivered.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{OnceLock, Weak};

use flightsurety_core::amount::UNIT;
use flightsurety_core::config::LedgerConfig;
use flightsurety_core::error::ErrorKind;
use flightsurety_core::events::LedgerEvent;
use flightsurety_core::transfer::TransferError;
use proptest::prelude::*;

use super::*;

const AIRLINES: &[&str] = &["air-0", "air-1", "air-2", "air-3", "air-4"];
const PASSENGERS: &[&str] = &["pax-0", "pax-1", "pax-2"];
const CODES: &[&str] = &["F1", "F2"];
const DEPARTURE: u64 = 1_700_000_000;

/// Something the transfer target does while it is being paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interleave {
    Pause,
    Rotate,
    Pay { passenger: usize },
    Buy { passenger: usize },
    Report { status: usize },
}

#[derive(Debug, Clone)]
enum Op {
    Admit { sponsor: usize, candidate: usize },
    Fund { airline: usize, amount: Amount },
    RegisterFlight { airline: usize, code: usize },
    Report { airline: usize, code: usize, status: usize },
    Buy { passenger: usize, airline: usize, code: usize, amount: Amount },
    Pay {
        passenger: usize,
        airline: usize,
        code: usize,
        fail: bool,
        during: Option<Interleave>,
    },
    Toggle,
}

fn interleave_strategy() -> impl Strategy<Value = Interleave> {
    prop_oneof![
        Just(Interleave::Pause),
        Just(Interleave::Rotate),
        (0..PASSENGERS.len()).prop_map(|passenger| Interleave::Pay { passenger }),
        (0..PASSENGERS.len()).prop_map(|passenger| Interleave::Buy { passenger }),
        (0..FlightStatus::all().len()).prop_map(|status| Interleave::Report { status }),
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let airline = 0..AIRLINES.len();
    let code = 0..CODES.len();
    prop_oneof![
        (airline.clone(), airline.clone())
            .prop_map(|(sponsor, candidate)| Op::Admit { sponsor, candidate }),
        (airline.clone(), 0..=6 * UNIT).prop_map(|(airline, amount)| Op::Fund { airline, amount }),
        (airline.clone(), code.clone())
            .prop_map(|(airline, code)| Op::RegisterFlight { airline, code }),
        (airline.clone(), code.clone(), 0..FlightStatus::all().len())
            .prop_map(|(airline, code, status)| Op::Report { airline, code, status }),
        (0..PASSENGERS.len(), airline.clone(), code.clone(), 1..=UNIT).prop_map(
            |(passenger, airline, code, amount)| Op::Buy {
                passenger,
                airline,
                code,
                amount,
            }
        ),
        (
            0..PASSENGERS.len(),
            airline,
            code,
            any::<bool>(),
            prop::option::of(interleave_strategy()),
        )
            .prop_map(|(passenger, airline, code, fail, during)| Op::Pay {
                passenger,
                airline,
                code,
                fail,
                during,
            }),
        Just(Op::Toggle),
    ]
}

fn id(s: &str) -> AccountId {
    AccountId::new(s).unwrap()
}

fn key(airline: usize, code: usize) -> FlightKey {
    FlightKey::new(id(AIRLINES[airline]), CODES[code], DEPARTURE).unwrap()
}

/// Transfer target that runs one staged step against the controller while
/// it is being paid.
#[derive(Default)]
struct InterleavingTransfer {
    controller: OnceLock<Weak<Controller>>,
    during: Mutex<Option<(Interleave, FlightKey)>>,
    fail: AtomicBool,
    delivered: Mutex<Amount>,
    interleaved: Mutex<Vec<(Interleave, Result<(), ErrorKind>)>>,
}

impl ValueTransfer for InterleavingTransfer {
    fn transfer(&self, _to: &AccountId, amount: Amount) -> Result<(), TransferError> {
        // Nested payouts made by the staged step always succeed.
        let fail = self.fail.swap(false, Ordering::SeqCst);
        let staged = self.during.lock().unwrap().take();
        if let Some((step, key)) = staged {
            let controller = self
                .controller
                .get()
                .and_then(Weak::upgrade)
                .ok_or_else(|| TransferError::Unavailable {
                    reason: "controller gone".to_string(),
                })?;
            let outcome = interleave(&controller, step, &key);
            self.interleaved.lock().unwrap().push((step, outcome));
        }
        if fail {
            return Err(TransferError::Rejected {
                reason: "declined".to_string(),
            });
        }
        *self.delivered.lock().unwrap() += amount;
        Ok(())
    }
}

fn interleave(controller: &Controller, step: Interleave, key: &FlightKey) -> Result<(), ErrorKind> {
    let owner = id("owner");
    let result = match step {
        Interleave::Pause => controller.set_operational(&owner, false),
        Interleave::Rotate => controller.authorize_caller(&owner, &id("controller-2")),
        Interleave::Pay { passenger } => controller.pay(&id(PASSENGERS[passenger]), key).map(drop),
        Interleave::Buy { passenger } => controller.buy(&id(PASSENGERS[passenger]), key, UNIT),
        Interleave::Report { status } => controller
            .process_flight_status(key, FlightStatus::all()[status], DEPARTURE + 1)
            .map(drop),
    };
    result.map_err(|e| e.kind().unwrap_or(ErrorKind::InvalidInput))
}

fn apply(
    controller: &Controller,
    transfer: &InterleavingTransfer,
    op: &Op,
) -> Result<(), ControllerError> {
    match *op {
        Op::Admit { sponsor, candidate } => controller
            .register_airline(&id(AIRLINES[sponsor]), &id(AIRLINES[candidate]))
            .map(drop),
        Op::Fund { airline, amount } => controller.fund(&id(AIRLINES[airline]), amount).map(drop),
        Op::RegisterFlight { airline, code } => controller
            .register_flight(&id(AIRLINES[airline]), CODES[code], "AAA", "BBB", DEPARTURE)
            .map(drop),
        Op::Report {
            airline,
            code,
            status,
        } => controller
            .process_flight_status(&key(airline, code), FlightStatus::all()[status], DEPARTURE)
            .map(drop),
        Op::Buy {
            passenger,
            airline,
            code,
            amount,
        } => controller.buy(&id(PASSENGERS[passenger]), &key(airline, code), amount),
        Op::Pay {
            passenger,
            airline,
            code,
            fail,
            during,
        } => {
            let key = key(airline, code);
            transfer.fail.store(fail, Ordering::SeqCst);
            *transfer.during.lock().unwrap() = during.map(|step| (step, key.clone()));
            let result = controller.pay(&id(PASSENGERS[passenger]), &key).map(drop);
            // Unused when the payout was rejected before any transfer.
            transfer.fail.store(false, Ordering::SeqCst);
            transfer.during.lock().unwrap().take();
            result
        },
        Op::Toggle => {
            let mode = !controller.is_operational_mode();
            controller.set_operational(&id("owner"), mode)
        },
    }
}

fn paid_in_journal(controller: &Controller) -> Amount {
    controller
        .events(0, usize::MAX)
        .iter()
        .filter_map(|record| match record.event {
            LedgerEvent::InsureePaid { amount, .. } => Some(amount),
            _ => None,
        })
        .sum()
}

fn fresh() -> (Arc<Controller>, Arc<InterleavingTransfer>) {
    let transfer = Arc::new(InterleavingTransfer::default());
    let config = ControllerConfig::new(
        LedgerConfig::new(id("owner"), id("controller")).with_genesis_airline(id(AIRLINES[0])),
    );
    let controller = Arc::new(Controller::new(config, transfer.clone()).unwrap());
    transfer.controller.set(Arc::downgrade(&controller)).unwrap();
    (controller, transfer)
}

proptest! {
    /// Property: payouts settle exactly once even when the payee acts on the
    /// controller during the transfer.
    #[test]
    fn prop_payouts_settle_once_under_interleaving(
        ops in prop::collection::vec(op_strategy(), 1..50),
    ) {
        let (controller, transfer) = fresh();

        for op in &ops {
            let before = controller.snapshot();
            let events = controller.event_count();
            let result = apply(&controller, &transfer, op);

            let interleaved = matches!(op, Op::Pay { during: Some(_), .. });
            if result.is_err() && !interleaved {
                prop_assert_eq!(&controller.snapshot(), &before);
                prop_assert_eq!(controller.event_count(), events);
            }

            prop_assert!(controller.verify().is_ok());
            // Still authorized, and nothing left half settled.
            prop_assert_eq!(controller.read(|r| r.pending_payout_count()).unwrap(), 0);
            let delivered = *transfer.delivered.lock().unwrap();
            prop_assert_eq!(paid_in_journal(&controller), delivered);
        }

        for (step, outcome) in transfer.interleaved.lock().unwrap().iter() {
            if matches!(step, Interleave::Pause | Interleave::Rotate) {
                prop_assert_eq!(*outcome, Err(ErrorKind::InvalidState));
            }
        }
    }

    /// Property: a failed transfer hands the credit back whatever the payee
    /// did meanwhile.
    #[test]
    fn prop_failed_transfer_restores_credit(
        during in prop::option::of(interleave_strategy()),
        others in prop::collection::vec(1..=UNIT, 0..3),
    ) {
        let (controller, transfer) = fresh();
        let alice = id(PASSENGERS[0]);
        controller.fund(&id(AIRLINES[0]), 10 * UNIT).unwrap();
        let flight = controller
            .register_flight(&id(AIRLINES[0]), CODES[0], "AAA", "BBB", DEPARTURE)
            .unwrap();
        controller.buy(&alice, &flight, UNIT).unwrap();
        for (i, amount) in others.iter().enumerate() {
            controller.buy(&id(PASSENGERS[i + 1]), &flight, *amount).unwrap();
        }
        controller
            .process_flight_status(&flight, FlightStatus::LateAirline, DEPARTURE)
            .unwrap();

        transfer.fail.store(true, Ordering::SeqCst);
        *transfer.during.lock().unwrap() = during.map(|step| (step, flight.clone()));
        let err = controller.pay(&alice, &flight).unwrap_err();

        prop_assert_eq!(err.kind(), Some(ErrorKind::TransferFailed));
        prop_assert_eq!(controller.insurance_credit(&alice, &flight).unwrap(), 3 * UNIT / 2);
        prop_assert!(controller.is_operational_mode());
        prop_assert!(controller.verify().is_ok());
        let delivered = *transfer.delivered.lock().unwrap();
        prop_assert_eq!(paid_in_journal(&controller), delivered);
    }
}
