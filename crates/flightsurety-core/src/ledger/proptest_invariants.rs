//! Property-based tests for ledger invariants.
//!
//! Random operation sequences are driven against a ledger; after every step
//! the state invariants must hold, a failed step must leave no trace, and the
//! journal must still verify.

use proptest::prelude::*;

use super::*;
use crate::amount::UNIT;
use crate::flight::{FlightStatus, Route};
use crate::transfer::RecordingTransfer;

const AIRLINES: &[&str] = &["air-0", "air-1", "air-2", "air-3", "air-4", "air-5"];
const PASSENGERS: &[&str] = &["pax-0", "pax-1", "pax-2"];
const CODES: &[&str] = &["F1", "F2"];

#[derive(Debug, Clone)]
enum Op {
    Register { airline: usize },
    Vote { candidate: usize, voter: usize },
    Fund { airline: usize, amount: Amount },
    RegisterFlight { airline: usize, code: usize },
    SetStatus { airline: usize, code: usize, status: usize },
    Buy { passenger: usize, airline: usize, code: usize, amount: Amount },
    Credit { airline: usize, code: usize },
    Report { airline: usize, code: usize, status: usize },
    Pay { passenger: usize, airline: usize, code: usize, fail: bool },
    Toggle,
    Intrude,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let airline = 0..AIRLINES.len();
    prop_oneof![
        airline.clone().prop_map(|airline| Op::Register { airline }),
        (airline.clone(), airline.clone())
            .prop_map(|(candidate, voter)| Op::Vote { candidate, voter }),
        (airline.clone(), 0..=6 * UNIT).prop_map(|(airline, amount)| Op::Fund { airline, amount }),
        (airline.clone(), 0..CODES.len())
            .prop_map(|(airline, code)| Op::RegisterFlight { airline, code }),
        (airline.clone(), 0..CODES.len(), 0..FlightStatus::all().len(), any::<bool>()).prop_map(
            |(airline, code, status, report)| if report {
                Op::Report { airline, code, status }
            } else {
                Op::SetStatus { airline, code, status }
            }
        ),
        (0..PASSENGERS.len(), airline.clone(), 0..CODES.len(), 0..=UNIT + 1).prop_map(
            |(passenger, airline, code, amount)| Op::Buy {
                passenger,
                airline,
                code,
                amount,
            }
        ),
        (airline.clone(), 0..CODES.len()).prop_map(|(airline, code)| Op::Credit { airline, code }),
        (0..PASSENGERS.len(), airline, 0..CODES.len(), any::<bool>()).prop_map(
            |(passenger, airline, code, fail)| Op::Pay {
                passenger,
                airline,
                code,
                fail,
            }
        ),
        Just(Op::Toggle),
        Just(Op::Intrude),
    ]
}

fn id(s: &str) -> AccountId {
    AccountId::new(s).unwrap()
}

fn key(airline: usize, code: usize) -> FlightKey {
    FlightKey::new(id(AIRLINES[airline]), CODES[code], 1_700_000_000).unwrap()
}

fn apply(ledger: &mut Ledger, transfer: &RecordingTransfer, op: &Op) -> Result<(), LedgerError> {
    let controller = id("controller");
    match op {
        Op::Register { airline } => ledger.register_airline(&controller, &id(AIRLINES[*airline])),
        Op::Vote { candidate, voter } => ledger
            .set_vote(&controller, &id(AIRLINES[*candidate]), &id(AIRLINES[*voter]))
            .map(drop),
        Op::Fund { airline, amount } => ledger
            .fund(&controller, &id(AIRLINES[*airline]), *amount)
            .map(drop),
        Op::RegisterFlight { airline, code } => ledger
            .register_flight(
                &controller,
                &id(AIRLINES[*airline]),
                CODES[*code],
                Route::new("AAA", "BBB")?,
                1_700_000_000,
                150,
            )
            .map(drop),
        Op::SetStatus {
            airline,
            code,
            status,
        } => ledger.set_flight_status(
            &controller,
            &key(*airline, *code),
            FlightStatus::all()[*status],
            1_700_000_100,
        ),
        Op::Buy {
            passenger,
            airline,
            code,
            amount,
        } => ledger.buy(
            &controller,
            &id(PASSENGERS[*passenger]),
            &key(*airline, *code),
            *amount,
        ),
        Op::Credit { airline, code } => ledger
            .credit_insurees(&controller, &key(*airline, *code))
            .map(drop),
        Op::Report {
            airline,
            code,
            status,
        } => ledger
            .report_flight_status(
                &controller,
                &key(*airline, *code),
                FlightStatus::all()[*status],
                1_700_000_200,
            )
            .map(drop),
        Op::Pay {
            passenger,
            airline,
            code,
            fail,
        } => {
            transfer.set_failing(*fail);
            ledger
                .pay(
                    &controller,
                    &id(PASSENGERS[*passenger]),
                    &key(*airline, *code),
                    transfer,
                )
                .map(drop)
        },
        Op::Toggle => {
            let mode = !ledger.is_operational_mode();
            ledger.set_operational(&id("owner"), mode)
        },
        Op::Intrude => ledger.register_airline(&id("intruder"), &id(AIRLINES[0])),
    }
}

fn fresh_ledger() -> Ledger {
    let config =
        LedgerConfig::new(id("owner"), id("controller")).with_genesis_airline(id(AIRLINES[0]));
    Ledger::new(config).unwrap()
}

proptest! {
    /// Property: invariants hold after every step and failures change nothing.
    #[test]
    fn prop_invariants_hold_and_failures_leave_no_trace(
        ops in prop::collection::vec(op_strategy(), 1..60),
    ) {
        let mut ledger = fresh_ledger();
        let transfer = RecordingTransfer::new();

        for op in &ops {
            let before = ledger.snapshot();
            let journal_len = ledger.journal().len();
            let was_paused = !ledger.is_operational_mode();

            match apply(&mut ledger, &transfer, op) {
                Ok(()) => {
                    // Nothing but the switch changes while paused.
                    if was_paused {
                        prop_assert!(matches!(op, Op::Toggle));
                    }
                },
                Err(_) => {
                    prop_assert_eq!(&ledger.snapshot(), &before);
                    prop_assert_eq!(ledger.journal().len(), journal_len);
                },
            }

            prop_assert!(ledger.check_invariants().is_ok());
            prop_assert_eq!(ledger.reader(&id("controller")).unwrap().pending_payout_count(), 0);
        }

        prop_assert!(ledger.journal().verify_chain().is_ok());
    }

    /// Property: operability is never revoked and funds never decrease.
    #[test]
    fn prop_operability_is_monotonic(
        ops in prop::collection::vec(op_strategy(), 1..60),
    ) {
        let mut ledger = fresh_ledger();
        let transfer = RecordingTransfer::new();

        for op in &ops {
            let before = ledger.snapshot();
            let _ = apply(&mut ledger, &transfer, op);
            let after = ledger.snapshot();

            for (airline, record) in &before.airlines {
                let now = after
                    .airlines
                    .iter()
                    .find(|(a, _)| a == airline)
                    .map(|(_, r)| r);
                prop_assert!(now.is_some());
                if let Some(now) = now {
                    prop_assert!(now.funds >= record.funds);
                    prop_assert!(!record.operational || now.operational);
                }
            }
        }
    }

    /// Property: value paid out never exceeds value credited.
    #[test]
    fn prop_payouts_never_exceed_credits(
        ops in prop::collection::vec(op_strategy(), 1..80),
    ) {
        let mut ledger = fresh_ledger();
        let transfer = RecordingTransfer::new();
        for op in &ops {
            let _ = apply(&mut ledger, &transfer, op);
        }

        let mut credited: Amount = 0;
        let mut paid: Amount = 0;
        for event in ledger.journal().events() {
            match event {
                LedgerEvent::InsureeCredited { amount, .. } => credited += amount,
                LedgerEvent::InsureePaid { amount, .. } => paid += amount,
                _ => {},
            }
        }
        let settled: Amount = transfer.settled().iter().map(|t| t.amount).sum();
        prop_assert_eq!(paid, settled);
        prop_assert!(paid <= credited);
    }
}
