//! Insurance purchase, crediting and withdrawal.

use tracing::{debug, info, warn};

use super::Ledger;
use crate::amount::{self, Amount, checked_add};
use crate::error::LedgerError;
use crate::events::LedgerEvent;
use crate::flight::{FlightKey, FlightStatus};
use crate::identity::AccountId;
use crate::insurance::{CreditSummary, InsuranceRecord, PendingPayout, PolicyKey};
use crate::transfer::ValueTransfer;

/// One planned credit: the policy, the payout added and the resulting
/// balance.
struct CreditPlan {
    policy: PolicyKey,
    payout: Amount,
    credit: Amount,
}

impl Ledger {
    /// Buys `amount` of cover for `passenger` on the flight `key`.
    ///
    /// # Errors
    ///
    /// - `LedgerError::NotOperational` while paused
    /// - `LedgerError::Unauthorized` if `caller` is not the controller
    /// - `LedgerError::FlightNotFound` if `key` is not registered
    /// - `LedgerError::InvalidInput` if `amount` is zero
    /// - `LedgerError::ExceedsCap` if `amount` exceeds the insurance cap
    /// - `LedgerError::InvalidState` if the flight already has a reported
    ///   status
    /// - `LedgerError::AlreadyInsured` if the passenger holds a policy on the
    ///   flight
    pub fn buy(
        &mut self,
        caller: &AccountId,
        passenger: &AccountId,
        key: &FlightKey,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.guard_mutation(caller)?;
        let flight = self
            .state
            .flights
            .get(key)
            .ok_or_else(|| LedgerError::FlightNotFound { key: key.clone() })?;
        if amount == 0 {
            return Err(LedgerError::invalid_input("insurance amount must be non-zero"));
        }
        if amount > self.config.max_insurance {
            return Err(LedgerError::ExceedsCap {
                amount,
                cap: self.config.max_insurance,
            });
        }
        if flight.status != FlightStatus::Unknown {
            return Err(LedgerError::invalid_state(format!(
                "flight {key} already reported {}",
                flight.status
            )));
        }
        let policy = PolicyKey::new(passenger.clone(), key.clone());
        if self.state.policies.contains_key(&policy) {
            return Err(LedgerError::AlreadyInsured {
                passenger: passenger.clone(),
                key: key.clone(),
            });
        }

        if let Some(flight) = self.state.flights.get_mut(key) {
            flight.passengers.push(passenger.clone());
        }
        self.state
            .policies
            .insert(policy, InsuranceRecord::new(passenger.clone(), amount));
        self.commit(vec![LedgerEvent::InsurancePurchased {
            passenger: passenger.clone(),
            key: key.clone(),
            amount,
        }]);

        debug!(passenger = %passenger, flight = %key, amount, "insurance purchased");
        Ok(())
    }

    /// Credits every not-yet-credited passenger of a delayed flight.
    ///
    /// Each payout is `insured_amount * payout_multiplier / 100`, truncated.
    /// The whole passenger list is processed in one step: every payout is
    /// computed before any record is written, so an overflow on one
    /// passenger leaves all of them untouched. Passengers already credited
    /// are skipped, which makes repeated calls harmless.
    ///
    /// # Errors
    ///
    /// - `LedgerError::NotOperational` while paused
    /// - `LedgerError::Unauthorized` if `caller` is not the controller
    /// - `LedgerError::FlightNotFound` if `key` is not registered
    /// - `LedgerError::InvalidState` unless the flight is `LATE_AIRLINE`
    /// - `LedgerError::AmountOverflow` if a payout overflows
    pub fn credit_insurees(
        &mut self,
        caller: &AccountId,
        key: &FlightKey,
    ) -> Result<CreditSummary, LedgerError> {
        self.guard_mutation(caller)?;
        let flight = self
            .state
            .flights
            .get(key)
            .ok_or_else(|| LedgerError::FlightNotFound { key: key.clone() })?;
        if !flight.status.is_airline_delay() {
            return Err(LedgerError::invalid_state(format!(
                "flight {key} is {}, not {}",
                flight.status,
                FlightStatus::LateAirline
            )));
        }

        let (plan, summary) = self.plan_credits(key)?;
        let events = self.apply_credits(key, plan);
        self.commit(events);

        info!(
            flight = %key,
            passengers = summary.passengers_credited,
            total = summary.total_credited,
            "insurees credited"
        );
        Ok(summary)
    }

    /// Records a status report and, for `LATE_AIRLINE`, credits the flight's
    /// insurees in the same step.
    ///
    /// Credits are planned before the status is written, so a failure leaves
    /// both the status and every policy untouched. Returns the credit
    /// summary when crediting ran.
    ///
    /// # Errors
    ///
    /// - `LedgerError::NotOperational` while paused
    /// - `LedgerError::Unauthorized` if `caller` is not the controller
    /// - `LedgerError::FlightNotFound` if `key` is not registered
    /// - `LedgerError::AmountOverflow` if a payout overflows
    pub fn report_flight_status(
        &mut self,
        caller: &AccountId,
        key: &FlightKey,
        status: FlightStatus,
        updated_at: u64,
    ) -> Result<Option<CreditSummary>, LedgerError> {
        if !status.is_airline_delay() {
            self.set_flight_status(caller, key, status, updated_at)?;
            return Ok(None);
        }

        self.guard_mutation(caller)?;
        let (plan, summary) = self.plan_credits(key)?;
        let Some(flight) = self.state.flights.get_mut(key) else {
            return Err(LedgerError::FlightNotFound { key: key.clone() });
        };
        flight.status = status;
        flight.updated_at = updated_at;

        let mut events = vec![LedgerEvent::FlightStatusUpdated {
            key: key.clone(),
            status,
            updated_at,
        }];
        events.extend(self.apply_credits(key, plan));
        self.commit(events);

        info!(
            flight = %key,
            status = %status,
            updated_at,
            passengers = summary.passengers_credited,
            total = summary.total_credited,
            "delay reported and insurees credited"
        );
        Ok(Some(summary))
    }

    /// Computes every pending credit on `key` without writing anything.
    fn plan_credits(
        &self,
        key: &FlightKey,
    ) -> Result<(Vec<CreditPlan>, CreditSummary), LedgerError> {
        let flight = self
            .state
            .flights
            .get(key)
            .ok_or_else(|| LedgerError::FlightNotFound { key: key.clone() })?;

        let mut plan = Vec::new();
        let mut summary = CreditSummary::default();
        for passenger in &flight.passengers {
            let policy = PolicyKey::new(passenger.clone(), key.clone());
            let record = self.state.policies.get(&policy).ok_or_else(|| {
                LedgerError::invalid_state(format!(
                    "passenger {passenger} on {key} has no policy"
                ))
            })?;
            if record.credited {
                continue;
            }
            let payout = amount::payout(record.insured_amount, flight.payout_multiplier)?;
            let credit = checked_add(record.insurance_credit, payout)?;
            summary.passengers_credited += 1;
            summary.total_credited = checked_add(summary.total_credited, payout)?;
            plan.push(CreditPlan {
                policy,
                payout,
                credit,
            });
        }
        Ok((plan, summary))
    }

    fn apply_credits(&mut self, key: &FlightKey, plan: Vec<CreditPlan>) -> Vec<LedgerEvent> {
        let mut events = Vec::with_capacity(plan.len());
        for CreditPlan {
            policy,
            payout,
            credit,
        } in plan
        {
            events.push(LedgerEvent::InsureeCredited {
                passenger: policy.passenger.clone(),
                key: key.clone(),
                amount: payout,
                credit,
            });
            if let Some(record) = self.state.policies.get_mut(&policy) {
                record.credited = true;
                record.insurance_credit = credit;
            }
        }
        events
    }

    /// First phase of a withdrawal: zeroes the policy and parks the payout.
    ///
    /// Only the passenger's own policy can be withdrawn: the policy is looked
    /// up by `(passenger, key)`. Credit and insured amount are zeroed before
    /// any value moves, so a nested withdrawal attempted during the transfer
    /// finds nothing to withdraw. No event is emitted until
    /// [`complete_payout`](Self::complete_payout).
    ///
    /// # Errors
    ///
    /// - `LedgerError::NotOperational` while paused
    /// - `LedgerError::Unauthorized` if `caller` is not the controller
    /// - `LedgerError::NoFundsAvailable` if the policy is absent or holds no
    ///   credit
    pub fn begin_payout(
        &mut self,
        caller: &AccountId,
        passenger: &AccountId,
        key: &FlightKey,
    ) -> Result<PendingPayout, LedgerError> {
        self.guard_mutation(caller)?;
        let policy = PolicyKey::new(passenger.clone(), key.clone());
        let no_funds = || LedgerError::NoFundsAvailable {
            passenger: passenger.clone(),
            key: key.clone(),
        };
        let record = self.state.policies.get_mut(&policy).ok_or_else(no_funds)?;
        if record.insurance_credit == 0 {
            return Err(no_funds());
        }

        let pending = PendingPayout {
            policy: policy.clone(),
            amount: record.insurance_credit,
            insured_amount: record.insured_amount,
        };
        record.insurance_credit = 0;
        record.insured_amount = 0;
        self.state.pending_payouts.insert(policy, pending.clone());

        debug!(passenger = %passenger, flight = %key, amount = pending.amount, "payout started");
        Ok(pending)
    }

    /// Second phase of a successful withdrawal: emits `InsureePaid`.
    ///
    /// Pausing and controller rotation are refused while a payout is
    /// outstanding, so the controller that began it is still authorized and
    /// the ledger is still operational here.
    ///
    /// # Errors
    ///
    /// - `LedgerError::Unauthorized` if `caller` is not the controller
    /// - `LedgerError::PayoutNotPending` if `pending` is not outstanding
    pub fn complete_payout(
        &mut self,
        caller: &AccountId,
        pending: &PendingPayout,
    ) -> Result<(), LedgerError> {
        self.require_controller(caller)?;
        self.take_pending(pending)?;
        self.commit(vec![LedgerEvent::InsureePaid {
            passenger: pending.policy.passenger.clone(),
            key: pending.policy.flight.clone(),
            amount: pending.amount,
        }]);

        info!(
            passenger = %pending.policy.passenger,
            flight = %pending.policy.flight,
            amount = pending.amount,
            "insuree paid"
        );
        Ok(())
    }

    /// Second phase of a failed withdrawal: restores the policy.
    ///
    /// Emits nothing; observers never saw the withdrawal.
    ///
    /// # Errors
    ///
    /// - `LedgerError::Unauthorized` if `caller` is not the controller
    /// - `LedgerError::PayoutNotPending` if `pending` is not outstanding
    pub fn revert_payout(
        &mut self,
        caller: &AccountId,
        pending: &PendingPayout,
    ) -> Result<(), LedgerError> {
        self.require_controller(caller)?;
        let record = self.state.policies.get(&pending.policy).ok_or_else(|| {
            LedgerError::invalid_state(format!(
                "policy of {} on {} vanished during payout",
                pending.policy.passenger, pending.policy.flight
            ))
        })?;
        let restored_credit = checked_add(record.insurance_credit, pending.amount)?;
        let restored_insured = checked_add(record.insured_amount, pending.insured_amount)?;
        self.take_pending(pending)?;

        if let Some(record) = self.state.policies.get_mut(&pending.policy) {
            record.insurance_credit = restored_credit;
            record.insured_amount = restored_insured;
        }

        warn!(
            passenger = %pending.policy.passenger,
            flight = %pending.policy.flight,
            amount = pending.amount,
            "payout reverted"
        );
        Ok(())
    }

    /// Withdraws a passenger's credit through `transfer` in one call.
    ///
    /// Zeroes the policy, transfers the value, then emits `InsureePaid`. If
    /// the transfer fails the policy is restored and
    /// `LedgerError::TransferFailed` is returned. Returns the amount paid.
    ///
    /// # Errors
    ///
    /// Any error of [`begin_payout`](Self::begin_payout), or
    /// `LedgerError::TransferFailed`.
    pub fn pay(
        &mut self,
        caller: &AccountId,
        passenger: &AccountId,
        key: &FlightKey,
        transfer: &dyn ValueTransfer,
    ) -> Result<Amount, LedgerError> {
        let pending = self.begin_payout(caller, passenger, key)?;
        match transfer.transfer(&pending.policy.passenger, pending.amount) {
            Ok(()) => {
                self.complete_payout(caller, &pending)?;
                Ok(pending.amount)
            },
            Err(source) => {
                self.revert_payout(caller, &pending)?;
                Err(LedgerError::TransferFailed {
                    passenger: passenger.clone(),
                    amount: pending.amount,
                    source,
                })
            },
        }
    }

    fn take_pending(&mut self, pending: &PendingPayout) -> Result<(), LedgerError> {
        let matches = self
            .state
            .pending_payouts
            .get(&pending.policy)
            .is_some_and(|parked| parked == pending);
        if !matches {
            return Err(LedgerError::PayoutNotPending {
                passenger: pending.policy.passenger.clone(),
                key: pending.policy.flight.clone(),
            });
        }
        self.state.pending_payouts.remove(&pending.policy);
        Ok(())
    }
}
