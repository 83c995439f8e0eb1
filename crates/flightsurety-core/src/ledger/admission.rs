//! Airline admission, voting and funding.

use tracing::{debug, info};

use super::Ledger;
use crate::airline::Airline;
use crate::amount::Amount;
use crate::error::LedgerError;
use crate::events::LedgerEvent;
use crate::identity::AccountId;

impl Ledger {
    /// Registers `candidate` as an airline.
    ///
    /// The admission policy (direct vs voted) belongs to the controller; the
    /// ledger only guarantees uniqueness. Votes collected for the candidate
    /// are cleared on admission and their count is reported in the
    /// `AirlineRegistered` event.
    ///
    /// # Errors
    ///
    /// - `LedgerError::NotOperational` while paused
    /// - `LedgerError::Unauthorized` if `caller` is not the controller
    /// - `LedgerError::AlreadyRegistered` if `candidate` is registered
    pub fn register_airline(
        &mut self,
        caller: &AccountId,
        candidate: &AccountId,
    ) -> Result<(), LedgerError> {
        self.guard_mutation(caller)?;
        if self.state.airlines.contains_key(candidate) {
            return Err(LedgerError::AlreadyRegistered {
                airline: candidate.clone(),
            });
        }

        let votes = self
            .state
            .votes
            .remove(candidate)
            .map_or(0, |record| record.count() as u64);
        self.state
            .airlines
            .insert(candidate.clone(), Airline::default());
        self.commit(vec![LedgerEvent::AirlineRegistered {
            airline: candidate.clone(),
            votes,
        }]);

        info!(airline = %candidate, votes, "airline registered");
        Ok(())
    }

    /// Records a vote from `voter` for admitting `candidate`.
    ///
    /// Returns the number of distinct votes the candidate holds afterwards.
    ///
    /// # Errors
    ///
    /// - `LedgerError::NotOperational` while paused
    /// - `LedgerError::Unauthorized` if `caller` is not the controller
    /// - `LedgerError::AlreadyRegistered` if `candidate` is registered
    /// - `LedgerError::AirlineNotRegistered` if `voter` is not an airline
    /// - `LedgerError::AirlineNotOperational` if `voter` is not funded
    /// - `LedgerError::DuplicateVote` if `voter` already voted for `candidate`
    pub fn set_vote(
        &mut self,
        caller: &AccountId,
        candidate: &AccountId,
        voter: &AccountId,
    ) -> Result<usize, LedgerError> {
        self.guard_mutation(caller)?;
        if self.state.airlines.contains_key(candidate) {
            return Err(LedgerError::AlreadyRegistered {
                airline: candidate.clone(),
            });
        }
        match self.state.airlines.get(voter) {
            None => {
                return Err(LedgerError::AirlineNotRegistered {
                    airline: voter.clone(),
                });
            },
            Some(airline) if !airline.operational => {
                return Err(LedgerError::AirlineNotOperational {
                    airline: voter.clone(),
                });
            },
            Some(_) => {},
        }
        let already_voted = self
            .state
            .votes
            .get(candidate)
            .is_some_and(|record| record.contains(voter));
        if already_voted {
            return Err(LedgerError::DuplicateVote {
                candidate: candidate.clone(),
                voter: voter.clone(),
            });
        }

        let record = self
            .state
            .votes
            .entry(candidate.clone())
            .or_default();
        record.insert(voter.clone());
        let votes = record.count();
        self.commit(vec![LedgerEvent::AirlineVoted {
            candidate: candidate.clone(),
            voter: voter.clone(),
            votes: votes as u64,
        }]);

        debug!(candidate = %candidate, voter = %voter, votes, "airline vote recorded");
        Ok(votes)
    }

    /// Adds `amount` to an airline's cumulative funds.
    ///
    /// The airline becomes operational on the call that brings its funds to
    /// the threshold. Returns the airline's updated record.
    ///
    /// # Errors
    ///
    /// - `LedgerError::NotOperational` while paused
    /// - `LedgerError::Unauthorized` if `caller` is not the controller
    /// - `LedgerError::InvalidInput` if `amount` is zero
    /// - `LedgerError::AirlineNotRegistered` if `airline` is unknown
    /// - `LedgerError::AmountOverflow` if funds would overflow
    pub fn fund(
        &mut self,
        caller: &AccountId,
        airline: &AccountId,
        amount: Amount,
    ) -> Result<Airline, LedgerError> {
        self.guard_mutation(caller)?;
        if amount == 0 {
            return Err(LedgerError::invalid_input("funding amount must be non-zero"));
        }
        let current = self
            .state
            .airlines
            .get(airline)
            .ok_or_else(|| LedgerError::AirlineNotRegistered {
                airline: airline.clone(),
            })?;
        let updated = current.funded(amount, self.config.funding_threshold)?;
        let became_operational = !current.operational && updated.operational;

        self.state.airlines.insert(airline.clone(), updated.clone());
        self.commit(vec![LedgerEvent::AirlineFunded {
            airline: airline.clone(),
            amount,
            total_funds: updated.funds,
            operational: updated.operational,
        }]);

        if became_operational {
            info!(airline = %airline, funds = updated.funds, "airline became operational");
        } else {
            debug!(airline = %airline, amount, funds = updated.funds, "airline funded");
        }
        Ok(updated)
    }
}
