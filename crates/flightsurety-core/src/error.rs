//! Error types for ledger operations.
//!
//! Every precondition violation surfaces a distinct variant; a failed
//! operation never leaves partial state behind.

use std::fmt;

use thiserror::Error;

use crate::amount::Amount;
use crate::flight::FlightKey;
use crate::identity::AccountId;
use crate::transfer::TransferError;

/// Privileged role required by an entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The immutable ledger owner.
    Owner,
    /// The single authorized controller.
    Controller,
    /// A registered, funded airline.
    OperationalAirline,
}

impl Role {
    /// Returns the role name used in error messages and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Controller => "controller",
            Self::OperationalAirline => "operational airline",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LedgerError {
    /// The caller does not hold the role the entry point requires.
    #[error("unauthorized: {caller} is not the {required}")]
    Unauthorized {
        /// The rejected caller.
        caller: AccountId,
        /// The role the entry point requires.
        required: Role,
    },

    /// The global operational switch is off.
    #[error("ledger is not operational")]
    NotOperational,

    /// The subject airline has not reached the funding threshold.
    #[error("airline {airline} is not operational")]
    AirlineNotOperational {
        /// The unfunded airline.
        airline: AccountId,
    },

    /// The subject airline is not registered.
    #[error("airline {airline} is not registered")]
    AirlineNotRegistered {
        /// The unknown airline.
        airline: AccountId,
    },

    /// The airline is already registered.
    #[error("airline {airline} is already registered")]
    AlreadyRegistered {
        /// The registered airline.
        airline: AccountId,
    },

    /// The voter has already voted for this candidate.
    #[error("airline {voter} already voted for {candidate}")]
    DuplicateVote {
        /// The candidate airline.
        candidate: AccountId,
        /// The repeated voter.
        voter: AccountId,
    },

    /// A flight with the same composite key is already registered.
    #[error("flight {key} is already registered")]
    DuplicateFlight {
        /// The colliding key.
        key: FlightKey,
    },

    /// No flight is registered under the key.
    #[error("flight {key} not found")]
    FlightNotFound {
        /// The missing key.
        key: FlightKey,
    },

    /// The purchase exceeds the maximum insurable amount.
    #[error("insurance amount {amount} exceeds cap {cap}")]
    ExceedsCap {
        /// The requested amount.
        amount: Amount,
        /// The configured cap.
        cap: Amount,
    },

    /// The passenger already holds a policy on this flight.
    #[error("passenger {passenger} is already insured on flight {key}")]
    AlreadyInsured {
        /// The insured passenger.
        passenger: AccountId,
        /// The flight.
        key: FlightKey,
    },

    /// The passenger has no credit to withdraw.
    #[error("no funds available for passenger {passenger} on flight {key}")]
    NoFundsAvailable {
        /// The passenger.
        passenger: AccountId,
        /// The flight.
        key: FlightKey,
    },

    /// No payout is pending for this policy.
    #[error("no pending payout for passenger {passenger} on flight {key}")]
    PayoutNotPending {
        /// The passenger.
        passenger: AccountId,
        /// The flight.
        key: FlightKey,
    },

    /// The value transfer for a payout failed; the credit was restored.
    #[error("transfer of {amount} to {passenger} failed: {source}")]
    TransferFailed {
        /// The payee.
        passenger: AccountId,
        /// The amount that was not transferred.
        amount: Amount,
        /// The underlying transfer failure.
        #[source]
        source: TransferError,
    },

    /// The operation is not valid in the current state.
    #[error("invalid state: {reason}")]
    InvalidState {
        /// Why the state does not permit the operation.
        reason: String,
    },

    /// An argument failed validation.
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// Why the input is invalid.
        reason: String,
    },

    /// Checked arithmetic on an amount overflowed.
    #[error("amount overflow")]
    AmountOverflow,
}

/// Fieldless classification of [`LedgerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Wrong caller identity.
    Unauthorized,
    /// Global switch off, or subject airline not funded.
    NotOperational,
    /// Subject airline unknown.
    NotRegistered,
    /// Airline already registered.
    AlreadyRegistered,
    /// Repeated vote.
    DuplicateVote,
    /// Flight key collision.
    DuplicateFlight,
    /// Flight key absent.
    FlightNotFound,
    /// Purchase above the cap.
    ExceedsCap,
    /// Repeated purchase.
    AlreadyInsured,
    /// Nothing to withdraw.
    NoFundsAvailable,
    /// Transfer seam failure.
    TransferFailed,
    /// Operation invalid in the current state.
    InvalidState,
    /// Argument validation failure.
    InvalidInput,
    /// Arithmetic overflow.
    Overflow,
}

impl LedgerError {
    /// Creates a new invalid state error.
    #[must_use]
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }

    /// Creates a new invalid input error.
    #[must_use]
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Creates a new unauthorized error.
    #[must_use]
    pub fn unauthorized(caller: &AccountId, required: Role) -> Self {
        Self::Unauthorized {
            caller: caller.clone(),
            required,
        }
    }

    /// Returns the classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::NotOperational | Self::AirlineNotOperational { .. } => ErrorKind::NotOperational,
            Self::AirlineNotRegistered { .. } => ErrorKind::NotRegistered,
            Self::AlreadyRegistered { .. } => ErrorKind::AlreadyRegistered,
            Self::DuplicateVote { .. } => ErrorKind::DuplicateVote,
            Self::DuplicateFlight { .. } => ErrorKind::DuplicateFlight,
            Self::FlightNotFound { .. } => ErrorKind::FlightNotFound,
            Self::ExceedsCap { .. } => ErrorKind::ExceedsCap,
            Self::AlreadyInsured { .. } => ErrorKind::AlreadyInsured,
            Self::NoFundsAvailable { .. } => ErrorKind::NoFundsAvailable,
            Self::TransferFailed { .. } => ErrorKind::TransferFailed,
            Self::PayoutNotPending { .. } | Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::AmountOverflow => ErrorKind::Overflow,
        }
    }
}
