//! Controller error types.

use flightsurety_core::config::ConfigError;
use flightsurety_core::error::{ErrorKind, LedgerError};
use thiserror::Error;

/// Errors returned by [`Controller`](crate::Controller) operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ControllerError {
    /// The ledger core rejected the operation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The controller configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ControllerError {
    /// Returns the ledger error classification, if this wraps a ledger
    /// error.
    #[must_use]
    pub const fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Ledger(err) => Some(err.kind()),
            Self::Config(_) => None,
        }
    }

    /// Returns the wrapped ledger error, if any.
    #[must_use]
    pub const fn as_ledger(&self) -> Option<&LedgerError> {
        match self {
            Self::Ledger(err) => Some(err),
            Self::Config(_) => None,
        }
    }
}
