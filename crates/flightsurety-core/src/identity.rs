//! Participant identities.
//!
//! Every party the ledger knows about (owner, controller, airlines,
//! passengers) is named by an [`AccountId`]. Identities are opaque strings
//! with a small set of validation rules so they can be safely used as map
//! keys, log fields and event payloads.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Maximum length for identity strings.
///
/// Bounded to keep event payloads and log lines small.
pub const MAX_ID_LENGTH: usize = 256;

/// Validates an identity string.
///
/// # Rules
///
/// - Must not be empty
/// - Must not exceed `MAX_ID_LENGTH` bytes
/// - Must not contain `/` or null bytes
///
/// # Errors
///
/// Returns `LedgerError::InvalidInput` if validation fails.
pub fn validate_id(id: &str, field_name: &str) -> Result<(), LedgerError> {
    if id.is_empty() {
        return Err(LedgerError::invalid_input(format!(
            "{field_name} cannot be empty"
        )));
    }
    if id.len() > MAX_ID_LENGTH {
        return Err(LedgerError::invalid_input(format!(
            "{field_name} exceeds maximum length of {MAX_ID_LENGTH} bytes"
        )));
    }
    if id.contains('/') {
        return Err(LedgerError::invalid_input(format!(
            "{field_name} contains invalid character '/'"
        )));
    }
    if id.contains('\0') {
        return Err(LedgerError::invalid_input(format!(
            "{field_name} contains null byte"
        )));
    }
    Ok(())
}

/// Identity of a ledger participant (address-equivalent).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    /// Creates a validated identity.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidInput` if `id` violates the rules of
    /// [`validate_id`].
    pub fn new(id: impl Into<String>) -> Result<Self, LedgerError> {
        let id = id.into();
        validate_id(&id, "account id")?;
        Ok(Self(id))
    }

    /// Returns the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AccountId {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for AccountId {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AccountId> for String {
    fn from(value: AccountId) -> Self {
        value.0
    }
}

impl AsRef<str> for AccountId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
