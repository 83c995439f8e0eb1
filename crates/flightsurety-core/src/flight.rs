//! Flight registry records.
//!
//! A flight instance is identified by its [`FlightKey`]: the owning airline,
//! the flight code and the scheduled timestamp. The key is used directly as
//! the registry's map key; [`FlightKey::digest`] additionally offers a
//! fixed-width content address for observers.
//!
//! # Status codes
//!
//! ```text
//!  0 UNKNOWN         (initial)
//! 10 ON_TIME
//! 20 LATE_AIRLINE    (triggers insurance crediting)
//! 30 LATE_WEATHER
//! 40 LATE_TECHNICAL
//! 50 LATE_OTHER
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::identity::AccountId;

/// Maximum length for flight codes.
pub const MAX_FLIGHT_CODE_LENGTH: usize = 32;

/// Maximum length for route endpoints.
pub const MAX_ROUTE_ENDPOINT_LENGTH: usize = 64;

/// Domain separator mixed into [`FlightKey::digest`].
const FLIGHT_KEY_DOMAIN: &[u8] = b"flightsurety.flight-key.v1";

fn validate_label(value: &str, field_name: &str, max: usize) -> Result<(), LedgerError> {
    if value.is_empty() {
        return Err(LedgerError::invalid_input(format!(
            "{field_name} cannot be empty"
        )));
    }
    if value.len() > max {
        return Err(LedgerError::invalid_input(format!(
            "{field_name} exceeds maximum length of {max} bytes"
        )));
    }
    if value.contains('\0') {
        return Err(LedgerError::invalid_input(format!(
            "{field_name} contains null byte"
        )));
    }
    Ok(())
}

/// Composite identity of a flight instance.
///
/// Deserialization goes through [`FlightKey::new`], so a decoded key carries
/// a valid flight code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "FlightKeyFields")]
pub struct FlightKey {
    airline: AccountId,
    flight_code: String,
    timestamp: u64,
}

/// Unvalidated wire form of [`FlightKey`].
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct FlightKeyFields {
    airline: AccountId,
    flight_code: String,
    timestamp: u64,
}

impl TryFrom<FlightKeyFields> for FlightKey {
    type Error = LedgerError;

    fn try_from(fields: FlightKeyFields) -> Result<Self, Self::Error> {
        Self::new(fields.airline, fields.flight_code, fields.timestamp)
    }
}

impl FlightKey {
    /// Creates a flight key.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidInput` if the flight code is empty, longer
    /// than `MAX_FLIGHT_CODE_LENGTH` bytes, or contains a null byte.
    pub fn new(
        airline: AccountId,
        flight_code: impl Into<String>,
        timestamp: u64,
    ) -> Result<Self, LedgerError> {
        let flight_code = flight_code.into();
        validate_label(&flight_code, "flight_code", MAX_FLIGHT_CODE_LENGTH)?;
        Ok(Self {
            airline,
            flight_code,
            timestamp,
        })
    }

    /// Returns the owning airline.
    #[must_use]
    pub const fn airline(&self) -> &AccountId {
        &self.airline
    }

    /// Returns the flight code.
    #[must_use]
    pub fn flight_code(&self) -> &str {
        &self.flight_code
    }

    /// Returns the scheduled timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Returns the BLAKE3 content address of this key.
    ///
    /// The hashed encoding is the domain separator followed by
    /// `u32-BE len || airline || u32-BE len || flight_code || u64-BE
    /// timestamp`. Length prefixes keep distinct triples from colliding on
    /// concatenation.
    #[must_use]
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(FLIGHT_KEY_DOMAIN);
        for part in [self.airline.as_str(), self.flight_code.as_str()] {
            // Both parts are bounded well below u32::MAX.
            let len = u32::try_from(part.len()).unwrap_or(u32::MAX);
            hasher.update(&len.to_be_bytes());
            hasher.update(part.as_bytes());
        }
        hasher.update(&self.timestamp.to_be_bytes());
        *hasher.finalize().as_bytes()
    }

    /// Returns [`digest`](Self::digest) as lowercase hex.
    #[must_use]
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest())
    }
}

impl fmt::Display for FlightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.airline, self.flight_code, self.timestamp)
    }
}

/// Reported status of a flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlightStatus {
    /// No report yet.
    #[default]
    Unknown,
    /// Departed on time.
    OnTime,
    /// Delayed for reasons attributable to the airline.
    LateAirline,
    /// Delayed by weather.
    LateWeather,
    /// Delayed by a technical issue.
    LateTechnical,
    /// Delayed for another reason.
    LateOther,
}

impl FlightStatus {
    /// Returns all statuses in code order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Unknown,
            Self::OnTime,
            Self::LateAirline,
            Self::LateWeather,
            Self::LateTechnical,
            Self::LateOther,
        ]
    }

    /// Returns the wire code for this status.
    #[must_use]
    pub const fn code(&self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::OnTime => 10,
            Self::LateAirline => 20,
            Self::LateWeather => 30,
            Self::LateTechnical => 40,
            Self::LateOther => 50,
        }
    }

    /// Parses a wire code.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidState` for codes outside the table.
    pub fn from_code(code: u8) -> Result<Self, LedgerError> {
        Self::all()
            .iter()
            .copied()
            .find(|status| status.code() == code)
            .ok_or_else(|| LedgerError::invalid_state(format!("unknown flight status code {code}")))
    }

    /// Returns `true` if passengers are owed a payout for this status.
    #[must_use]
    pub const fn is_airline_delay(&self) -> bool {
        matches!(self, Self::LateAirline)
    }

    /// Returns the canonical name of this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::OnTime => "ON_TIME",
            Self::LateAirline => "LATE_AIRLINE",
            Self::LateWeather => "LATE_WEATHER",
            Self::LateTechnical => "LATE_TECHNICAL",
            Self::LateOther => "LATE_OTHER",
        }
    }
}

impl fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Origin and destination of a flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RouteFields")]
pub struct Route {
    /// Departure endpoint.
    pub from: String,
    /// Arrival endpoint.
    pub to: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RouteFields {
    from: String,
    to: String,
}

impl TryFrom<RouteFields> for Route {
    type Error = LedgerError;

    fn try_from(fields: RouteFields) -> Result<Self, Self::Error> {
        Self::new(fields.from, fields.to)
    }
}

impl Route {
    /// Creates a route.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidInput` if either endpoint is empty, too
    /// long, or contains a null byte.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Result<Self, LedgerError> {
        let from = from.into();
        let to = to.into();
        validate_label(&from, "route.from", MAX_ROUTE_ENDPOINT_LENGTH)?;
        validate_label(&to, "route.to", MAX_ROUTE_ENDPOINT_LENGTH)?;
        Ok(Self { from, to })
    }
}

/// A registered flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Flight {
    /// Origin and destination.
    pub route: Route,
    /// Last reported status.
    pub status: FlightStatus,
    /// Timestamp of the last status report (0 until reported).
    pub updated_at: u64,
    /// Percentage applied to insured amounts on payout.
    pub payout_multiplier: u32,
    /// Insured passengers in purchase order.
    pub passengers: Vec<AccountId>,
}

impl Flight {
    pub(crate) const fn new(route: Route, payout_multiplier: u32) -> Self {
        Self {
            route,
            status: FlightStatus::Unknown,
            updated_at: 0,
            payout_multiplier,
            passengers: Vec::new(),
        }
    }
}
