//! Append-only, hash-chained event journal.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::LedgerEvent;

/// `prev_hash` of the first record.
pub const GENESIS_HASH: [u8; 32] = [0u8; 32];

/// Errors detected while verifying a journal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum JournalError {
    /// Sequence numbers are not contiguous from 1.
    #[error("sequence gap at position {position}: expected seq_id {expected}, found {actual}")]
    SequenceGap {
        /// Index of the offending record.
        position: usize,
        /// Expected sequence ID.
        expected: u64,
        /// Sequence ID found.
        actual: u64,
    },

    /// Hash chain verification failed.
    #[error("hash chain broken at seq_id={seq_id}: {details}")]
    HashChainBroken {
        /// The sequence ID where the chain broke.
        seq_id: u64,
        /// Details about the failure.
        details: String,
    },
}

/// A single committed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Sequence ID, starting at 1.
    pub seq_id: u64,
    /// The event.
    pub event: LedgerEvent,
    /// Hash of the previous record ([`GENESIS_HASH`] for the first).
    pub prev_hash: [u8; 32],
    /// BLAKE3 over `prev_hash || seq_id (BE) || canonical event bytes`.
    pub event_hash: [u8; 32],
}

impl EventRecord {
    fn compute_hash(seq_id: u64, prev_hash: &[u8; 32], event: &LedgerEvent) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(prev_hash);
        hasher.update(&seq_id.to_be_bytes());
        hasher.update(&event.canonical_bytes());
        *hasher.finalize().as_bytes()
    }

    /// Returns `event_hash` as lowercase hex.
    #[must_use]
    pub fn event_hash_hex(&self) -> String {
        hex::encode(self.event_hash)
    }
}

/// In-memory append-only event journal.
#[derive(Debug, Clone, Default)]
pub struct EventJournal {
    records: Vec<EventRecord>,
}

impl EventJournal {
    /// Creates an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no event has been committed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the hash of the latest record.
    #[must_use]
    pub fn head_hash(&self) -> [u8; 32] {
        self.records
            .last()
            .map_or(GENESIS_HASH, |record| record.event_hash)
    }

    /// Returns the sequence ID of the latest record (0 when empty).
    #[must_use]
    pub fn max_seq_id(&self) -> u64 {
        self.records.last().map_or(0, |record| record.seq_id)
    }

    /// Appends one event and returns its sequence ID.
    pub(crate) fn append(&mut self, event: LedgerEvent) -> u64 {
        let seq_id = self.max_seq_id() + 1;
        let prev_hash = self.head_hash();
        let event_hash = EventRecord::compute_hash(seq_id, &prev_hash, &event);
        self.records.push(EventRecord {
            seq_id,
            event,
            prev_hash,
            event_hash,
        });
        seq_id
    }

    /// Returns all records in commit order.
    #[must_use]
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Returns up to `limit` records with `seq_id > cursor`.
    #[must_use]
    pub fn read_from(&self, cursor: u64, limit: usize) -> &[EventRecord] {
        // seq_id n lives at index n - 1.
        let start = usize::try_from(cursor)
            .unwrap_or(usize::MAX)
            .min(self.records.len());
        let end = start.saturating_add(limit).min(self.records.len());
        &self.records[start..end]
    }

    /// Iterates the events without their chain metadata.
    pub fn events(&self) -> impl Iterator<Item = &LedgerEvent> {
        self.records.iter().map(|record| &record.event)
    }

    /// Verifies sequence contiguity and the hash chain.
    ///
    /// # Errors
    ///
    /// Returns the first [`JournalError`] found.
    pub fn verify_chain(&self) -> Result<(), JournalError> {
        verify_records(&self.records)
    }
}

/// Verifies a slice of records that starts at the journal's genesis.
///
/// # Errors
///
/// Returns the first [`JournalError`] found.
pub fn verify_records(records: &[EventRecord]) -> Result<(), JournalError> {
    let mut prev_hash = GENESIS_HASH;
    for (position, record) in records.iter().enumerate() {
        let expected = position as u64 + 1;
        if record.seq_id != expected {
            return Err(JournalError::SequenceGap {
                position,
                expected,
                actual: record.seq_id,
            });
        }
        if record.prev_hash != prev_hash {
            return Err(JournalError::HashChainBroken {
                seq_id: record.seq_id,
                details: "prev_hash does not match preceding record".to_string(),
            });
        }
        let recomputed = EventRecord::compute_hash(record.seq_id, &record.prev_hash, &record.event);
        if recomputed != record.event_hash {
            return Err(JournalError::HashChainBroken {
                seq_id: record.seq_id,
                details: "event_hash does not match content".to_string(),
            });
        }
        prev_hash = record.event_hash;
    }
    Ok(())
}
