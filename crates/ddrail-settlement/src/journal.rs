//! Hash-chained audit journal of engine state transitions.
//!
//! ```text
//! genesis = SHA-256(tag)
//! digest[n] = SHA-256(digest[n-1] || n || JSON(event[n]))
//! ```
//!
//! Rewriting or dropping any entry changes every later digest, which
//! [`Journal::verify_chain`] detects.

use chrono::Utc;
use ddrail_types::constants::JOURNAL_GENESIS_TAG;
use ddrail_types::{JournalEntry, LedgerEvent, RailError, Result};
use sha2::{Digest, Sha256};

/// Append-only journal.
#[derive(Debug, Clone)]
pub struct Journal {
    entries: Vec<JournalEntry>,
    head: [u8; 32],
}

impl Journal {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            head: genesis(),
        }
    }

    /// Append `event` and return the sealed entry.
    ///
    /// # Errors
    /// Returns `Serialization` if the event cannot be encoded.
    pub fn append(&mut self, event: LedgerEvent) -> Result<&JournalEntry> {
        let sequence = self.entries.len() as u64;
        let digest = link(&self.head, sequence, &event)?;
        tracing::debug!(sequence, event = event.label(), digest = %hex::encode(digest), "journal append");
        self.entries.push(JournalEntry {
            sequence,
            event,
            recorded_at: Utc::now(),
            digest,
        });
        self.head = digest;
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// Recompute every digest from genesis.
    ///
    /// # Errors
    /// Returns `Internal` naming the first entry whose sequence or digest
    /// does not match.
    pub fn verify_chain(&self) -> Result<()> {
        let mut prev = genesis();
        for (index, entry) in self.entries.iter().enumerate() {
            let sequence = index as u64;
            if entry.sequence != sequence {
                return Err(RailError::Internal(format!(
                    "journal entry {index} carries sequence {}",
                    entry.sequence
                )));
            }
            let expected = link(&prev, sequence, &entry.event)?;
            if expected != entry.digest {
                return Err(RailError::Internal(format!(
                    "journal chain broken at entry {index}"
                )));
            }
            prev = expected;
        }
        if prev != self.head {
            return Err(RailError::Internal("journal head does not match last entry".into()));
        }
        Ok(())
    }

    #[must_use]
    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    #[must_use]
    pub fn last(&self) -> Option<&JournalEntry> {
        self.entries.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Digest of the latest entry (genesis digest when empty), hex encoded.
    #[must_use]
    pub fn head_hex(&self) -> String {
        hex::encode(self.head)
    }
}

impl Default for Journal {
    fn default() -> Self {
        Self::new()
    }
}

fn genesis() -> [u8; 32] {
    Sha256::digest(JOURNAL_GENESIS_TAG).into()
}

fn link(prev: &[u8; 32], sequence: u64, event: &LedgerEvent) -> Result<[u8; 32]> {
    let body = serde_json::to_vec(event)?;
    let mut hasher = Sha256::new();
    hasher.update(prev);
    hasher.update(sequence.to_le_bytes());
    hasher.update(&body);
    Ok(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use ddrail_types::Identity;

    use super::*;

    fn deposit(amount: u64) -> LedgerEvent {
        LedgerEvent::Deposited {
            user: Identity::from_bytes([1u8; 32]),
            amount,
        }
    }

    #[test]
    fn empty_journal_verifies() {
        let journal = Journal::new();
        assert!(journal.is_empty());
        journal.verify_chain().unwrap();
    }

    #[test]
    fn append_chains_digests() {
        let mut journal = Journal::new();
        let first = journal.append(deposit(1)).unwrap().digest;
        let second = journal.append(deposit(1)).unwrap().digest;
        assert_ne!(first, second);
        assert_eq!(journal.len(), 2);
        assert_eq!(journal.last().unwrap().sequence, 1);
        assert_eq!(journal.head_hex(), hex::encode(second));
        journal.verify_chain().unwrap();
    }

    #[test]
    fn identical_histories_have_identical_heads() {
        let mut a = Journal::new();
        let mut b = Journal::new();
        for amount in [5, 7, 9] {
            a.append(deposit(amount)).unwrap();
            b.append(deposit(amount)).unwrap();
        }
        assert_eq!(a.head_hex(), b.head_hex());
    }

    #[test]
    fn tampered_event_is_detected() {
        let mut journal = Journal::new();
        journal.append(deposit(1)).unwrap();
        journal.append(deposit(2)).unwrap();
        journal.entries[0].event = deposit(1_000);
        let err = journal.verify_chain().unwrap_err();
        assert!(err.to_string().contains("entry 0"));
    }

    #[test]
    fn dropped_entry_is_detected() {
        let mut journal = Journal::new();
        journal.append(deposit(1)).unwrap();
        journal.append(deposit(2)).unwrap();
        journal.entries.remove(0);
        assert!(journal.verify_chain().is_err());
    }
}
