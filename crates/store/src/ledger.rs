//! Highest sequence number ever accepted per content hash.
//!
//! Records outlive the entries they describe: once a slot is vacated, the
//! ledger is what stops a replayed add at an old sequence number from
//! resurrecting it.

use std::collections::BTreeMap;

use agora_primitives::entry::ContentHash;
use borsh::{BorshDeserialize, BorshSerialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SequenceRecord {
    pub sequence_number: u32,
    pub last_seen_at: u64,
}

/// On-disk form of the ledger.
pub type LedgerSnapshot = BTreeMap<ContentHash, SequenceRecord>;

#[derive(Clone, Debug, Default)]
pub struct SequenceNumberLedger {
    records: LedgerSnapshot,
}

impl SequenceNumberLedger {
    /// Restores a persisted ledger, dropping records last seen before
    /// `now - max_age`.
    #[must_use]
    pub fn restore(snapshot: LedgerSnapshot, now: u64, max_age: u64) -> Self {
        let mut ledger = Self { records: snapshot };

        let _purged = ledger.purge_older_than(now, max_age);

        ledger
    }

    #[must_use]
    pub fn get(&self, hash: &ContentHash) -> Option<SequenceRecord> {
        self.records.get(hash).copied()
    }

    #[must_use]
    pub fn sequence_number(&self, hash: &ContentHash) -> Option<u32> {
        self.records.get(hash).map(|record| record.sequence_number)
    }

    pub fn record(&mut self, hash: ContentHash, sequence_number: u32, now: u64) {
        let _previous = self.records.insert(
            hash,
            SequenceRecord {
                sequence_number,
                last_seen_at: now,
            },
        );
    }

    /// Removes every record last seen before `now - max_age`, returning how
    /// many were dropped.
    pub fn purge_older_than(&mut self, now: u64, max_age: u64) -> usize {
        let horizon = now.saturating_sub(max_age);
        let before = self.records.len();

        self.records.retain(|_, record| record.last_seen_at >= horizon);

        before.saturating_sub(self.records.len())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.records.clone()
    }
}
