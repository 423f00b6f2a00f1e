//! Replicated protected-data store.
//!
//! Entries are content-addressed by the hash of their payload and guarded by
//! the owner's signature over (payload, sequence number). The store validates
//! every mutation, keeps the sequence number ledger that outlives removed
//! entries, fans accepted mutations out through a [`Broadcaster`] and reports
//! them to registered [`StoreListener`]s.
//!
//! The engine itself is synchronous; callers serialize access to it (the node
//! runs it inside a single actor). Readers on other threads go through
//! [`StoreView`].

#[cfg(test)]
#[path = "tests/store.rs"]
mod tests;

pub mod config;
pub mod ledger;
pub mod listener;
pub mod persist;
pub mod validation;

use std::sync::Arc;

use agora_crypto::CryptoProvider;
use agora_network_primitives::broadcast::Broadcaster;
use agora_network_primitives::messages::WireMessage;
use agora_primitives::address::NodeAddress;
use agora_primitives::clock::Clock;
use agora_primitives::entry::{
    signable_bytes, ContentHash, MailboxPayload, Payload, ProtectedEntry, ProtectedMailboxEntry,
    StoreEntry,
};
use agora_primitives::identity::{KeyPair, PublicKey};
use dashmap::DashMap;
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::ledger::SequenceNumberLedger;
use crate::listener::{ListenerRegistry, StoreListener};
use crate::persist::Persister;
use crate::validation::{
    check_add_binding, check_add_sequence, check_remove_binding, check_remove_sequence,
    check_signature, check_slot_owner, Rejection, SequenceCheck,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredEntry {
    pub entry: StoreEntry,
    /// Start of the entry's TTL window, refreshed by every accepted add.
    pub last_seen_at: u64,
}

impl StoredEntry {
    #[must_use]
    pub const fn expires_at(&self) -> u64 {
        self.last_seen_at.saturating_add(self.entry.ttl_millis())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    /// The slot was empty.
    Added,
    /// A higher sequence number replaced the stored entry.
    Updated,
    /// Same sequence number as stored; only the TTL clock moved.
    Refreshed,
}

#[derive(Debug)]
pub struct ProtectedDataStore {
    entries: Arc<DashMap<ContentHash, StoredEntry>>,
    ledger: SequenceNumberLedger,
    listeners: ListenerRegistry,
    broadcaster: Arc<dyn Broadcaster>,
    persister: Arc<dyn Persister>,
    crypto: Arc<dyn CryptoProvider>,
    clock: Arc<dyn Clock>,
    config: StoreConfig,
}

impl ProtectedDataStore {
    /// Creates the store, restoring whatever ledger `persister` holds.
    pub fn new(
        config: StoreConfig,
        crypto: Arc<dyn CryptoProvider>,
        clock: Arc<dyn Clock>,
        broadcaster: Arc<dyn Broadcaster>,
        persister: Arc<dyn Persister>,
    ) -> Self {
        let ledger = persister
            .load_persisted()
            .map(|snapshot| {
                SequenceNumberLedger::restore(
                    snapshot,
                    clock.now_millis(),
                    config.ledger_max_age_millis(),
                )
            })
            .unwrap_or_default();

        info!(records = ledger.len(), "Restored sequence number ledger");

        Self {
            entries: Arc::default(),
            ledger,
            listeners: ListenerRegistry::default(),
            broadcaster,
            persister,
            crypto,
            clock,
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }

    #[must_use]
    pub const fn ledger(&self) -> &SequenceNumberLedger {
        &self.ledger
    }

    pub fn add_listener(&mut self, listener: Arc<dyn StoreListener>) {
        self.listeners.register(listener);
    }

    #[must_use]
    pub fn content_hash(&self, payload: &Payload) -> ContentHash {
        self.crypto.hash(&payload.canonical_bytes())
    }

    /// Validates and applies an add, returning `false` on rejection.
    pub fn add(&mut self, entry: StoreEntry, origin: Option<&NodeAddress>) -> bool {
        match self.try_add(entry, origin) {
            Ok(outcome) => {
                debug!(?outcome, "Accepted add");
                true
            }
            Err(reason) => {
                debug!(%reason, "Rejected add");
                false
            }
        }
    }

    pub fn try_add(
        &mut self,
        entry: StoreEntry,
        origin: Option<&NodeAddress>,
    ) -> Result<AddOutcome, Rejection> {
        let hash = self.content_hash(entry.payload());

        check_add_binding(&entry)?;
        check_signature(&*self.crypto, entry.protected())?;

        let stored = self.stored(&hash);

        let ledger = self
            .ledger
            .sequence_number(&hash)
            .or_else(|| stored.as_ref().map(StoreEntry::sequence_number));

        let check = check_add_sequence(ledger, stored.is_some(), entry.sequence_number())?;

        if let Some(stored) = &stored {
            check_slot_owner(stored.owner_public_key(), entry.owner_public_key())?;

            if stored.receiver_public_key() != entry.receiver_public_key() {
                return Err(Rejection::ReceiverMismatch);
            }
        }

        let now = self.clock.now_millis();

        self.ledger.record(hash, entry.sequence_number(), now);
        self.persist();

        if check == SequenceCheck::Republish {
            if let Some(mut stored) = self.entries.get_mut(&hash) {
                stored.last_seen_at = now;
            }

            debug!(%hash, "Refreshed republished entry");

            return Ok(AddOutcome::Refreshed);
        }

        let _previous = self.entries.insert(
            hash,
            StoredEntry {
                entry: entry.clone(),
                last_seen_at: now,
            },
        );

        debug!(
            %hash,
            sequence_number = entry.sequence_number(),
            mailbox = entry.is_mailbox(),
            "Stored entry"
        );

        self.broadcaster
            .broadcast(WireMessage::AddData { entry: entry.clone() }, origin);

        self.listeners.notify_added(&hash, &entry);

        Ok(if stored.is_some() {
            AddOutcome::Updated
        } else {
            AddOutcome::Added
        })
    }

    /// Validates and applies a remove, returning `false` on rejection.
    pub fn remove(&mut self, entry: ProtectedEntry, origin: Option<&NodeAddress>) -> bool {
        match self.try_remove(entry, origin) {
            Ok(()) => true,
            Err(reason) => {
                debug!(%reason, "Rejected remove");
                false
            }
        }
    }

    pub fn try_remove(
        &mut self,
        entry: ProtectedEntry,
        origin: Option<&NodeAddress>,
    ) -> Result<(), Rejection> {
        let hash = self.content_hash(&entry.payload);

        let stored = self.stored(&hash).ok_or(Rejection::NotFound(hash))?;

        check_remove_binding(&entry, &stored)?;
        check_signature(&*self.crypto, &entry)?;
        check_remove_sequence(self.ledger.sequence_number(&hash), entry.sequence_number)?;
        check_slot_owner(authority(&stored), &entry.owner_public_key)?;

        let sequence_number = entry.sequence_number;

        self.commit_removal(
            hash,
            sequence_number,
            WireMessage::RemoveData { entry },
            origin,
        );

        Ok(())
    }

    /// Validates and applies a receiver's removal of a mailbox entry,
    /// returning `false` on rejection.
    pub fn remove_mailbox(
        &mut self,
        entry: ProtectedMailboxEntry,
        origin: Option<&NodeAddress>,
    ) -> bool {
        match self.try_remove_mailbox(entry, origin) {
            Ok(()) => true,
            Err(reason) => {
                debug!(%reason, "Rejected mailbox remove");
                false
            }
        }
    }

    pub fn try_remove_mailbox(
        &mut self,
        entry: ProtectedMailboxEntry,
        origin: Option<&NodeAddress>,
    ) -> Result<(), Rejection> {
        let hash = self.content_hash(&entry.entry.payload);

        let stored = self.stored(&hash).ok_or(Rejection::NotFound(hash))?;

        let Some(receiver) = stored.receiver_public_key() else {
            return Err(Rejection::PayloadKindMismatch);
        };

        if entry.receiver_public_key != entry.entry.owner_public_key
            || entry.receiver_public_key != *receiver
        {
            return Err(Rejection::ReceiverMismatch);
        }

        check_remove_binding(&entry.entry, &stored)?;
        check_signature(&*self.crypto, &entry.entry)?;
        check_remove_sequence(
            self.ledger.sequence_number(&hash),
            entry.entry.sequence_number,
        )?;
        check_slot_owner(authority(&stored), &entry.entry.owner_public_key)?;

        let sequence_number = entry.entry.sequence_number;

        self.commit_removal(
            hash,
            sequence_number,
            WireMessage::RemoveMailboxData { entry },
            origin,
        );

        Ok(())
    }

    /// Signs `payload` at the next sequence number its slot accepts.
    #[must_use]
    pub fn sign_and_wrap(&self, payload: Payload, keypair: &KeyPair) -> ProtectedEntry {
        let hash = self.content_hash(&payload);

        let sequence_number = self
            .ledger
            .sequence_number(&hash)
            .map_or(0, |sequence_number| sequence_number.saturating_add(1));

        let digest = self.crypto.hash(&signable_bytes(&payload, sequence_number));

        ProtectedEntry {
            ttl_millis: payload.ttl_millis(),
            owner_public_key: *keypair.public_key(),
            sequence_number,
            signature: self.crypto.sign(keypair.private_key(), digest.as_bytes()),
            payload,
        }
    }

    /// Mailbox flavour of [`Self::sign_and_wrap`].
    ///
    /// Senders pass their own keypair to publish; the receiver passes its
    /// keypair and its own public key to build the removal entry.
    #[must_use]
    pub fn sign_and_wrap_mailbox(
        &self,
        payload: MailboxPayload,
        keypair: &KeyPair,
        receiver_public_key: PublicKey,
    ) -> ProtectedMailboxEntry {
        ProtectedMailboxEntry {
            entry: self.sign_and_wrap(Payload::Mailbox(payload), keypair),
            receiver_public_key,
        }
    }

    /// Drops entries whose TTL has run out and, past the size threshold,
    /// ages out old ledger records. Expiry is computed identically by every
    /// peer, so nothing is broadcast. Returns how many entries expired.
    pub fn sweep_expired(&mut self) -> usize {
        let now = self.clock.now_millis();

        let expired: Vec<_> = self
            .entries
            .iter()
            .filter(|stored| stored.expires_at() < now)
            .map(|stored| *stored.key())
            .collect();

        let mut removed = 0_usize;

        for hash in expired {
            if let Some((hash, stored)) = self.entries.remove(&hash) {
                debug!(%hash, "Entry expired");

                self.listeners.notify_removed(&hash, &stored.entry);

                removed = removed.saturating_add(1);
            }
        }

        if self.ledger.len() > self.config.ledger_purge_threshold {
            let purged = self
                .ledger
                .purge_older_than(now, self.config.ledger_max_age_millis());

            if purged > 0 {
                info!(purged, remaining = self.ledger.len(), "Purged ledger records");

                self.persist();
            }
        }

        removed
    }

    /// Removes, locally and without touching the ledger, every entry whose
    /// validity is bound to the connection of `address`.
    pub fn remove_live_owner_data(&mut self, address: &NodeAddress) -> usize {
        let bound: Vec<_> = self
            .entries
            .iter()
            .filter(|stored| stored.entry.payload().live_owner() == Some(address))
            .map(|stored| *stored.key())
            .collect();

        let mut removed = 0_usize;

        for hash in bound {
            if let Some((hash, stored)) = self.entries.remove(&hash) {
                debug!(%hash, %address, "Removed data of disconnected live owner");

                self.listeners.notify_removed(&hash, &stored.entry);

                removed = removed.saturating_add(1);
            }
        }

        removed
    }

    #[must_use]
    pub fn get(&self, hash: &ContentHash) -> Option<StoreEntry> {
        self.stored(hash)
    }

    #[must_use]
    pub fn entries(&self) -> Vec<(ContentHash, StoreEntry)> {
        self.view().entries()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read-only handle that can be moved to other threads.
    #[must_use]
    pub fn view(&self) -> StoreView {
        StoreView {
            entries: Arc::clone(&self.entries),
        }
    }

    fn stored(&self, hash: &ContentHash) -> Option<StoreEntry> {
        self.entries.get(hash).map(|stored| stored.entry.clone())
    }

    fn commit_removal(
        &mut self,
        hash: ContentHash,
        sequence_number: u32,
        message: WireMessage,
        origin: Option<&NodeAddress>,
    ) {
        let now = self.clock.now_millis();

        let removed = self.entries.remove(&hash);

        self.ledger.record(hash, sequence_number, now);
        self.persist();

        debug!(%hash, sequence_number, "Removed entry");

        self.broadcaster.broadcast(message, origin);

        if let Some((hash, stored)) = removed {
            self.listeners.notify_removed(&hash, &stored.entry);
        }
    }

    fn persist(&self) {
        self.persister
            .queue_save(self.ledger.snapshot(), self.config.persist_delay);
    }
}

/// The key entitled to remove a stored entry.
fn authority(stored: &StoreEntry) -> &PublicKey {
    stored
        .receiver_public_key()
        .unwrap_or_else(|| stored.owner_public_key())
}

#[derive(Clone, Debug)]
pub struct StoreView {
    entries: Arc<DashMap<ContentHash, StoredEntry>>,
}

impl StoreView {
    #[must_use]
    pub fn get(&self, hash: &ContentHash) -> Option<StoreEntry> {
        self.entries.get(hash).map(|stored| stored.entry.clone())
    }

    #[must_use]
    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.entries.contains_key(hash)
    }

    #[must_use]
    pub fn entries(&self) -> Vec<(ContentHash, StoreEntry)> {
        self.entries
            .iter()
            .map(|stored| (*stored.key(), stored.entry.clone()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
