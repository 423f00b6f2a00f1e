//! Signed, sequenced, TTL-bound wrappers around replicated payloads.
//!
//! A [`Payload`] is the data every peer agrees on; its canonical bytes hash to
//! the [`ContentHash`] under which the store keeps it. The wrapping
//! [`ProtectedEntry`] adds who may mutate the slot (`owner_public_key`), at
//! which version (`sequence_number`) and the proof (`signature`).

use borsh::{BorshDeserialize, BorshSerialize};

use crate::address::NodeAddress;
use crate::hash::Hash;
use crate::identity::{PublicKey, Signature};

pub type ContentHash = Hash;

/// Ordinary protected data: offers, proposals, votes and the like.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct StoragePayload {
    /// Domain tag used by listeners to project the entry, e.g. `"offer"`.
    pub kind: String,
    pub owner_public_key: PublicKey,
    pub ttl_millis: u64,
    /// Set when the data is only valid while its publisher stays connected.
    pub live_owner: Option<NodeAddress>,
    pub data: Vec<u8>,
}

/// Store-and-forward message addressed to an (possibly offline) receiver.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct MailboxPayload {
    pub sender_public_key: PublicKey,
    pub sender_address: NodeAddress,
    pub ttl_millis: u64,
    pub sealed_message: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum Payload {
    Storage(StoragePayload),
    Mailbox(MailboxPayload),
}

impl Payload {
    #[must_use]
    pub const fn ttl_millis(&self) -> u64 {
        match self {
            Self::Storage(payload) => payload.ttl_millis,
            Self::Mailbox(payload) => payload.ttl_millis,
        }
    }

    /// The key the payload itself names as entitled to publish it: the owner
    /// for storage data, the sender for mailbox data.
    #[must_use]
    pub const fn declared_owner(&self) -> &PublicKey {
        match self {
            Self::Storage(payload) => &payload.owner_public_key,
            Self::Mailbox(payload) => &payload.sender_public_key,
        }
    }

    #[must_use]
    pub const fn live_owner(&self) -> Option<&NodeAddress> {
        match self {
            Self::Storage(payload) => payload.live_owner.as_ref(),
            Self::Mailbox(_) => None,
        }
    }

    #[must_use]
    pub const fn is_mailbox(&self) -> bool {
        matches!(self, Self::Mailbox(_))
    }

    /// Canonical encoding hashed into the [`ContentHash`].
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).expect("serializing into a Vec is infallible")
    }
}

impl From<StoragePayload> for Payload {
    fn from(payload: StoragePayload) -> Self {
        Self::Storage(payload)
    }
}

impl From<MailboxPayload> for Payload {
    fn from(payload: MailboxPayload) -> Self {
        Self::Mailbox(payload)
    }
}

/// Bytes whose digest the owner signs: the payload bound to one sequence
/// number, so a signature can never be replayed at another version.
#[must_use]
pub fn signable_bytes(payload: &Payload, sequence_number: u32) -> Vec<u8> {
    let mut bytes = payload.canonical_bytes();

    bytes.extend_from_slice(&sequence_number.to_le_bytes());

    bytes
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ProtectedEntry {
    pub payload: Payload,
    pub ttl_millis: u64,
    pub owner_public_key: PublicKey,
    pub sequence_number: u32,
    pub signature: Signature,
}

impl ProtectedEntry {
    #[must_use]
    pub fn signable_bytes(&self) -> Vec<u8> {
        signable_bytes(&self.payload, self.sequence_number)
    }
}

/// A [`ProtectedEntry`] carrying a mailbox payload and the fixed key of its
/// receiver. The sender signs the add, only the receiver may sign the remove.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ProtectedMailboxEntry {
    pub entry: ProtectedEntry,
    pub receiver_public_key: PublicKey,
}

/// What the store keeps per content hash.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum StoreEntry {
    Protected(ProtectedEntry),
    Mailbox(ProtectedMailboxEntry),
}

impl StoreEntry {
    #[must_use]
    pub const fn protected(&self) -> &ProtectedEntry {
        match self {
            Self::Protected(entry) => entry,
            Self::Mailbox(mailbox) => &mailbox.entry,
        }
    }

    #[must_use]
    pub const fn payload(&self) -> &Payload {
        &self.protected().payload
    }

    #[must_use]
    pub const fn owner_public_key(&self) -> &PublicKey {
        &self.protected().owner_public_key
    }

    #[must_use]
    pub const fn sequence_number(&self) -> u32 {
        self.protected().sequence_number
    }

    #[must_use]
    pub const fn ttl_millis(&self) -> u64 {
        self.protected().ttl_millis
    }

    #[must_use]
    pub const fn receiver_public_key(&self) -> Option<&PublicKey> {
        match self {
            Self::Protected(_) => None,
            Self::Mailbox(mailbox) => Some(&mailbox.receiver_public_key),
        }
    }

    #[must_use]
    pub const fn is_mailbox(&self) -> bool {
        matches!(self, Self::Mailbox(_))
    }
}

impl From<ProtectedEntry> for StoreEntry {
    fn from(entry: ProtectedEntry) -> Self {
        Self::Protected(entry)
    }
}

impl From<ProtectedMailboxEntry> for StoreEntry {
    fn from(entry: ProtectedMailboxEntry) -> Self {
        Self::Mailbox(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(data: &[u8]) -> Payload {
        Payload::Storage(StoragePayload {
            kind: "offer".to_owned(),
            owner_public_key: PublicKey::from([1; 32]),
            ttl_millis: 60_000,
            live_owner: None,
            data: data.to_vec(),
        })
    }

    #[test]
    fn test_signable_bytes_bind_sequence_number() {
        let payload = storage(b"buy 1 BTC");

        assert_ne!(signable_bytes(&payload, 0), signable_bytes(&payload, 1));
        assert_eq!(signable_bytes(&payload, 3), signable_bytes(&payload, 3));
    }

    #[test]
    fn test_canonical_bytes_track_payload_content() {
        assert_eq!(
            storage(b"a").canonical_bytes(),
            storage(b"a").canonical_bytes()
        );
        assert_ne!(
            storage(b"a").canonical_bytes(),
            storage(b"b").canonical_bytes()
        );
    }

    #[test]
    fn test_declared_owner_per_variant() {
        let sender = PublicKey::from([9; 32]);
        let mailbox = Payload::Mailbox(MailboxPayload {
            sender_public_key: sender,
            sender_address: NodeAddress::new("localhost", 9000),
            ttl_millis: 1_000,
            sealed_message: vec![1, 2, 3],
        });

        assert_eq!(*mailbox.declared_owner(), sender);
        assert!(mailbox.is_mailbox());
        assert_eq!(mailbox.live_owner(), None);

        assert_eq!(*storage(b"x").declared_owner(), PublicKey::from([1; 32]));
        assert!(!storage(b"x").is_mailbox());
    }
}
