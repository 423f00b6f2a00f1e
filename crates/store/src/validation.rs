//! Checks every mutation passes before it touches the store.
//!
//! Each function is one step of the acceptance order: key binding, then
//! signature, then sequence number, then ownership of the stored slot.

use agora_crypto::CryptoProvider;
use agora_primitives::entry::{ContentHash, ProtectedEntry, StoreEntry};
use agora_primitives::identity::PublicKey;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum Rejection {
    #[error("entry is signed by {received}, but {expected} is entitled to it")]
    OwnerKeyMismatch {
        expected: PublicKey,
        received: PublicKey,
    },

    #[error("mailbox payloads travel in mailbox entries and nothing else does")]
    PayloadKindMismatch,

    #[error("entry ttl {entry}ms differs from payload ttl {payload}ms")]
    TtlMismatch { payload: u64, entry: u64 },

    #[error("signature does not verify against the owner key")]
    InvalidSignature,

    #[error("sequence number {received} is stale, ledger holds {stored}")]
    StaleSequenceNumber { stored: u32, received: u32 },

    #[error("slot is owned by {stored}, refusing takeover by {received}")]
    OwnerHijack {
        stored: PublicKey,
        received: PublicKey,
    },

    #[error("no entry stored under {0}")]
    NotFound(ContentHash),

    #[error("mailbox removal must be signed by its receiver")]
    ReceiverMismatch,
}

/// Add-side key binding: the entry owner must be the key the payload names
/// (the sender for mailbox data) and the entry shape must match the payload.
pub fn check_add_binding(entry: &StoreEntry) -> Result<(), Rejection> {
    let protected = entry.protected();

    if entry.is_mailbox() != protected.payload.is_mailbox() {
        return Err(Rejection::PayloadKindMismatch);
    }

    check_ttl(protected)?;

    check_owner(protected.payload.declared_owner(), &protected.owner_public_key)
}

/// Remove-side key binding. Authority over a stored mailbox entry belongs to
/// its receiver, over anything else to the payload's owner.
pub fn check_remove_binding(entry: &ProtectedEntry, stored: &StoreEntry) -> Result<(), Rejection> {
    let expected = match stored.receiver_public_key() {
        Some(receiver) => receiver,
        None => entry.payload.declared_owner(),
    };

    check_owner(expected, &entry.owner_public_key)
}

pub fn check_signature(
    crypto: &dyn CryptoProvider,
    entry: &ProtectedEntry,
) -> Result<(), Rejection> {
    let digest = crypto.hash(&entry.signable_bytes());

    if crypto.verify(&entry.owner_public_key, digest.as_bytes(), &entry.signature) {
        Ok(())
    } else {
        Err(Rejection::InvalidSignature)
    }
}

/// Whether an accepted add changes anything beyond the TTL clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequenceCheck {
    Advance,
    Republish,
}

/// Sequence rule for adds.
///
/// A present entry accepts an equal sequence number as a republish. A slot
/// that was vacated but is still remembered by the ledger only reopens with a
/// strictly greater one.
pub fn check_add_sequence(
    ledger: Option<u32>,
    present: bool,
    received: u32,
) -> Result<SequenceCheck, Rejection> {
    let Some(stored) = ledger else {
        return Ok(SequenceCheck::Advance);
    };

    match (present, received.cmp(&stored)) {
        (_, core::cmp::Ordering::Greater) => Ok(SequenceCheck::Advance),
        (true, core::cmp::Ordering::Equal) => Ok(SequenceCheck::Republish),
        _ => Err(Rejection::StaleSequenceNumber { stored, received }),
    }
}

pub fn check_remove_sequence(ledger: Option<u32>, received: u32) -> Result<(), Rejection> {
    match ledger {
        Some(stored) if received < stored => {
            Err(Rejection::StaleSequenceNumber { stored, received })
        }
        _ => Ok(()),
    }
}

/// Anti-hijack: whoever signs a mutation of an occupied slot must be its
/// current authority.
pub fn check_slot_owner(stored: &PublicKey, received: &PublicKey) -> Result<(), Rejection> {
    if stored == received {
        Ok(())
    } else {
        Err(Rejection::OwnerHijack {
            stored: *stored,
            received: *received,
        })
    }
}

fn check_owner(expected: &PublicKey, received: &PublicKey) -> Result<(), Rejection> {
    if expected == received {
        Ok(())
    } else {
        Err(Rejection::OwnerKeyMismatch {
            expected: *expected,
            received: *received,
        })
    }
}

fn check_ttl(entry: &ProtectedEntry) -> Result<(), Rejection> {
    let payload = entry.payload.ttl_millis();

    if payload == entry.ttl_millis {
        Ok(())
    } else {
        Err(Rejection::TtlMismatch {
            payload,
            entry: entry.ttl_millis,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_sequence_decision_table() {
        assert_eq!(check_add_sequence(None, false, 0), Ok(SequenceCheck::Advance));
        assert_eq!(check_add_sequence(None, true, 3), Ok(SequenceCheck::Advance));

        assert_eq!(check_add_sequence(Some(2), true, 3), Ok(SequenceCheck::Advance));
        assert_eq!(check_add_sequence(Some(2), true, 2), Ok(SequenceCheck::Republish));
        assert_eq!(
            check_add_sequence(Some(2), true, 1),
            Err(Rejection::StaleSequenceNumber {
                stored: 2,
                received: 1
            })
        );

        assert_eq!(check_add_sequence(Some(2), false, 3), Ok(SequenceCheck::Advance));
        assert_eq!(
            check_add_sequence(Some(2), false, 2),
            Err(Rejection::StaleSequenceNumber {
                stored: 2,
                received: 2
            })
        );
    }

    #[test]
    fn test_remove_sequence_allows_equal() {
        assert_eq!(check_remove_sequence(None, 0), Ok(()));
        assert_eq!(check_remove_sequence(Some(4), 4), Ok(()));
        assert_eq!(check_remove_sequence(Some(4), 5), Ok(()));
        assert!(check_remove_sequence(Some(4), 3).is_err());
    }
}
