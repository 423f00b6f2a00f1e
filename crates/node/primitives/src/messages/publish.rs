//! Local mutations: the store signs on the caller's behalf at the next
//! sequence number the slot accepts, then applies the entry like any other.

use actix::Message;
use agora_primitives::entry::{ContentHash, MailboxPayload, Payload};
use agora_primitives::identity::{KeyPair, PublicKey};
use agora_store::validation::Rejection;

#[derive(Clone, Debug)]
pub struct PublishRequest {
    pub payload: Payload,
    pub keypair: KeyPair,
}

impl Message for PublishRequest {
    type Result = Result<ContentHash, Rejection>;
}

#[derive(Clone, Debug)]
pub struct PublishMailboxRequest {
    pub payload: MailboxPayload,
    pub keypair: KeyPair,
    pub receiver_public_key: PublicKey,
}

impl Message for PublishMailboxRequest {
    type Result = Result<ContentHash, Rejection>;
}

/// Removes a previously published payload. Only its owner can.
#[derive(Clone, Debug)]
pub struct UnpublishRequest {
    pub payload: Payload,
    pub keypair: KeyPair,
}

impl Message for UnpublishRequest {
    type Result = Result<ContentHash, Rejection>;
}

/// Removes a mailbox entry addressed to `keypair`'s owner, handing back the
/// payload that was removed.
#[derive(Clone, Copy, Debug)]
pub struct AcknowledgeMailboxRequest {
    pub hash: ContentHash,
    pub keypair: KeyPair,
}

impl Message for AcknowledgeMailboxRequest {
    type Result = Result<MailboxPayload, Rejection>;
}
