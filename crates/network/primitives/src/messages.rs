use std::collections::BTreeSet;

use agora_primitives::address::NodeAddress;
use agora_primitives::entry::{ProtectedEntry, ProtectedMailboxEntry, StoreEntry};
use borsh::{BorshDeserialize, BorshSerialize};

pub type Nonce = u64;

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct RequestAuthentication {
    pub address: NodeAddress,
    pub nonce: Nonce,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Challenge {
    pub address: NodeAddress,
    pub requester_nonce: Nonce,
    pub challenger_nonce: Nonce,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct GetPeers {
    pub address: NodeAddress,
    pub challenger_nonce: Nonce,
    pub peer_addresses: BTreeSet<NodeAddress>,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Peers {
    pub address: NodeAddress,
    pub peer_addresses: BTreeSet<NodeAddress>,
}

/// Every message two nodes exchange.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum WireMessage {
    RequestAuthentication(RequestAuthentication),
    Challenge(Challenge),
    GetPeers(GetPeers),
    Peers(Peers),
    AddData { entry: StoreEntry },
    RemoveData { entry: ProtectedEntry },
    RemoveMailboxData { entry: ProtectedMailboxEntry },
}

impl WireMessage {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RequestAuthentication(_) => "RequestAuthentication",
            Self::Challenge(_) => "Challenge",
            Self::GetPeers(_) => "GetPeers",
            Self::Peers(_) => "Peers",
            Self::AddData { .. } => "AddData",
            Self::RemoveData { .. } => "RemoveData",
            Self::RemoveMailboxData { .. } => "RemoveMailboxData",
        }
    }

    #[must_use]
    pub const fn is_handshake(&self) -> bool {
        matches!(
            self,
            Self::RequestAuthentication(_) | Self::Challenge(_) | Self::GetPeers(_) | Self::Peers(_)
        )
    }
}

/// Transport frame: a wire message tagged with the sender's listening address.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Envelope {
    pub sender: NodeAddress,
    pub message: WireMessage,
}
