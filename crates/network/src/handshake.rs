//! Nonce challenge/response that admits a peer and exchanges address sets.
//!
//! ```text
//! initiator                                responder
//!   | RequestAuthentication{addr, A}  ->       |
//!   |       <- Challenge{addr, A, B}           |  (fresh connection)
//!   | GetPeers{addr, B, known}        ->       |
//!   |       <- Peers{addr, merged}             |
//! ```
//!
//! Both machines are pure: they validate what they receive and produce what
//! to send, leaving I/O to the caller. Any validation failure is terminal.

use core::fmt;
use std::collections::BTreeSet;

use agora_network_primitives::messages::{
    Challenge, GetPeers, Nonce, Peers, RequestAuthentication,
};
use agora_network_primitives::transport::TransportError;
use agora_primitives::address::NodeAddress;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandshakeState {
    Idle,
    Requested,
    Challenged,
    Verified,
    Complete,
    Failed,
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HandshakeError {
    #[error("nonce mismatch: expected {expected}, received {received}")]
    NonceMismatch { expected: Nonce, received: Nonce },

    #[error("unexpected {message} while {state}")]
    UnexpectedMessage {
        message: &'static str,
        state: HandshakeState,
    },

    #[error("refusing to authenticate with own address")]
    SelfConnection,

    #[error("handshake was abandoned")]
    Aborted,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug)]
pub struct InitiatorHandshake {
    local: NodeAddress,
    peer: NodeAddress,
    nonce: Nonce,
    state: HandshakeState,
}

impl InitiatorHandshake {
    #[must_use]
    pub const fn new(local: NodeAddress, peer: NodeAddress, nonce: Nonce) -> Self {
        Self {
            local,
            peer,
            nonce,
            state: HandshakeState::Idle,
        }
    }

    #[must_use]
    pub const fn state(&self) -> HandshakeState {
        self.state
    }

    #[must_use]
    pub const fn peer(&self) -> &NodeAddress {
        &self.peer
    }

    pub fn request(&mut self) -> Result<RequestAuthentication, HandshakeError> {
        self.expect(HandshakeState::Idle, "request")?;

        self.state = HandshakeState::Requested;

        Ok(RequestAuthentication {
            address: self.local.clone(),
            nonce: self.nonce,
        })
    }

    /// Checks the responder echoed our nonce and answers its challenge with
    /// the addresses we know.
    pub fn on_challenge(
        &mut self,
        challenge: &Challenge,
        known: BTreeSet<NodeAddress>,
    ) -> Result<GetPeers, HandshakeError> {
        self.expect(HandshakeState::Requested, "Challenge")?;

        if challenge.requester_nonce != self.nonce {
            self.state = HandshakeState::Failed;

            return Err(HandshakeError::NonceMismatch {
                expected: self.nonce,
                received: challenge.requester_nonce,
            });
        }

        self.state = HandshakeState::Verified;

        Ok(GetPeers {
            address: self.local.clone(),
            challenger_nonce: challenge.challenger_nonce,
            peer_addresses: known,
        })
    }

    /// Completes the handshake, returning the addresses to merge: the
    /// responder's set plus the responder itself, minus our own address.
    pub fn on_peers(&mut self, peers: Peers) -> Result<BTreeSet<NodeAddress>, HandshakeError> {
        self.expect(HandshakeState::Verified, "Peers")?;

        self.state = HandshakeState::Complete;

        let mut learned = peers.peer_addresses;
        let _new = learned.insert(peers.address);
        let _removed = learned.remove(&self.local);

        Ok(learned)
    }

    fn expect(&self, state: HandshakeState, message: &'static str) -> Result<(), HandshakeError> {
        if self.state == state {
            return Ok(());
        }

        Err(HandshakeError::UnexpectedMessage {
            message,
            state: self.state,
        })
    }
}

#[derive(Debug)]
pub struct ResponderHandshake {
    local: NodeAddress,
    nonce: Nonce,
    initiator: Option<NodeAddress>,
    state: HandshakeState,
}

impl ResponderHandshake {
    #[must_use]
    pub const fn new(local: NodeAddress, nonce: Nonce) -> Self {
        Self {
            local,
            nonce,
            initiator: None,
            state: HandshakeState::Idle,
        }
    }

    #[must_use]
    pub const fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn on_request(
        &mut self,
        request: &RequestAuthentication,
    ) -> Result<Challenge, HandshakeError> {
        if self.state != HandshakeState::Idle {
            return Err(HandshakeError::UnexpectedMessage {
                message: "RequestAuthentication",
                state: self.state,
            });
        }

        self.initiator = Some(request.address.clone());
        self.state = HandshakeState::Challenged;

        Ok(Challenge {
            address: self.local.clone(),
            requester_nonce: request.nonce,
            challenger_nonce: self.nonce,
        })
    }

    /// Checks the initiator answered our challenge. On success returns the
    /// addresses to merge (the initiator's set plus the initiator) and the
    /// reply carrying the merged view of `known` and those addresses.
    pub fn on_get_peers(
        &mut self,
        get_peers: GetPeers,
        known: &BTreeSet<NodeAddress>,
    ) -> Result<(BTreeSet<NodeAddress>, Peers), HandshakeError> {
        if self.state != HandshakeState::Challenged {
            return Err(HandshakeError::UnexpectedMessage {
                message: "GetPeers",
                state: self.state,
            });
        }

        if get_peers.challenger_nonce != self.nonce {
            self.state = HandshakeState::Failed;

            return Err(HandshakeError::NonceMismatch {
                expected: self.nonce,
                received: get_peers.challenger_nonce,
            });
        }

        self.state = HandshakeState::Complete;

        let mut learned = get_peers.peer_addresses;
        let _new = learned.insert(get_peers.address);
        let _removed = learned.remove(&self.local);

        let mut merged = known.clone();
        merged.extend(learned.iter().cloned());
        let _removed = merged.remove(&self.local);

        let reply = Peers {
            address: self.local.clone(),
            peer_addresses: merged,
        };

        Ok((learned, reply))
    }

    #[must_use]
    pub const fn initiator(&self) -> Option<&NodeAddress> {
        self.initiator.as_ref()
    }
}
