use std::collections::BTreeSet;

use actix::Addr;
use agora_primitives::address::NodeAddress;

use crate::handler::commands::authenticate::Authenticate;
use crate::handler::commands::bootstrap::Bootstrap;
use crate::handler::commands::expand::ExpandPeers;
use crate::handshake::HandshakeError;
use crate::peers::PeerSet;
use crate::AuthenticationManager;

#[derive(Clone, Debug)]
pub struct AuthenticationClient {
    manager: Addr<AuthenticationManager>,
    peers: PeerSet,
}

impl AuthenticationClient {
    #[must_use]
    pub const fn new(manager: Addr<AuthenticationManager>, peers: PeerSet) -> Self {
        Self { manager, peers }
    }

    pub async fn authenticate(
        &self,
        peer: NodeAddress,
    ) -> Result<BTreeSet<NodeAddress>, HandshakeError> {
        self.manager
            .send(Authenticate(peer))
            .await
            .expect("Mailbox not to be dropped")
    }

    pub async fn bootstrap(
        &self,
        seeds: Vec<NodeAddress>,
    ) -> Result<BTreeSet<NodeAddress>, HandshakeError> {
        self.manager
            .send(Bootstrap { seeds })
            .await
            .expect("Mailbox not to be dropped")
    }

    pub async fn expand_peers(&self, max_peers: usize) -> usize {
        self.manager
            .send(ExpandPeers { max_peers })
            .await
            .expect("Mailbox not to be dropped")
    }

    #[must_use]
    pub const fn peers(&self) -> &PeerSet {
        &self.peers
    }
}
