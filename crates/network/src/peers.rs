use std::collections::BTreeSet;
use std::sync::Arc;

use agora_primitives::address::NodeAddress;
use dashmap::DashSet;

/// Addresses this node knows about, and the subset that completed the
/// handshake with it. Clones share the same sets.
///
/// The node's own address is never recorded.
#[derive(Clone, Debug)]
pub struct PeerSet {
    local: NodeAddress,
    known: Arc<DashSet<NodeAddress>>,
    authenticated: Arc<DashSet<NodeAddress>>,
}

impl PeerSet {
    #[must_use]
    pub fn new(local: NodeAddress) -> Self {
        Self {
            local,
            known: Arc::default(),
            authenticated: Arc::default(),
        }
    }

    #[must_use]
    pub const fn local(&self) -> &NodeAddress {
        &self.local
    }

    /// Records addresses learned from a peer, returning how many were new.
    pub fn learn<I>(&self, addresses: I) -> usize
    where
        I: IntoIterator<Item = NodeAddress>,
    {
        addresses
            .into_iter()
            .filter(|address| *address != self.local)
            .filter(|address| self.known.insert(address.clone()))
            .count()
    }

    pub fn admit(&self, peer: NodeAddress) {
        if peer == self.local {
            return;
        }

        let _new = self.known.insert(peer.clone());
        let _new = self.authenticated.insert(peer);
    }

    /// Drops `peer` from the authenticated set. It stays known so it can be
    /// authenticated again later.
    pub fn remove(&self, peer: &NodeAddress) -> bool {
        self.authenticated.remove(peer).is_some()
    }

    #[must_use]
    pub fn is_authenticated(&self, peer: &NodeAddress) -> bool {
        self.authenticated.contains(peer)
    }

    #[must_use]
    pub fn known(&self) -> BTreeSet<NodeAddress> {
        self.known.iter().map(|address| address.clone()).collect()
    }

    #[must_use]
    pub fn authenticated(&self) -> BTreeSet<NodeAddress> {
        self.authenticated
            .iter()
            .map(|address| address.clone())
            .collect()
    }

    /// Known addresses not yet authenticated, at most `limit` of them.
    #[must_use]
    pub fn candidates(&self, limit: usize) -> Vec<NodeAddress> {
        self.known()
            .into_iter()
            .filter(|address| !self.is_authenticated(address))
            .take(limit)
            .collect()
    }
}
