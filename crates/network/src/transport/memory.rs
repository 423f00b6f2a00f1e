use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use agora_network_primitives::events::NetworkEvent;
use agora_network_primitives::messages::WireMessage;
use agora_network_primitives::transport::{Connection, ConnectionId, Transport, TransportError};
use agora_primitives::address::NodeAddress;
use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

const EVENT_CAPACITY: usize = 256;

/// In-process network: every joined node gets a [`MemoryTransport`] and the
/// receiving end of its event channel.
#[derive(Clone, Debug, Default)]
pub struct MemoryNetwork {
    nodes: Arc<DashMap<NodeAddress, mpsc::Sender<NetworkEvent>>>,
    next_id: Arc<AtomicU64>,
}

impl MemoryNetwork {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&self, address: NodeAddress) -> (MemoryTransport, mpsc::Receiver<NetworkEvent>) {
        let (sender, receiver) = mpsc::channel(EVENT_CAPACITY);

        let _previous = self.nodes.insert(address.clone(), sender);

        let transport = MemoryTransport {
            local: address,
            network: self.clone(),
        };

        (transport, receiver)
    }

    /// Takes `address` off the network and tells every remaining node it
    /// went away.
    pub async fn disconnect(&self, address: &NodeAddress) {
        let _removed = self.nodes.remove(address);

        let remaining: Vec<_> = self
            .nodes
            .iter()
            .map(|node| node.value().clone())
            .collect();

        for node in remaining {
            let _ignored = node
                .send(NetworkEvent::Disconnected {
                    peer: address.clone(),
                    connection: self.next_id(),
                })
                .await;
        }
    }

    #[must_use]
    pub fn contains(&self, address: &NodeAddress) -> bool {
        self.nodes.contains_key(address)
    }

    fn next_id(&self) -> ConnectionId {
        ConnectionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Clone, Debug)]
pub struct MemoryTransport {
    local: NodeAddress,
    network: MemoryNetwork,
}

#[async_trait]
impl Transport for MemoryTransport {
    fn local_address(&self) -> &NodeAddress {
        &self.local
    }

    async fn send(
        &self,
        address: &NodeAddress,
        message: WireMessage,
    ) -> Result<Connection, TransportError> {
        let node = self
            .network
            .nodes
            .get(address)
            .map(|node| node.value().clone())
            .ok_or_else(|| TransportError::Unreachable(address.clone()))?;

        let id = self.network.next_id();

        node.send(NetworkEvent::Message {
            from: self.local.clone(),
            connection: id,
            message,
        })
        .await
        .map_err(|_| TransportError::Closed(address.clone()))?;

        Ok(Connection {
            id,
            peer: address.clone(),
        })
    }

    async fn close(&self, connection: ConnectionId) {
        debug!(%connection, "Closing in-memory connection");
    }
}
