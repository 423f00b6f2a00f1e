use std::sync::Arc;

use agora_network_primitives::broadcast::Broadcaster;
use agora_network_primitives::messages::WireMessage;
use agora_network_primitives::transport::Transport;
use agora_primitives::address::NodeAddress;
use tokio::spawn;
use tracing::debug;

use crate::peers::PeerSet;

/// Sends store mutations to every authenticated peer. Sends run detached;
/// failures are only logged.
#[derive(Clone, Debug)]
pub struct PeerBroadcaster {
    transport: Arc<dyn Transport>,
    peers: PeerSet,
}

impl PeerBroadcaster {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, peers: PeerSet) -> Self {
        Self { transport, peers }
    }
}

impl Broadcaster for PeerBroadcaster {
    fn broadcast(&self, message: WireMessage, exclude: Option<&NodeAddress>) {
        let targets: Vec<_> = self
            .peers
            .authenticated()
            .into_iter()
            .filter(|peer| Some(peer) != exclude)
            .collect();

        debug!(kind = message.name(), peers = targets.len(), "Broadcasting");

        for peer in targets {
            let transport = Arc::clone(&self.transport);
            let message = message.clone();

            drop(spawn(async move {
                if let Err(err) = transport.send(&peer, message).await {
                    debug!(%peer, %err, "Failed to broadcast to peer");
                }
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use agora_network_primitives::events::NetworkEvent;
    use agora_network_primitives::messages::RequestAuthentication;

    use super::*;
    use crate::transport::MemoryNetwork;

    #[tokio::test]
    async fn test_broadcast_skips_origin_and_unauthenticated() {
        let network = MemoryNetwork::new();
        let me = NodeAddress::new("me", 1);
        let origin = NodeAddress::new("origin", 1);
        let other = NodeAddress::new("other", 1);
        let stranger = NodeAddress::new("stranger", 1);

        let (transport, _events) = network.join(me.clone());
        let (_origin, mut origin_events) = network.join(origin.clone());
        let (_other, mut other_events) = network.join(other.clone());
        let (_stranger, mut stranger_events) = network.join(stranger.clone());

        let peers = PeerSet::new(me.clone());
        peers.admit(origin.clone());
        peers.admit(other.clone());
        let _new = peers.learn([stranger]);

        let broadcaster = PeerBroadcaster::new(Arc::new(transport), peers);

        let message = WireMessage::RequestAuthentication(RequestAuthentication {
            address: me.clone(),
            nonce: 1,
        });
        broadcaster.broadcast(message.clone(), Some(&origin));

        match other_events.recv().await {
            Some(NetworkEvent::Message { from, message: received, .. }) => {
                assert_eq!(from, me);
                assert_eq!(received, message);
            }
            event => panic!("unexpected event: {event:?}"),
        }

        tokio::task::yield_now().await;

        assert!(origin_events.try_recv().is_err());
        assert!(stranger_events.try_recv().is_err());
    }
}
