use actix::{AsyncContext, Context, Handler, WrapFuture};
use agora_network_primitives::events::NetworkEvent;
use agora_network_primitives::messages::WireMessage;
use agora_primitives::address::NodeAddress;
use tracing::{debug, info, warn};

use crate::NodeManager;

impl Handler<NetworkEvent> for NodeManager {
    type Result = ();

    fn handle(&mut self, event: NetworkEvent, ctx: &mut Self::Context) -> Self::Result {
        match event {
            NetworkEvent::ListeningOn { address } => info!(%address, "Listening"),
            NetworkEvent::Connected { peer, connection } => {
                debug!(%peer, %connection, "Connected to peer");
            }
            NetworkEvent::Message {
                from,
                connection,
                message,
            } => {
                if message.is_handshake() {
                    self.authentication.do_send(NetworkEvent::Message {
                        from,
                        connection,
                        message,
                    });
                    return;
                }

                self.handle_store_message(ctx, from, message);
            }
            NetworkEvent::Disconnected { peer, connection } => {
                self.handle_disconnect(ctx, peer);

                debug!(%connection, "Connection closed");
            }
            NetworkEvent::Error { peer, reason } => {
                warn!(peer = ?peer, %reason, "Network error");
            }
            _ => {}
        }
    }
}

impl NodeManager {
    /// Applies a store mutation from an authenticated peer. The actor waits
    /// for the store so mutations reach it in arrival order.
    fn handle_store_message(
        &mut self,
        ctx: &mut Context<Self>,
        from: NodeAddress,
        message: WireMessage,
    ) {
        if !self.peers.is_authenticated(&from) {
            debug!(%from, kind = message.name(), "Dropping store message from unauthenticated peer");
            return;
        }

        let store = self.store.clone();

        let task = async move {
            match message {
                WireMessage::AddData { entry } => {
                    let _ignored = store.add(entry, Some(from)).await;
                }
                WireMessage::RemoveData { entry } => {
                    let _ignored = store.remove(entry, Some(from)).await;
                }
                WireMessage::RemoveMailboxData { entry } => {
                    let _ignored = store.remove_mailbox(entry, Some(from)).await;
                }
                WireMessage::RequestAuthentication(_)
                | WireMessage::Challenge(_)
                | WireMessage::GetPeers(_)
                | WireMessage::Peers(_) => {}
            }
        };

        ctx.wait(task.into_actor(self));
    }

    /// Drops the live-owner data of an authenticated peer that went away.
    /// Connections from peers that never authenticated own nothing here.
    fn handle_disconnect(&mut self, ctx: &mut Context<Self>, peer: NodeAddress) {
        if !self.peers.remove(&peer) {
            debug!(%peer, "Ignoring disconnect from unauthenticated peer");
            return;
        }

        info!(%peer, "Peer disconnected");

        let store = self.store.clone();

        let task = async move {
            let _removed = store.remove_live_owner_data(peer).await;
        };

        ctx.wait(task.into_actor(self));
    }
}
