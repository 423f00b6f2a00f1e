//! A running Agora node: the store actor, the handshake actor and the
//! [`NodeManager`] that routes inbound network traffic between them.

use std::sync::Arc;

use actix::{Actor, Addr, AsyncContext, Context};
use agora_crypto::Ed25519Sha256;
use agora_network::peers::PeerSet;
use agora_network::{AuthenticationManager, Network};
use agora_network_primitives::events::NetworkEvent;
use agora_network_primitives::transport::Transport;
use agora_node_primitives::client::StoreClient;
use agora_primitives::clock::Clock;
use agora_store::config::StoreConfig;
use agora_store::persist::Persister;
use agora_store::ProtectedDataStore;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::store::StoreManager;

mod handlers;
pub mod listener;
pub mod run;
pub mod store;

pub use run::{start, NodeConfig};

#[derive(Debug)]
pub struct NodeManager {
    store: StoreClient,
    peers: PeerSet,
    authentication: Addr<AuthenticationManager>,
}

impl NodeManager {
    #[must_use]
    pub const fn new(
        store: StoreClient,
        peers: PeerSet,
        authentication: Addr<AuthenticationManager>,
    ) -> Self {
        Self {
            store,
            peers,
            authentication,
        }
    }
}

impl Actor for NodeManager {
    type Context = Context<Self>;
}

/// Handles to one node's actors.
#[derive(Debug)]
pub struct Node {
    pub store: StoreClient,
    pub network: Network,
    pub node_manager: Addr<NodeManager>,
}

/// Starts a node on `transport`, draining `events` into the node manager.
/// Must be called from within a running actix system.
pub fn spawn(
    transport: Arc<dyn Transport>,
    events: mpsc::Receiver<NetworkEvent>,
    config: StoreConfig,
    clock: Arc<dyn Clock>,
    persister: Arc<dyn Persister>,
) -> Node {
    let network = agora_network::start(transport);

    let store = ProtectedDataStore::new(
        config,
        Arc::new(Ed25519Sha256),
        clock,
        Arc::new(network.broadcaster.clone()),
        persister,
    );

    let store_manager = StoreManager::new(store);
    let view = store_manager.view();
    let store_manager = store_manager.start();

    let store = StoreClient::new(store_manager.recipient(), view);

    let node_manager = {
        let store = store.clone();
        let peers = network.peers.clone();
        let authentication = network.manager.clone();

        NodeManager::create(move |ctx| {
            ctx.add_message_stream(ReceiverStream::new(events));

            NodeManager::new(store, peers, authentication)
        })
    };

    Node {
        store,
        network,
        node_manager,
    }
}
