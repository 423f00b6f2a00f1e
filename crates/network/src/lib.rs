use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use actix::{Actor, ActorFutureExt, Addr, AsyncContext, Context, WrapFuture};
use agora_network_primitives::events::NetworkEvent;
use agora_network_primitives::messages::WireMessage;
use agora_network_primitives::transport::{ConnectionId, Transport};
use agora_primitives::address::NodeAddress;
use eyre::{Result as EyreResult, WrapErr};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::broadcast::PeerBroadcaster;
use crate::client::AuthenticationClient;
use crate::config::NetworkConfig;
use crate::handshake::{HandshakeError, InitiatorHandshake, ResponderHandshake};
use crate::peers::PeerSet;
use crate::transport::TcpTransport;

pub mod broadcast;
pub mod client;
pub mod config;
mod handler;
pub mod handshake;
pub mod peers;
pub mod transport;

pub use handler::commands::authenticate::Authenticate;
pub use handler::commands::bootstrap::Bootstrap;
pub use handler::commands::expand::ExpandPeers;

const EVENT_CAPACITY: usize = 256;

type HandshakeOutcome = Result<BTreeSet<NodeAddress>, HandshakeError>;

#[derive(Debug)]
struct OutboundSession {
    handshake: InitiatorHandshake,
    outcome: oneshot::Sender<HandshakeOutcome>,
    /// Connection the request went out on. The responder drops it, so the
    /// rest of the handshake goes over a fresh one.
    request: Option<ConnectionId>,
}

#[derive(Clone, Copy, Debug)]
enum Role {
    Initiator,
    Responder,
}

/// Runs both sides of the peer handshake.
///
/// Outbound sessions are the handshakes this node started and resolve the
/// caller's [`Authenticate`] request; inbound sessions answer peers
/// authenticating to us. Handshake traffic reaches the actor as
/// [`NetworkEvent::Message`]s.
#[derive(Debug)]
pub struct AuthenticationManager {
    transport: Arc<dyn Transport>,
    peers: PeerSet,
    outbound: HashMap<NodeAddress, OutboundSession>,
    inbound: HashMap<NodeAddress, ResponderHandshake>,
}

impl AuthenticationManager {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, peers: PeerSet) -> Self {
        Self {
            transport,
            peers,
            outbound: HashMap::new(),
            inbound: HashMap::new(),
        }
    }

    fn local(&self) -> &NodeAddress {
        self.peers.local()
    }

    /// Sends a handshake message without blocking the actor. A failed send
    /// ends the session it belongs to; `close` is closed first.
    fn dispatch(
        &self,
        ctx: &mut Context<Self>,
        role: Role,
        peer: NodeAddress,
        message: WireMessage,
        close: Option<ConnectionId>,
    ) {
        let transport = Arc::clone(&self.transport);
        let target = peer.clone();
        let is_request = matches!(message, WireMessage::RequestAuthentication(_));

        let task = async move {
            if let Some(connection) = close {
                transport.close(connection).await;
            }

            transport.send(&target, message).await
        };

        let _handle = ctx.spawn(task.into_actor(self).map(move |result, act, _ctx| {
            let err = match result {
                Ok(connection) => {
                    if is_request {
                        if let Some(session) = act.outbound.get_mut(&peer) {
                            session.request = Some(connection.id);
                        }
                    }
                    return;
                }
                Err(err) => err,
            };

            match role {
                Role::Initiator => act.fail_outbound(&peer, err.into()),
                Role::Responder => {
                    warn!(%peer, %err, "Failed to answer handshake");

                    let _ignored = act.inbound.remove(&peer);
                }
            }
        }));
    }

    fn fail_outbound(&mut self, peer: &NodeAddress, err: HandshakeError) {
        if let Some(session) = self.outbound.remove(peer) {
            debug!(%peer, %err, "Outbound handshake failed");

            let _ignored = session.outcome.send(Err(err));
        }
    }
}

impl Actor for AuthenticationManager {
    type Context = Context<Self>;
}

/// Everything a node needs from the network layer, wired to one transport.
#[derive(Debug)]
pub struct Network {
    pub client: AuthenticationClient,
    pub manager: Addr<AuthenticationManager>,
    pub broadcaster: PeerBroadcaster,
    pub peers: PeerSet,
}

/// Starts the authentication actor over `transport`. Must be called from
/// within a running actix system.
pub fn start(transport: Arc<dyn Transport>) -> Network {
    let peers = PeerSet::new(transport.local_address().clone());

    let manager =
        AuthenticationManager::new(Arc::clone(&transport), peers.clone()).start();

    Network {
        client: AuthenticationClient::new(manager.clone(), peers.clone()),
        manager,
        broadcaster: PeerBroadcaster::new(transport, peers.clone()),
        peers,
    }
}

/// Binds the TCP transport described by `config`.
pub async fn bind(
    config: &NetworkConfig,
) -> EyreResult<(TcpTransport, mpsc::Receiver<NetworkEvent>)> {
    let (event_sender, event_receiver) = mpsc::channel(EVENT_CAPACITY);

    let transport = TcpTransport::bind(config.listen, config.advertised(), event_sender)
        .await
        .wrap_err_with(|| format!("failed to listen on {}", config.listen))?;

    Ok((transport, event_receiver))
}
