use std::collections::BTreeSet;

use actix::{Context, Handler, Message, Response};
use agora_network_primitives::messages::WireMessage;
use agora_primitives::address::NodeAddress;
use tokio::sync::oneshot;
use tracing::debug;

use crate::handshake::{HandshakeError, InitiatorHandshake};
use crate::{AuthenticationManager, OutboundSession, Role};

/// Runs the initiator side of the handshake against one peer. Resolves to
/// this node's known addresses once the peer is admitted.
#[derive(Message, Clone, Debug)]
#[rtype("Result<BTreeSet<NodeAddress>, HandshakeError>")]
pub struct Authenticate(pub NodeAddress);

impl From<NodeAddress> for Authenticate {
    fn from(peer: NodeAddress) -> Self {
        Self(peer)
    }
}

impl Handler<Authenticate> for AuthenticationManager {
    type Result = Response<Result<BTreeSet<NodeAddress>, HandshakeError>>;

    fn handle(&mut self, Authenticate(peer): Authenticate, ctx: &mut Context<Self>) -> Self::Result {
        if peer == *self.local() {
            return Response::reply(Err(HandshakeError::SelfConnection));
        }

        let mut handshake = InitiatorHandshake::new(self.local().clone(), peer.clone(), rand::random());

        let request = match handshake.request() {
            Ok(request) => request,
            Err(err) => return Response::reply(Err(err)),
        };

        let (outcome, receiver) = oneshot::channel();

        if let Some(previous) = self
            .outbound
            .insert(
                peer.clone(),
                OutboundSession {
                    handshake,
                    outcome,
                    request: None,
                },
            )
        {
            debug!(%peer, "Superseding pending handshake");

            let _ignored = previous.outcome.send(Err(HandshakeError::Aborted));
        }

        debug!(%peer, nonce = request.nonce, "Requesting authentication");

        self.dispatch(
            ctx,
            Role::Initiator,
            peer,
            WireMessage::RequestAuthentication(request),
            None,
        );

        Response::fut(async move { receiver.await.unwrap_or(Err(HandshakeError::Aborted)) })
    }
}
