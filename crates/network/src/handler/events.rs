use actix::{Context, Handler};
use agora_network_primitives::events::NetworkEvent;
use agora_network_primitives::messages::{Challenge, GetPeers, Peers, RequestAuthentication, WireMessage};
use agora_network_primitives::transport::ConnectionId;
use tracing::{debug, info, warn};

use crate::handshake::{HandshakeError, ResponderHandshake};
use crate::{AuthenticationManager, Role};

impl Handler<NetworkEvent> for AuthenticationManager {
    type Result = ();

    fn handle(&mut self, event: NetworkEvent, ctx: &mut Context<Self>) -> Self::Result {
        let NetworkEvent::Message {
            from,
            connection,
            message,
        } = event
        else {
            return;
        };

        match message {
            WireMessage::RequestAuthentication(request) => self.on_request(ctx, connection, request),
            WireMessage::Challenge(challenge) => self.on_challenge(ctx, &challenge),
            WireMessage::GetPeers(get_peers) => self.on_get_peers(ctx, get_peers),
            WireMessage::Peers(peers) => self.on_peers(peers),
            WireMessage::AddData { .. }
            | WireMessage::RemoveData { .. }
            | WireMessage::RemoveMailboxData { .. } => {
                debug!(%from, kind = message.name(), "Ignoring non-handshake message");
            }
        }
    }
}

impl AuthenticationManager {
    fn on_request(
        &mut self,
        ctx: &mut Context<Self>,
        connection: ConnectionId,
        request: RequestAuthentication,
    ) {
        let initiator = request.address.clone();

        if initiator == *self.local() {
            debug!("Ignoring authentication request from own address");
            return;
        }

        let mut handshake = ResponderHandshake::new(self.local().clone(), rand::random());

        let challenge = match handshake.on_request(&request) {
            Ok(challenge) => challenge,
            Err(err) => {
                debug!(peer = %initiator, %err, "Ignoring authentication request");
                return;
            }
        };

        if self.inbound.insert(initiator.clone(), handshake).is_some() {
            debug!(peer = %initiator, "Restarting inbound handshake");
        }

        debug!(peer = %initiator, "Challenging peer");

        self.dispatch(
            ctx,
            Role::Responder,
            initiator,
            WireMessage::Challenge(challenge),
            Some(connection),
        );
    }

    fn on_challenge(&mut self, ctx: &mut Context<Self>, challenge: &Challenge) {
        let responder = challenge.address.clone();
        let known = self.peers.known();

        let Some(session) = self.outbound.get_mut(&responder) else {
            debug!(peer = %responder, "Challenge without pending handshake");
            return;
        };

        match session.handshake.on_challenge(challenge, known) {
            Ok(get_peers) => {
                let request = session.request.take();

                self.dispatch(
                    ctx,
                    Role::Initiator,
                    responder,
                    WireMessage::GetPeers(get_peers),
                    request,
                );
            }
            Err(err @ HandshakeError::UnexpectedMessage { .. }) => {
                debug!(peer = %responder, %err, "Ignoring challenge");
            }
            Err(err) => {
                warn!(peer = %responder, %err, "Peer failed our challenge");

                self.fail_outbound(&responder, err);
            }
        }
    }

    fn on_get_peers(&mut self, ctx: &mut Context<Self>, get_peers: GetPeers) {
        let initiator = get_peers.address.clone();

        let Some(mut handshake) = self.inbound.remove(&initiator) else {
            debug!(peer = %initiator, "GetPeers without pending handshake");
            return;
        };

        match handshake.on_get_peers(get_peers, &self.peers.known()) {
            Ok((learned, reply)) => {
                let new = self.peers.learn(learned);
                self.peers.admit(initiator.clone());

                info!(peer = %initiator, new, "Authenticated inbound peer");

                self.dispatch(
                    ctx,
                    Role::Responder,
                    initiator,
                    WireMessage::Peers(reply),
                    None,
                );
            }
            Err(err) => warn!(peer = %initiator, %err, "Inbound handshake failed"),
        }
    }

    fn on_peers(&mut self, peers: Peers) {
        let responder = peers.address.clone();

        let Some(mut session) = self.outbound.remove(&responder) else {
            debug!(peer = %responder, "Peers without pending handshake");
            return;
        };

        match session.handshake.on_peers(peers) {
            Ok(learned) => {
                let new = self.peers.learn(learned);
                self.peers.admit(responder.clone());

                info!(peer = %responder, new, "Authenticated to peer");

                let _ignored = session.outcome.send(Ok(self.peers.known()));
            }
            Err(err @ HandshakeError::UnexpectedMessage { .. }) => {
                debug!(peer = %responder, %err, "Ignoring peers");

                let _previous = self.outbound.insert(responder, session);
            }
            Err(err) => {
                let _ignored = session.outcome.send(Err(err));
            }
        }
    }
}
