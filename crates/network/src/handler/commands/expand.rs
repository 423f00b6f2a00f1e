use actix::{AsyncContext, Context, Handler, Message, Response};
use futures_util::future::join_all;
use tracing::{debug, info};

use crate::handler::commands::authenticate::Authenticate;
use crate::AuthenticationManager;

/// Authenticates to known-but-unauthenticated addresses until `max_peers`
/// peers are admitted. Resolves to the number of new peers.
#[derive(Message, Clone, Copy, Debug)]
#[rtype(usize)]
pub struct ExpandPeers {
    pub max_peers: usize,
}

impl Handler<ExpandPeers> for AuthenticationManager {
    type Result = Response<usize>;

    fn handle(&mut self, msg: ExpandPeers, ctx: &mut Context<Self>) -> Self::Result {
        let budget = msg
            .max_peers
            .saturating_sub(self.peers.authenticated().len());

        let candidates = self.peers.candidates(budget);

        if candidates.is_empty() {
            return Response::reply(0);
        }

        let manager = ctx.address();

        Response::fut(async move {
            let attempts = candidates.into_iter().map(|peer| {
                let manager = manager.clone();

                async move {
                    let outcome = manager
                        .send(Authenticate(peer.clone()))
                        .await
                        .expect("Mailbox not to be dropped");

                    if let Err(err) = &outcome {
                        debug!(%peer, %err, "Failed to expand to peer");
                    }

                    outcome.is_ok()
                }
            });

            let admitted = join_all(attempts)
                .await
                .into_iter()
                .filter(|admitted| *admitted)
                .count();

            info!(admitted, "Expanded peer set");

            admitted
        })
    }
}
