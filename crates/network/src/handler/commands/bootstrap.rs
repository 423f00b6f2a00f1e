use std::collections::BTreeSet;

use actix::{AsyncContext, Context, Handler, Message, Response};
use agora_primitives::address::NodeAddress;
use rand::Rng;
use tracing::{info, warn};

use crate::handler::commands::authenticate::Authenticate;
use crate::handshake::HandshakeError;
use crate::AuthenticationManager;

/// Joins the network through one of `seeds`, tried in random order.
///
/// An unreachable seed is dropped and the next one tried; any other
/// handshake failure ends the attempt. Running out of seeds is not an error,
/// it yields an empty address set.
#[derive(Message, Clone, Debug)]
#[rtype("Result<BTreeSet<NodeAddress>, HandshakeError>")]
pub struct Bootstrap {
    pub seeds: Vec<NodeAddress>,
}

impl Handler<Bootstrap> for AuthenticationManager {
    type Result = Response<Result<BTreeSet<NodeAddress>, HandshakeError>>;

    fn handle(&mut self, msg: Bootstrap, ctx: &mut Context<Self>) -> Self::Result {
        let local = self.local().clone();

        let mut seeds: Vec<_> = msg.seeds.into_iter().filter(|seed| *seed != local).collect();
        seeds.sort();
        seeds.dedup();

        let manager = ctx.address();

        Response::fut(async move {
            while !seeds.is_empty() {
                let index = rand::thread_rng().gen_range(0..seeds.len());
                let seed = seeds.swap_remove(index);

                let outcome = manager
                    .send(Authenticate(seed.clone()))
                    .await
                    .expect("Mailbox not to be dropped");

                match outcome {
                    Ok(known) => {
                        info!(%seed, peers = known.len(), "Bootstrapped");

                        return Ok(known);
                    }
                    Err(HandshakeError::Transport(err)) => {
                        warn!(%seed, %err, remaining = seeds.len(), "Seed node unreachable");
                    }
                    Err(err) => return Err(err),
                }
            }

            warn!("No seed node reachable, starting without peers");

            Ok(BTreeSet::new())
        })
    }
}
