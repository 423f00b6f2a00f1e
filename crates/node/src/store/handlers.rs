use actix::Handler;
use agora_node_primitives::messages::StoreMessage;
use agora_utils_actix::forward_handler;
use tracing::debug;

use crate::store::StoreManager;

mod maintenance;
mod mutate;
mod publish;

impl Handler<StoreMessage> for StoreManager {
    type Result = ();

    fn handle(&mut self, msg: StoreMessage, ctx: &mut Self::Context) -> Self::Result {
        match msg {
            StoreMessage::AddEntry { request, outcome } => {
                forward_handler(self, ctx, request, outcome);
            }
            StoreMessage::RemoveEntry { request, outcome } => {
                forward_handler(self, ctx, request, outcome);
            }
            StoreMessage::RemoveMailboxEntry { request, outcome } => {
                forward_handler(self, ctx, request, outcome);
            }
            StoreMessage::Publish { request, outcome } => {
                forward_handler(self, ctx, request, outcome);
            }
            StoreMessage::PublishMailbox { request, outcome } => {
                forward_handler(self, ctx, request, outcome);
            }
            StoreMessage::Unpublish { request, outcome } => {
                forward_handler(self, ctx, request, outcome);
            }
            StoreMessage::AcknowledgeMailbox { request, outcome } => {
                forward_handler(self, ctx, request, outcome);
            }
            StoreMessage::SweepExpired { request, outcome } => {
                forward_handler(self, ctx, request, outcome);
            }
            StoreMessage::RemoveLiveOwnerData { request, outcome } => {
                forward_handler(self, ctx, request, outcome);
            }
            StoreMessage::AddListener { request } => {
                self.store.add_listener(request.listener);

                debug!("Registered store listener");
            }
        }
    }
}
