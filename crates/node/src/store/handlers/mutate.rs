use actix::Handler;
use agora_node_primitives::messages::mutate::{
    AddEntryRequest, RemoveEntryRequest, RemoveMailboxEntryRequest,
};
use agora_store::validation::Rejection;
use agora_store::AddOutcome;
use tracing::debug;

use crate::store::StoreManager;

impl Handler<AddEntryRequest> for StoreManager {
    type Result = Result<AddOutcome, Rejection>;

    fn handle(
        &mut self,
        AddEntryRequest { entry, origin }: AddEntryRequest,
        _ctx: &mut Self::Context,
    ) -> Self::Result {
        let result = self.store.try_add(entry, origin.as_ref());

        if let Err(reason) = &result {
            debug!(origin = ?origin, %reason, "Rejected add");
        }

        result
    }
}

impl Handler<RemoveEntryRequest> for StoreManager {
    type Result = Result<(), Rejection>;

    fn handle(
        &mut self,
        RemoveEntryRequest { entry, origin }: RemoveEntryRequest,
        _ctx: &mut Self::Context,
    ) -> Self::Result {
        let result = self.store.try_remove(entry, origin.as_ref());

        if let Err(reason) = &result {
            debug!(origin = ?origin, %reason, "Rejected remove");
        }

        result
    }
}

impl Handler<RemoveMailboxEntryRequest> for StoreManager {
    type Result = Result<(), Rejection>;

    fn handle(
        &mut self,
        RemoveMailboxEntryRequest { entry, origin }: RemoveMailboxEntryRequest,
        _ctx: &mut Self::Context,
    ) -> Self::Result {
        let result = self.store.try_remove_mailbox(entry, origin.as_ref());

        if let Err(reason) = &result {
            debug!(origin = ?origin, %reason, "Rejected mailbox remove");
        }

        result
    }
}
