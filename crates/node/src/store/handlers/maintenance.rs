use actix::Handler;
use agora_node_primitives::messages::maintenance::{
    RemoveLiveOwnerDataRequest, SweepExpiredRequest,
};
use tracing::info;

use crate::store::StoreManager;

impl Handler<SweepExpiredRequest> for StoreManager {
    type Result = usize;

    fn handle(&mut self, _msg: SweepExpiredRequest, _ctx: &mut Self::Context) -> Self::Result {
        self.store.sweep_expired()
    }
}

impl Handler<RemoveLiveOwnerDataRequest> for StoreManager {
    type Result = usize;

    fn handle(
        &mut self,
        RemoveLiveOwnerDataRequest { address }: RemoveLiveOwnerDataRequest,
        _ctx: &mut Self::Context,
    ) -> Self::Result {
        let removed = self.store.remove_live_owner_data(&address);

        if removed > 0 {
            info!(%address, removed, "Dropped data bound to disconnected peer");
        }

        removed
    }
}
