//! Actor owning the [`ProtectedDataStore`]. Its mailbox is the single queue
//! every mutation goes through, local or remote.

use actix::{Actor, AsyncContext, Context};
use agora_store::{ProtectedDataStore, StoreView};
use tracing::debug;

mod handlers;

#[derive(Debug)]
pub struct StoreManager {
    store: ProtectedDataStore,
}

impl StoreManager {
    #[must_use]
    pub const fn new(store: ProtectedDataStore) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn view(&self) -> StoreView {
        self.store.view()
    }
}

impl Actor for StoreManager {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let interval = self.store.config().sweep_interval;

        debug!(?interval, "Scheduling expiration sweep");

        let _handle = ctx.run_interval(interval, |act, _ctx| {
            let expired = act.store.sweep_expired();

            if expired > 0 {
                debug!(expired, remaining = act.store.len(), "Swept expired entries");
            }
        });
    }
}
