use core::fmt;
use std::sync::Arc;

use actix::Message;
use agora_store::listener::StoreListener;

pub struct AddListenerRequest {
    pub listener: Arc<dyn StoreListener>,
}

impl fmt::Debug for AddListenerRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddListenerRequest").finish_non_exhaustive()
    }
}

impl Message for AddListenerRequest {
    type Result = ();
}
