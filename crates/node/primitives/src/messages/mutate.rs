use actix::Message;
use agora_primitives::address::NodeAddress;
use agora_primitives::entry::{ProtectedEntry, ProtectedMailboxEntry, StoreEntry};
use agora_store::validation::Rejection;
use agora_store::AddOutcome;

/// An already signed entry, either built locally or received from `origin`.
#[derive(Clone, Debug)]
pub struct AddEntryRequest {
    pub entry: StoreEntry,
    pub origin: Option<NodeAddress>,
}

impl Message for AddEntryRequest {
    type Result = Result<AddOutcome, Rejection>;
}

#[derive(Clone, Debug)]
pub struct RemoveEntryRequest {
    pub entry: ProtectedEntry,
    pub origin: Option<NodeAddress>,
}

impl Message for RemoveEntryRequest {
    type Result = Result<(), Rejection>;
}

#[derive(Clone, Debug)]
pub struct RemoveMailboxEntryRequest {
    pub entry: ProtectedMailboxEntry,
    pub origin: Option<NodeAddress>,
}

impl Message for RemoveMailboxEntryRequest {
    type Result = Result<(), Rejection>;
}
