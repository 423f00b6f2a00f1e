use actix::Message;
use tokio::sync::oneshot;

pub mod listen;
pub mod maintenance;
pub mod mutate;
pub mod publish;

use listen::AddListenerRequest;
use maintenance::{RemoveLiveOwnerDataRequest, SweepExpiredRequest};
use mutate::{AddEntryRequest, RemoveEntryRequest, RemoveMailboxEntryRequest};
use publish::{AcknowledgeMailboxRequest, PublishMailboxRequest, PublishRequest, UnpublishRequest};

/// Everything the store actor does, in the order it receives it.
#[derive(Debug, Message)]
#[rtype("()")]
pub enum StoreMessage {
    AddEntry {
        request: AddEntryRequest,
        outcome: oneshot::Sender<<AddEntryRequest as Message>::Result>,
    },
    RemoveEntry {
        request: RemoveEntryRequest,
        outcome: oneshot::Sender<<RemoveEntryRequest as Message>::Result>,
    },
    RemoveMailboxEntry {
        request: RemoveMailboxEntryRequest,
        outcome: oneshot::Sender<<RemoveMailboxEntryRequest as Message>::Result>,
    },
    Publish {
        request: PublishRequest,
        outcome: oneshot::Sender<<PublishRequest as Message>::Result>,
    },
    PublishMailbox {
        request: PublishMailboxRequest,
        outcome: oneshot::Sender<<PublishMailboxRequest as Message>::Result>,
    },
    Unpublish {
        request: UnpublishRequest,
        outcome: oneshot::Sender<<UnpublishRequest as Message>::Result>,
    },
    AcknowledgeMailbox {
        request: AcknowledgeMailboxRequest,
        outcome: oneshot::Sender<<AcknowledgeMailboxRequest as Message>::Result>,
    },
    SweepExpired {
        request: SweepExpiredRequest,
        outcome: oneshot::Sender<<SweepExpiredRequest as Message>::Result>,
    },
    RemoveLiveOwnerData {
        request: RemoveLiveOwnerDataRequest,
        outcome: oneshot::Sender<<RemoveLiveOwnerDataRequest as Message>::Result>,
    },
    AddListener {
        request: AddListenerRequest,
    },
}
