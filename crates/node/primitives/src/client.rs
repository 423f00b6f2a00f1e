use std::sync::Arc;

use actix::{Message, Recipient};
use agora_primitives::address::NodeAddress;
use agora_primitives::entry::{
    ContentHash, MailboxPayload, Payload, ProtectedEntry, ProtectedMailboxEntry, StoreEntry,
};
use agora_primitives::identity::{KeyPair, PublicKey};
use agora_store::listener::StoreListener;
use agora_store::validation::Rejection;
use agora_store::{AddOutcome, StoreView};
use tokio::sync::oneshot;

use crate::messages::listen::AddListenerRequest;
use crate::messages::maintenance::{RemoveLiveOwnerDataRequest, SweepExpiredRequest};
use crate::messages::mutate::{AddEntryRequest, RemoveEntryRequest, RemoveMailboxEntryRequest};
use crate::messages::publish::{
    AcknowledgeMailboxRequest, PublishMailboxRequest, PublishRequest, UnpublishRequest,
};
use crate::messages::StoreMessage;

/// Handle to the store actor. Mutations are queued on the actor; reads go
/// straight to the shared entry map.
#[derive(Clone, Debug)]
pub struct StoreClient {
    store_manager: Recipient<StoreMessage>,
    view: StoreView,
}

impl StoreClient {
    #[must_use]
    pub const fn new(store_manager: Recipient<StoreMessage>, view: StoreView) -> Self {
        Self {
            store_manager,
            view,
        }
    }

    async fn request<M>(
        &self,
        message: impl FnOnce(oneshot::Sender<M::Result>) -> StoreMessage,
    ) -> M::Result
    where
        M: Message,
        M::Result: Send,
    {
        let (tx, rx) = oneshot::channel();

        self.store_manager
            .send(message(tx))
            .await
            .expect("Mailbox not to be dropped");

        rx.await.expect("Mailbox not to be dropped")
    }

    pub async fn add(
        &self,
        entry: StoreEntry,
        origin: Option<NodeAddress>,
    ) -> Result<AddOutcome, Rejection> {
        self.request::<AddEntryRequest>(|outcome| StoreMessage::AddEntry {
            request: AddEntryRequest { entry, origin },
            outcome,
        })
        .await
    }

    pub async fn remove(
        &self,
        entry: ProtectedEntry,
        origin: Option<NodeAddress>,
    ) -> Result<(), Rejection> {
        self.request::<RemoveEntryRequest>(|outcome| StoreMessage::RemoveEntry {
            request: RemoveEntryRequest { entry, origin },
            outcome,
        })
        .await
    }

    pub async fn remove_mailbox(
        &self,
        entry: ProtectedMailboxEntry,
        origin: Option<NodeAddress>,
    ) -> Result<(), Rejection> {
        self.request::<RemoveMailboxEntryRequest>(|outcome| StoreMessage::RemoveMailboxEntry {
            request: RemoveMailboxEntryRequest { entry, origin },
            outcome,
        })
        .await
    }

    pub async fn publish(
        &self,
        payload: Payload,
        keypair: KeyPair,
    ) -> Result<ContentHash, Rejection> {
        self.request::<PublishRequest>(|outcome| StoreMessage::Publish {
            request: PublishRequest { payload, keypair },
            outcome,
        })
        .await
    }

    pub async fn publish_mailbox(
        &self,
        payload: MailboxPayload,
        keypair: KeyPair,
        receiver_public_key: PublicKey,
    ) -> Result<ContentHash, Rejection> {
        self.request::<PublishMailboxRequest>(|outcome| StoreMessage::PublishMailbox {
            request: PublishMailboxRequest {
                payload,
                keypair,
                receiver_public_key,
            },
            outcome,
        })
        .await
    }

    pub async fn unpublish(
        &self,
        payload: Payload,
        keypair: KeyPair,
    ) -> Result<ContentHash, Rejection> {
        self.request::<UnpublishRequest>(|outcome| StoreMessage::Unpublish {
            request: UnpublishRequest { payload, keypair },
            outcome,
        })
        .await
    }

    pub async fn acknowledge_mailbox(
        &self,
        hash: ContentHash,
        keypair: KeyPair,
    ) -> Result<MailboxPayload, Rejection> {
        self.request::<AcknowledgeMailboxRequest>(|outcome| StoreMessage::AcknowledgeMailbox {
            request: AcknowledgeMailboxRequest { hash, keypair },
            outcome,
        })
        .await
    }

    pub async fn sweep_expired(&self) -> usize {
        self.request::<SweepExpiredRequest>(|outcome| StoreMessage::SweepExpired {
            request: SweepExpiredRequest,
            outcome,
        })
        .await
    }

    pub async fn remove_live_owner_data(&self, address: NodeAddress) -> usize {
        self.request::<RemoveLiveOwnerDataRequest>(|outcome| StoreMessage::RemoveLiveOwnerData {
            request: RemoveLiveOwnerDataRequest { address },
            outcome,
        })
        .await
    }

    pub async fn add_listener(&self, listener: Arc<dyn StoreListener>) {
        self.store_manager
            .send(StoreMessage::AddListener {
                request: AddListenerRequest { listener },
            })
            .await
            .expect("Mailbox not to be dropped");
    }

    #[must_use]
    pub fn get(&self, hash: &ContentHash) -> Option<StoreEntry> {
        self.view.get(hash)
    }

    #[must_use]
    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.view.contains(hash)
    }

    #[must_use]
    pub fn entries(&self) -> Vec<(ContentHash, StoreEntry)> {
        self.view.entries()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.view.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }

    #[must_use]
    pub const fn view(&self) -> &StoreView {
        &self.view
    }
}
