use actix::Handler;
use agora_node_primitives::messages::publish::{
    AcknowledgeMailboxRequest, PublishMailboxRequest, PublishRequest, UnpublishRequest,
};
use agora_primitives::entry::{ContentHash, MailboxPayload, Payload, StoreEntry};
use agora_store::validation::Rejection;
use tracing::{debug, info};

use crate::store::StoreManager;

impl Handler<PublishRequest> for StoreManager {
    type Result = Result<ContentHash, Rejection>;

    fn handle(
        &mut self,
        PublishRequest { payload, keypair }: PublishRequest,
        _ctx: &mut Self::Context,
    ) -> Self::Result {
        let entry = self.store.sign_and_wrap(payload, &keypair);
        let hash = self.store.content_hash(&entry.payload);
        let sequence_number = entry.sequence_number;

        let outcome = self.store.try_add(entry.into(), None)?;

        info!(%hash, sequence_number, ?outcome, "Published entry");

        Ok(hash)
    }
}

impl Handler<PublishMailboxRequest> for StoreManager {
    type Result = Result<ContentHash, Rejection>;

    fn handle(
        &mut self,
        PublishMailboxRequest {
            payload,
            keypair,
            receiver_public_key,
        }: PublishMailboxRequest,
        _ctx: &mut Self::Context,
    ) -> Self::Result {
        let entry = self
            .store
            .sign_and_wrap_mailbox(payload, &keypair, receiver_public_key);
        let hash = self.store.content_hash(&entry.entry.payload);

        let _outcome = self.store.try_add(entry.into(), None)?;

        info!(%hash, receiver = %receiver_public_key, "Published mailbox message");

        Ok(hash)
    }
}

impl Handler<UnpublishRequest> for StoreManager {
    type Result = Result<ContentHash, Rejection>;

    fn handle(
        &mut self,
        UnpublishRequest { payload, keypair }: UnpublishRequest,
        _ctx: &mut Self::Context,
    ) -> Self::Result {
        let entry = self.store.sign_and_wrap(payload, &keypair);
        let hash = self.store.content_hash(&entry.payload);

        self.store.try_remove(entry, None)?;

        info!(%hash, "Unpublished entry");

        Ok(hash)
    }
}

impl Handler<AcknowledgeMailboxRequest> for StoreManager {
    type Result = Result<MailboxPayload, Rejection>;

    fn handle(
        &mut self,
        AcknowledgeMailboxRequest { hash, keypair }: AcknowledgeMailboxRequest,
        _ctx: &mut Self::Context,
    ) -> Self::Result {
        let stored = self.store.get(&hash).ok_or(Rejection::NotFound(hash))?;

        let StoreEntry::Mailbox(mailbox) = stored else {
            return Err(Rejection::PayloadKindMismatch);
        };

        let Payload::Mailbox(payload) = mailbox.entry.payload else {
            return Err(Rejection::PayloadKindMismatch);
        };

        let removal = self.store.sign_and_wrap_mailbox(
            payload.clone(),
            &keypair,
            *keypair.public_key(),
        );

        self.store.try_remove_mailbox(removal, None)?;

        debug!(%hash, sender = %payload.sender_address, "Acknowledged mailbox message");

        Ok(payload)
    }
}
