use agora_primitives::entry::{ContentHash, Payload, StoreEntry};
use agora_store::listener::StoreListener;
use tracing::info;

/// Logs every committed mutation, tagged with the payload's domain kind.
#[derive(Clone, Copy, Debug, Default)]
pub struct EntryLogger;

fn kind(entry: &StoreEntry) -> &str {
    match entry.payload() {
        Payload::Storage(payload) => payload.kind.as_str(),
        Payload::Mailbox(_) => "mailbox",
    }
}

impl StoreListener for EntryLogger {
    fn on_added(&self, hash: &ContentHash, entry: &StoreEntry) {
        info!(
            %hash,
            kind = kind(entry),
            owner = %entry.owner_public_key(),
            sequence_number = entry.sequence_number(),
            "Entry added"
        );
    }

    fn on_removed(&self, hash: &ContentHash, entry: &StoreEntry) {
        info!(%hash, kind = kind(entry), "Entry removed");
    }
}
