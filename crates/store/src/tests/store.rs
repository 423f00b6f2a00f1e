use core::time::Duration;
use std::sync::{Arc, Mutex};

use agora_crypto::{open, seal, Ed25519Sha256};
use agora_primitives::clock::ManualClock;
use agora_primitives::entry::StoragePayload;
use agora_primitives::identity::Signature;
use rand::thread_rng;

use super::*;
use crate::ledger::{LedgerSnapshot, SequenceRecord};
use crate::persist::MemoryPersister;

const TTL: u64 = 60_000;
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Default)]
struct RecordingBroadcaster {
    sent: Mutex<Vec<(WireMessage, Option<NodeAddress>)>>,
}

impl RecordingBroadcaster {
    fn sent(&self) -> Vec<(WireMessage, Option<NodeAddress>)> {
        self.sent.lock().unwrap().clone()
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn broadcast(&self, message: WireMessage, exclude: Option<&NodeAddress>) {
        self.sent.lock().unwrap().push((message, exclude.cloned()));
    }
}

#[derive(Debug, Default)]
struct RecordingListener {
    added: Mutex<Vec<ContentHash>>,
    removed: Mutex<Vec<ContentHash>>,
}

impl RecordingListener {
    fn added(&self) -> Vec<ContentHash> {
        self.added.lock().unwrap().clone()
    }

    fn removed(&self) -> Vec<ContentHash> {
        self.removed.lock().unwrap().clone()
    }
}

impl StoreListener for RecordingListener {
    fn on_added(&self, hash: &ContentHash, _entry: &StoreEntry) {
        self.added.lock().unwrap().push(*hash);
    }

    fn on_removed(&self, hash: &ContentHash, _entry: &StoreEntry) {
        self.removed.lock().unwrap().push(*hash);
    }
}

struct Harness {
    store: ProtectedDataStore,
    clock: ManualClock,
    broadcaster: Arc<RecordingBroadcaster>,
    listener: Arc<RecordingListener>,
    persister: MemoryPersister,
}

fn harness_with(config: StoreConfig, persister: MemoryPersister) -> Harness {
    let clock = ManualClock::new(1_000_000);
    let broadcaster = Arc::new(RecordingBroadcaster::default());
    let listener = Arc::new(RecordingListener::default());

    let mut store = ProtectedDataStore::new(
        config,
        Arc::new(Ed25519Sha256),
        Arc::new(clock.clone()),
        Arc::clone(&broadcaster) as Arc<dyn Broadcaster>,
        Arc::new(persister.clone()),
    );

    store.add_listener(Arc::clone(&listener) as Arc<dyn StoreListener>);

    Harness {
        store,
        clock,
        broadcaster,
        listener,
        persister,
    }
}

fn harness() -> Harness {
    harness_with(StoreConfig::default(), MemoryPersister::default())
}

fn offer(owner: &KeyPair, data: &[u8]) -> Payload {
    Payload::Storage(StoragePayload {
        kind: "offer".to_owned(),
        owner_public_key: *owner.public_key(),
        ttl_millis: TTL,
        live_owner: None,
        data: data.to_vec(),
    })
}

fn mailbox(sender: &KeyPair, receiver: &PublicKey, message: &[u8]) -> MailboxPayload {
    MailboxPayload {
        sender_public_key: *sender.public_key(),
        sender_address: NodeAddress::new("10.0.0.1", 9000),
        ttl_millis: TTL,
        sealed_message: seal(sender.private_key(), receiver, message).unwrap(),
    }
}

#[test]
fn test_add_remove_readd_scenario() {
    let mut h = harness();
    let mut rng = thread_rng();
    let owner = KeyPair::random(&mut rng);
    let stranger = KeyPair::random(&mut rng);

    let payload = offer(&owner, b"sell 1 BTC @ 60k");
    let hash = h.store.content_hash(&payload);
    let entry = h.store.sign_and_wrap(payload.clone(), &owner);
    assert_eq!(entry.sequence_number, 0);

    assert!(h.store.add(entry.clone().into(), None));
    assert!(h.store.add(entry.clone().into(), None));
    assert_eq!(h.broadcaster.sent().len(), 1, "republish must not rebroadcast");

    let forged = h.store.sign_and_wrap(payload.clone(), &stranger);
    assert!(!h.store.remove(forged, None));
    assert!(h.store.get(&hash).is_some());

    assert!(h.store.remove(entry.clone(), None));
    assert!(h.store.get(&hash).is_none());

    assert_eq!(
        h.store.try_add(entry.into(), None),
        Err(Rejection::StaleSequenceNumber {
            stored: 0,
            received: 0
        })
    );

    let readd = h.store.sign_and_wrap(payload, &owner);
    assert_eq!(readd.sequence_number, 1);
    assert_eq!(h.store.try_add(readd.into(), None), Ok(AddOutcome::Added));
}

#[test]
fn test_republish_refreshes_ttl_silently() {
    let mut h = harness();
    let owner = KeyPair::random(&mut thread_rng());

    let entry = h.store.sign_and_wrap(offer(&owner, b"bid"), &owner);

    assert_eq!(h.store.try_add(entry.clone().into(), None), Ok(AddOutcome::Added));

    h.clock.advance(Duration::from_millis(TTL - 1_000));

    assert_eq!(h.store.try_add(entry.into(), None), Ok(AddOutcome::Refreshed));
    assert_eq!(h.listener.added().len(), 1);
    assert_eq!(h.broadcaster.sent().len(), 1);

    h.clock.advance(Duration::from_millis(2_000));

    assert_eq!(h.store.sweep_expired(), 0);
    assert_eq!(h.store.len(), 1);
}

#[test]
fn test_sequence_numbers_only_move_forward() {
    let mut h = harness();
    let owner = KeyPair::random(&mut thread_rng());
    let payload = offer(&owner, b"proposal #7");

    let first = h.store.sign_and_wrap(payload.clone(), &owner);
    assert!(h.store.add(first.clone().into(), None));

    let second = h.store.sign_and_wrap(payload, &owner);
    assert_eq!(second.sequence_number, 1);
    assert_eq!(h.store.try_add(second.into(), None), Ok(AddOutcome::Updated));

    assert_eq!(
        h.store.try_add(first.into(), None),
        Err(Rejection::StaleSequenceNumber {
            stored: 1,
            received: 0
        })
    );
    assert_eq!(h.listener.added().len(), 2);
}

#[test]
fn test_tampered_entries_are_rejected() {
    let mut h = harness();
    let owner = KeyPair::random(&mut thread_rng());

    let mut entry = h.store.sign_and_wrap(offer(&owner, b"vote yes"), &owner);
    entry.payload = offer(&owner, b"vote no");
    assert_eq!(
        h.store.try_add(entry.into(), None),
        Err(Rejection::InvalidSignature)
    );

    let mut entry = h.store.sign_and_wrap(offer(&owner, b"vote yes"), &owner);
    entry.sequence_number = 5;
    assert_eq!(
        h.store.try_add(entry.into(), None),
        Err(Rejection::InvalidSignature)
    );

    let mut entry = h.store.sign_and_wrap(offer(&owner, b"vote yes"), &owner);
    entry.signature = Signature::from([7; 64]);
    assert_eq!(
        h.store.try_add(entry.into(), None),
        Err(Rejection::InvalidSignature)
    );

    assert!(h.store.is_empty());
    assert!(h.broadcaster.sent().is_empty());
}

#[test]
fn test_foreign_key_cannot_take_over_a_slot() {
    let mut h = harness();
    let mut rng = thread_rng();
    let owner = KeyPair::random(&mut rng);
    let attacker = KeyPair::random(&mut rng);
    let payload = offer(&owner, b"sell 2 BTC");

    let entry = h.store.sign_and_wrap(payload.clone(), &owner);
    assert!(h.store.add(entry.into(), None));

    let mut takeover = h.store.sign_and_wrap(payload, &attacker);
    takeover.sequence_number = 10;
    let digest = Ed25519Sha256.hash(&takeover.signable_bytes());
    takeover.signature = Ed25519Sha256.sign(attacker.private_key(), digest.as_bytes());

    assert_eq!(
        h.store.try_add(takeover.into(), None),
        Err(Rejection::OwnerKeyMismatch {
            expected: *owner.public_key(),
            received: *attacker.public_key(),
        })
    );
    assert_eq!(h.store.entries()[0].1.owner_public_key(), owner.public_key());
}

#[test]
fn test_validation_order() {
    let mut h = harness();
    let mut rng = thread_rng();
    let owner = KeyPair::random(&mut rng);
    let other = KeyPair::random(&mut rng);
    let payload = offer(&owner, b"order");

    let accepted = h.store.sign_and_wrap(payload.clone(), &owner);
    let bumped = h.store.sign_and_wrap(payload.clone(), &owner);
    assert!(h.store.add(accepted.into(), None));
    let newer = h.store.sign_and_wrap(payload.clone(), &owner);
    assert!(h.store.add(newer.into(), None));

    // Wrong key, bad signature and stale sequence: key binding wins.
    let mut entry = bumped.clone();
    entry.owner_public_key = *other.public_key();
    entry.signature = Signature::from([1; 64]);
    assert!(matches!(
        h.store.try_add(entry.into(), None),
        Err(Rejection::OwnerKeyMismatch { .. })
    ));

    // Bad signature and stale sequence: signature wins.
    let mut entry = bumped.clone();
    entry.signature = Signature::from([1; 64]);
    assert_eq!(
        h.store.try_add(entry.into(), None),
        Err(Rejection::InvalidSignature)
    );

    assert!(matches!(
        h.store.try_add(bumped.into(), None),
        Err(Rejection::StaleSequenceNumber { .. })
    ));
}

#[test]
fn test_entry_shape_must_match_payload() {
    let mut h = harness();
    let mut rng = thread_rng();
    let sender = KeyPair::random(&mut rng);
    let receiver = KeyPair::random(&mut rng);

    let smuggled = h.store.sign_and_wrap(
        Payload::Mailbox(mailbox(&sender, receiver.public_key(), b"hi")),
        &sender,
    );
    assert_eq!(
        h.store.try_add(StoreEntry::Protected(smuggled), None),
        Err(Rejection::PayloadKindMismatch)
    );

    let mut entry = h.store.sign_and_wrap(offer(&sender, b"ttl"), &sender);
    entry.ttl_millis = TTL * 100;
    assert_eq!(
        h.store.try_add(entry.into(), None),
        Err(Rejection::TtlMismatch {
            payload: TTL,
            entry: TTL * 100
        })
    );
}

#[test]
fn test_expired_entries_are_swept_without_broadcast() {
    let mut h = harness();
    let owner = KeyPair::random(&mut thread_rng());
    let payload = offer(&owner, b"short lived");
    let hash = h.store.content_hash(&payload);

    assert!(h.store.add(h.store.sign_and_wrap(payload, &owner).into(), None));

    h.clock.advance(Duration::from_millis(TTL));
    assert_eq!(h.store.sweep_expired(), 0, "expiry is strict");

    h.clock.advance(Duration::from_millis(1));
    assert_eq!(h.store.sweep_expired(), 1);
    assert_eq!(h.store.sweep_expired(), 0);

    assert_eq!(h.listener.removed(), vec![hash]);
    assert_eq!(h.broadcaster.sent().len(), 1);
    assert_eq!(h.store.ledger().sequence_number(&hash), Some(0));
}

#[test]
fn test_mailbox_round_trip() {
    let mut h = harness();
    let mut rng = thread_rng();
    let sender = KeyPair::random(&mut rng);
    let receiver = KeyPair::random(&mut rng);

    let payload = mailbox(&sender, receiver.public_key(), b"payment sent");
    let hash = h.store.content_hash(&Payload::Mailbox(payload.clone()));

    let published = h
        .store
        .sign_and_wrap_mailbox(payload.clone(), &sender, *receiver.public_key());
    assert!(h.store.add(published.clone().into(), None));

    let Some(StoreEntry::Mailbox(stored)) = h.store.get(&hash) else {
        panic!("mailbox entry missing");
    };
    let Payload::Mailbox(delivered) = &stored.entry.payload else {
        panic!("wrong payload kind");
    };
    let opened = open(
        receiver.private_key(),
        &delivered.sender_public_key,
        &delivered.sealed_message,
    )
    .unwrap();
    assert_eq!(opened, b"payment sent");

    assert_eq!(
        h.store.try_remove_mailbox(published.clone(), None),
        Err(Rejection::ReceiverMismatch),
        "sender cannot retract"
    );
    assert!(matches!(
        h.store.try_remove(published.entry, None),
        Err(Rejection::OwnerKeyMismatch { .. })
    ));

    let ack = h
        .store
        .sign_and_wrap_mailbox(payload, &receiver, *receiver.public_key());
    assert!(h.store.remove_mailbox(ack, None));
    assert!(h.store.get(&hash).is_none());

    let sent = h.broadcaster.sent();
    assert_eq!(sent.len(), 2);
    assert!(matches!(sent[1].0, WireMessage::RemoveMailboxData { .. }));
    assert_eq!(h.listener.removed(), vec![hash]);
}

#[test]
fn test_remove_of_absent_entry() {
    let mut h = harness();
    let owner = KeyPair::random(&mut thread_rng());
    let payload = offer(&owner, b"never stored");
    let hash = h.store.content_hash(&payload);

    let entry = h.store.sign_and_wrap(payload, &owner);

    assert_eq!(
        h.store.try_remove(entry, None),
        Err(Rejection::NotFound(hash))
    );
}

#[test]
fn test_broadcast_excludes_origin() {
    let mut h = harness();
    let owner = KeyPair::random(&mut thread_rng());
    let peer = NodeAddress::new("peer.example", 9000);

    let entry = h.store.sign_and_wrap(offer(&owner, b"gossip"), &owner);
    assert!(h.store.add(entry.clone().into(), Some(&peer)));
    assert!(h.store.remove(entry, Some(&peer)));

    let sent = h.broadcaster.sent();
    assert_eq!(sent.len(), 2);
    assert!(matches!(sent[0].0, WireMessage::AddData { .. }));
    assert!(matches!(sent[1].0, WireMessage::RemoveData { .. }));
    assert!(sent.iter().all(|(_, exclude)| exclude.as_ref() == Some(&peer)));
}

#[test]
fn test_live_owner_data_is_dropped_locally() {
    let mut h = harness();
    let owner = KeyPair::random(&mut thread_rng());
    let publisher = NodeAddress::new("10.0.0.9", 9000);

    let bound = Payload::Storage(StoragePayload {
        kind: "offer".to_owned(),
        owner_public_key: *owner.public_key(),
        ttl_millis: TTL,
        live_owner: Some(publisher.clone()),
        data: b"only while online".to_vec(),
    });
    let bound_hash = h.store.content_hash(&bound);

    assert!(h.store.add(h.store.sign_and_wrap(bound, &owner).into(), None));
    assert!(h
        .store
        .add(h.store.sign_and_wrap(offer(&owner, b"durable"), &owner).into(), None));

    assert_eq!(
        h.store
            .remove_live_owner_data(&NodeAddress::new("10.0.0.8", 9000)),
        0
    );
    assert_eq!(h.store.remove_live_owner_data(&publisher), 1);

    assert_eq!(h.store.len(), 1);
    assert_eq!(h.listener.removed(), vec![bound_hash]);
    assert_eq!(h.broadcaster.sent().len(), 2);
    assert_eq!(h.store.ledger().sequence_number(&bound_hash), Some(0));
}

#[test]
fn test_ledger_is_purged_past_threshold() {
    let config = StoreConfig::default().with_ledger_purge_threshold(2);
    let mut h = harness_with(config, MemoryPersister::default());
    let owner = KeyPair::random(&mut thread_rng());

    for data in [b"a", b"b", b"c"] {
        assert!(h.store.add(h.store.sign_and_wrap(offer(&owner, data), &owner).into(), None));
    }
    let saves = h.persister.save_count();

    h.clock.advance(DAY * 11);
    let fresh = h.store.sign_and_wrap(offer(&owner, b"d"), &owner);
    assert!(h.store.add(fresh.into(), None));

    assert_eq!(h.store.sweep_expired(), 3);
    assert_eq!(h.store.ledger().len(), 1);
    assert_eq!(h.persister.save_count(), saves + 2);
    assert_eq!(h.persister.saved().map(|saved| saved.len()), Some(1));
}

#[test]
fn test_ledger_below_threshold_is_kept() {
    let mut h = harness();
    let owner = KeyPair::random(&mut thread_rng());

    assert!(h.store.add(h.store.sign_and_wrap(offer(&owner, b"a"), &owner).into(), None));

    h.clock.advance(DAY * 30);

    assert_eq!(h.store.sweep_expired(), 1);
    assert_eq!(h.store.ledger().len(), 1);
}

#[test]
fn test_restored_ledger_blocks_replay() {
    let owner = KeyPair::random(&mut thread_rng());
    let payload = offer(&owner, b"removed before restart");
    let hash = Ed25519Sha256.hash(&payload.canonical_bytes());

    let mut snapshot = LedgerSnapshot::new();
    let _ignored = snapshot.insert(
        hash,
        SequenceRecord {
            sequence_number: 3,
            last_seen_at: 999_000,
        },
    );

    let mut h = harness_with(StoreConfig::default(), MemoryPersister::with_snapshot(snapshot));

    let entry = h.store.sign_and_wrap(payload, &owner);
    assert_eq!(entry.sequence_number, 4);

    let mut replay = entry.clone();
    replay.sequence_number = 3;
    let digest = Ed25519Sha256.hash(&replay.signable_bytes());
    replay.signature = Ed25519Sha256.sign(owner.private_key(), digest.as_bytes());

    assert!(!h.store.add(replay.into(), None));
    assert!(h.store.add(entry.into(), None));
}

#[test]
fn test_view_reads_from_other_threads() {
    let mut h = harness();
    let owner = KeyPair::random(&mut thread_rng());
    let view = h.store.view();

    let entry = h.store.sign_and_wrap(offer(&owner, b"shared"), &owner);
    assert!(h.store.add(entry.into(), None));

    let seen = std::thread::spawn(move || view.entries().len())
        .join()
        .unwrap();

    assert_eq!(seen, 1);
}
