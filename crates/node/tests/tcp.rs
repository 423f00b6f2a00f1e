use core::time::Duration;
use std::sync::Arc;

use agora_network::bind;
use agora_network::config::{BootstrapConfig, NetworkConfig};
use agora_network_primitives::transport::Transport;
use agora_node::{spawn, Node};
use agora_primitives::address::NodeAddress;
use agora_primitives::clock::ManualClock;
use agora_primitives::entry::{Payload, StoragePayload};
use agora_primitives::identity::KeyPair;
use agora_store::config::StoreConfig;
use agora_store::persist::MemoryPersister;
use rand::thread_rng;
use tokio::time::sleep;

async fn spawn_node(clock: &ManualClock) -> (Node, NodeAddress) {
    let config = NetworkConfig::new("127.0.0.1:0".parse().unwrap(), BootstrapConfig::default(), 8);
    let (transport, events) = bind(&config).await.unwrap();
    let address = transport.local_address().clone();

    let node = spawn(
        Arc::new(transport),
        events,
        StoreConfig::default(),
        Arc::new(clock.clone()),
        Arc::new(MemoryPersister::default()),
    );

    (node, address)
}

fn offer(owner: &KeyPair, live_owner: Option<NodeAddress>) -> Payload {
    Payload::Storage(StoragePayload {
        kind: "offer".to_owned(),
        owner_public_key: *owner.public_key(),
        ttl_millis: 60_000,
        live_owner,
        data: b"buy 2 BTC at 58000".to_vec(),
    })
}

async fn eventually(condition: impl Fn() -> bool) -> bool {
    for _ in 0..300 {
        if condition() {
            return true;
        }

        sleep(Duration::from_millis(10)).await;
    }

    condition()
}

#[actix::test]
async fn test_live_data_survives_authenticating_to_its_owner() {
    let clock = ManualClock::new(1_000_000);

    let (seed, seed_address) = spawn_node(&clock).await;
    let (owner_node, owner_address) = spawn_node(&clock).await;
    let (watcher, _watcher_address) = spawn_node(&clock).await;

    let _known = owner_node.network.client.authenticate(seed_address.clone()).await.unwrap();
    let _known = watcher.network.client.authenticate(seed_address.clone()).await.unwrap();

    let owner = KeyPair::random(&mut thread_rng());
    let live = owner_node
        .store
        .publish(offer(&owner, Some(owner_address.clone())), owner)
        .await
        .unwrap();

    assert!(eventually(|| seed.store.contains(&live) && watcher.store.contains(&live)).await);

    let _known = watcher.network.client.authenticate(owner_address.clone()).await.unwrap();
    assert!(watcher.network.peers.is_authenticated(&owner_address));

    // The owner drops the request connection as part of the handshake.
    sleep(Duration::from_millis(300)).await;

    assert!(watcher.store.contains(&live));
    assert!(seed.store.contains(&live));
    assert!(watcher.network.peers.is_authenticated(&owner_address));
}

#[actix::test]
async fn test_store_mutations_travel_over_tcp() {
    let clock = ManualClock::new(1_000_000);

    let (alice, _alice_address) = spawn_node(&clock).await;
    let (bob, bob_address) = spawn_node(&clock).await;
    let (carol, carol_address) = spawn_node(&clock).await;

    let _known = bob.network.client.authenticate(carol_address).await.unwrap();
    let _known = alice.network.client.authenticate(bob_address).await.unwrap();

    let owner = KeyPair::random(&mut thread_rng());
    let hash = alice.store.publish(offer(&owner, None), owner).await.unwrap();

    assert!(eventually(|| bob.store.contains(&hash) && carol.store.contains(&hash)).await);

    let _hash = alice.store.unpublish(offer(&owner, None), owner).await.unwrap();

    assert!(eventually(|| !bob.store.contains(&hash) && !carol.store.contains(&hash)).await);
}
