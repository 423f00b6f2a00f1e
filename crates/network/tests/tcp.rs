use core::time::Duration;
use std::collections::BTreeSet;
use std::sync::Arc;

use agora_network::config::{BootstrapConfig, NetworkConfig};
use agora_network::{bind, start, Network};
use agora_network_primitives::broadcast::Broadcaster;
use agora_network_primitives::events::NetworkEvent;
use agora_network_primitives::messages::{Peers, WireMessage};
use agora_network_primitives::transport::Transport;
use agora_primitives::address::NodeAddress;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

/// Binds a loopback node and starts its handshake actor. Every event is
/// handed to the actor and mirrored to the returned receiver.
async fn spawn_node() -> (Network, NodeAddress, mpsc::UnboundedReceiver<NetworkEvent>) {
    let config = NetworkConfig::new("127.0.0.1:0".parse().unwrap(), BootstrapConfig::default(), 8);
    let (transport, mut events) = bind(&config).await.unwrap();
    let address = transport.local_address().clone();

    let node = start(Arc::new(transport));
    let manager = node.manager.clone();
    let (tap, observed) = mpsc::unbounded_channel();

    drop(actix::spawn(async move {
        while let Some(event) = events.recv().await {
            let _ignored = tap.send(event.clone());
            manager.do_send(event);
        }
    }));

    (node, address, observed)
}

fn drain(events: &mut mpsc::UnboundedReceiver<NetworkEvent>) -> Vec<NetworkEvent> {
    let mut drained = Vec::new();

    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }

    drained
}

fn disconnects(events: &[NetworkEvent]) -> Vec<&NodeAddress> {
    events
        .iter()
        .filter_map(|event| match event {
            NetworkEvent::Disconnected { peer, .. } => Some(peer),
            _ => None,
        })
        .collect()
}

async fn next_message_from(
    events: &mut mpsc::UnboundedReceiver<NetworkEvent>,
    sender: &NodeAddress,
) -> WireMessage {
    let wait = async {
        while let Some(event) = events.recv().await {
            if let NetworkEvent::Message { from, message, .. } = event {
                if from == *sender {
                    return message;
                }
            }
        }

        panic!("event stream ended");
    };

    timeout(Duration::from_secs(5), wait).await.unwrap()
}

#[actix::test]
async fn test_handshake_over_tcp_keeps_both_peers_connected() {
    let (alice, alice_address, mut alice_events) = spawn_node().await;
    let (bob, bob_address, mut bob_events) = spawn_node().await;

    let known = alice.client.authenticate(bob_address.clone()).await.unwrap();

    assert_eq!(known, BTreeSet::from([bob_address.clone()]));
    assert!(alice.peers.is_authenticated(&bob_address));
    assert!(bob.peers.is_authenticated(&alice_address));

    // Let the request connection the responder dropped settle.
    sleep(Duration::from_millis(300)).await;
    let _settled = drain(&mut alice_events);
    let _settled = drain(&mut bob_events);

    let message = WireMessage::Peers(Peers {
        address: alice_address.clone(),
        peer_addresses: BTreeSet::new(),
    });

    alice.broadcaster.broadcast(message.clone(), None);
    assert_eq!(next_message_from(&mut bob_events, &alice_address).await, message);

    let reply = WireMessage::Peers(Peers {
        address: bob_address.clone(),
        peer_addresses: BTreeSet::new(),
    });

    bob.broadcaster.broadcast(reply.clone(), None);
    assert_eq!(next_message_from(&mut alice_events, &bob_address).await, reply);

    sleep(Duration::from_millis(300)).await;

    assert!(disconnects(&drain(&mut alice_events)).is_empty());
    assert!(disconnects(&drain(&mut bob_events)).is_empty());
    assert!(alice.peers.is_authenticated(&bob_address));
    assert!(bob.peers.is_authenticated(&alice_address));
}

#[actix::test]
async fn test_handshake_over_tcp_completes_for_several_initiators() {
    let (hub, hub_address, _hub_events) = spawn_node().await;
    let (alice, alice_address, _alice_events) = spawn_node().await;
    let (bob, bob_address, _bob_events) = spawn_node().await;

    let _known = alice.client.authenticate(hub_address.clone()).await.unwrap();
    let known = bob.client.authenticate(hub_address.clone()).await.unwrap();

    assert!(known.contains(&alice_address));
    assert_eq!(
        hub.peers.authenticated(),
        BTreeSet::from([alice_address, bob_address])
    );
}
