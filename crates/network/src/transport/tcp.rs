use core::net::SocketAddr;
use core::sync::atomic::{AtomicU64, Ordering};
use std::io;
use std::sync::Arc;

use agora_network_primitives::events::NetworkEvent;
use agora_network_primitives::messages::{Envelope, WireMessage};
use agora_network_primitives::transport::{Connection, ConnectionId, Transport, TransportError};
use agora_primitives::address::NodeAddress;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::{select, spawn};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::transport::codec::EnvelopeCodec;

#[derive(Debug)]
struct Outbound {
    id: ConnectionId,
    frames: mpsc::UnboundedSender<Envelope>,
    shutdown: CancellationToken,
}

#[derive(Debug)]
struct Shared {
    local: NodeAddress,
    events: mpsc::Sender<NetworkEvent>,
    outbound: DashMap<NodeAddress, Outbound>,
    inbound: DashMap<ConnectionId, CancellationToken>,
    /// Open connections per peer, in either direction.
    links: DashMap<NodeAddress, usize>,
    next_id: AtomicU64,
}

impl Shared {
    fn next_id(&self) -> ConnectionId {
        ConnectionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    async fn emit(&self, event: NetworkEvent) {
        if self.events.send(event).await.is_err() {
            debug!("Network event receiver dropped");
        }
    }

    fn link(&self, peer: &NodeAddress) {
        let mut count = self.links.entry(peer.clone()).or_insert(0);

        *count = count.saturating_add(1);
    }

    /// Returns whether this was the last connection to `peer`.
    fn unlink(&self, peer: &NodeAddress) -> bool {
        let Entry::Occupied(mut entry) = self.links.entry(peer.clone()) else {
            return false;
        };

        if *entry.get() > 1 {
            let count = entry.get_mut();
            *count = count.saturating_sub(1);
            return false;
        }

        let _count = entry.remove();

        true
    }

    /// A connection ended without either side asking for it. The peer only
    /// counts as disconnected once nothing else links us to it.
    async fn connection_lost(&self, peer: NodeAddress, id: ConnectionId) {
        if !self.unlink(&peer) {
            debug!(%peer, connection = %id, "Peer still reachable over another connection");
            return;
        }

        self.emit(NetworkEvent::Disconnected {
            peer,
            connection: id,
        })
        .await;
    }
}

/// TCP transport keeping one persistent outbound connection per peer.
///
/// Peers answer over their own outbound connections, so inbound connections
/// are only ever read from. [`NetworkEvent::Disconnected`] is reported when
/// the last connection to a peer is lost; connections closed through
/// [`Transport::close`] are never reported.
#[derive(Clone, Debug)]
pub struct TcpTransport {
    shared: Arc<Shared>,
}

impl TcpTransport {
    /// Binds `listen` and starts accepting. `advertised` is the address
    /// peers are told to reach this node at; port 0 takes the bound port.
    pub async fn bind(
        listen: SocketAddr,
        advertised: NodeAddress,
        events: mpsc::Sender<NetworkEvent>,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(listen).await?;

        let advertised = if advertised.port() == 0 {
            NodeAddress::new(advertised.host(), listener.local_addr()?.port())
        } else {
            advertised
        };

        info!(%listen, %advertised, "Listening for peers");

        let shared = Arc::new(Shared {
            local: advertised.clone(),
            events,
            outbound: DashMap::new(),
            inbound: DashMap::new(),
            links: DashMap::new(),
            next_id: AtomicU64::new(0),
        });

        shared
            .emit(NetworkEvent::ListeningOn {
                address: advertised,
            })
            .await;

        drop(spawn(accept_loop(listener, Arc::clone(&shared))));

        Ok(Self { shared })
    }
}

#[async_trait]
impl Transport for TcpTransport {
    fn local_address(&self) -> &NodeAddress {
        &self.shared.local
    }

    async fn send(
        &self,
        address: &NodeAddress,
        message: WireMessage,
    ) -> Result<Connection, TransportError> {
        let mut envelope = Envelope {
            sender: self.shared.local.clone(),
            message,
        };

        if let Some(outbound) = self.shared.outbound.get(address) {
            match outbound.frames.send(envelope) {
                Ok(()) => {
                    return Ok(Connection {
                        id: outbound.id,
                        peer: address.clone(),
                    })
                }
                Err(mpsc::error::SendError(returned)) => envelope = returned,
            }
        }

        let stream = connect(address).await?;

        let id = self.shared.next_id();
        let shutdown = CancellationToken::new();
        let (frames, receiver) = mpsc::unbounded_channel();

        if frames.send(envelope).is_err() {
            return Err(TransportError::Closed(address.clone()));
        }

        self.shared.link(address);

        // A replaced connection drains what it already queued, then ends.
        let _previous = self.shared.outbound.insert(
            address.clone(),
            Outbound {
                id,
                frames,
                shutdown: shutdown.clone(),
            },
        );

        debug!(peer = %address, connection = %id, "Opened outbound connection");

        drop(spawn(drive_outbound(
            stream,
            receiver,
            address.clone(),
            id,
            shutdown,
            Arc::clone(&self.shared),
        )));

        self.shared
            .emit(NetworkEvent::Connected {
                peer: address.clone(),
                connection: id,
            })
            .await;

        Ok(Connection {
            id,
            peer: address.clone(),
        })
    }

    async fn close(&self, connection: ConnectionId) {
        if let Some((_, shutdown)) = self.shared.inbound.remove(&connection) {
            shutdown.cancel();

            debug!(%connection, "Closing inbound connection");

            return;
        }

        let peer = self
            .shared
            .outbound
            .iter()
            .find(|outbound| outbound.id == connection)
            .map(|outbound| outbound.key().clone());

        let Some(peer) = peer else {
            return;
        };

        if let Some((_, outbound)) = self
            .shared
            .outbound
            .remove_if(&peer, |_, outbound| outbound.id == connection)
        {
            outbound.shutdown.cancel();

            debug!(%peer, %connection, "Closing outbound connection");
        }
    }
}

async fn connect(peer: &NodeAddress) -> Result<TcpStream, TransportError> {
    TcpStream::connect((peer.host(), peer.port()))
        .await
        .map_err(|err| TransportError::ConnectionFailed {
            peer: peer.clone(),
            reason: err.to_string(),
        })
}

async fn accept_loop(listener: TcpListener, shared: Arc<Shared>) {
    loop {
        match listener.accept().await {
            Ok((stream, remote)) => {
                let id = shared.next_id();
                let shutdown = CancellationToken::new();

                debug!(%remote, connection = %id, "Accepted inbound connection");

                let _previous = shared.inbound.insert(id, shutdown.clone());

                drop(spawn(read_inbound(stream, id, shutdown, Arc::clone(&shared))));
            }
            Err(err) => warn!(%err, "Failed to accept connection"),
        }
    }
}

async fn read_inbound(
    stream: TcpStream,
    id: ConnectionId,
    shutdown: CancellationToken,
    shared: Arc<Shared>,
) {
    let mut frames = FramedRead::new(stream, EnvelopeCodec::new());
    let mut peer: Option<NodeAddress> = None;

    let intended = loop {
        let frame = select! {
            biased;
            () = shutdown.cancelled() => break true,
            frame = frames.next() => frame,
        };

        let envelope = match frame {
            Some(Ok(envelope)) => envelope,
            Some(Err(err)) => {
                shared
                    .emit(NetworkEvent::Error {
                        peer: peer.clone(),
                        reason: err.to_string(),
                    })
                    .await;
                break false;
            }
            None => break false,
        };

        if peer.is_none() {
            shared.link(&envelope.sender);
            peer = Some(envelope.sender.clone());
        }

        shared
            .emit(NetworkEvent::Message {
                from: envelope.sender,
                connection: id,
                message: envelope.message,
            })
            .await;
    };

    let _removed = shared.inbound.remove(&id);

    let Some(peer) = peer else {
        return;
    };

    if intended {
        let _last = shared.unlink(&peer);
        return;
    }

    shared.connection_lost(peer, id).await;
}

#[derive(Debug)]
enum Pumped {
    /// Closed locally, or every sender is gone and the queue is drained.
    Closed,
    /// Closed by the peer or broken. Carries the frame whose write failed.
    Lost(Option<Envelope>),
}

/// Writes queued frames until the connection ends. Outbound connections
/// carry no inbound traffic; reading only detects the peer going away.
async fn pump(
    stream: TcpStream,
    receiver: &mut mpsc::UnboundedReceiver<Envelope>,
    shutdown: &CancellationToken,
    peer: &NodeAddress,
    id: ConnectionId,
) -> Pumped {
    let (read, write) = stream.into_split();
    let mut incoming = FramedRead::new(read, EnvelopeCodec::new());
    let mut sink = FramedWrite::new(write, EnvelopeCodec::new());

    loop {
        select! {
            biased;
            () = shutdown.cancelled() => return Pumped::Closed,
            frame = incoming.next() => {
                if !matches!(frame, Some(Ok(_))) {
                    debug!(%peer, connection = %id, "Outbound connection closed by peer");
                    return Pumped::Lost(None);
                }
            }
            envelope = receiver.recv() => {
                let Some(envelope) = envelope else {
                    return Pumped::Closed;
                };

                if let Err(err) = sink.send(envelope.clone()).await {
                    debug!(%peer, connection = %id, %err, "Failed to write to peer");
                    return Pumped::Lost(Some(envelope));
                }
            }
        }
    }
}

/// Owns one peer's outbound connection. When the peer drops it while frames
/// are still queued, the frames go out over a fresh connection.
async fn drive_outbound(
    mut stream: TcpStream,
    mut receiver: mpsc::UnboundedReceiver<Envelope>,
    peer: NodeAddress,
    mut id: ConnectionId,
    mut shutdown: CancellationToken,
    shared: Arc<Shared>,
) {
    loop {
        let unsent = match pump(stream, &mut receiver, &shutdown, &peer, id).await {
            Pumped::Closed => {
                let _removed = shared
                    .outbound
                    .remove_if(&peer, |_, outbound| outbound.id == id);
                let _last = shared.unlink(&peer);

                debug!(%peer, connection = %id, "Outbound connection closed");

                return;
            }
            Pumped::Lost(unsent) => unsent,
        };

        let _removed = shared
            .outbound
            .remove_if(&peer, |_, outbound| outbound.id == id);

        receiver.close();

        let mut pending: Vec<_> = unsent.into_iter().collect();

        while let Ok(envelope) = receiver.try_recv() {
            pending.push(envelope);
        }

        if pending.is_empty() {
            shared.connection_lost(peer, id).await;
            return;
        }

        let reconnected = match connect(&peer).await {
            Ok(reconnected) => reconnected,
            Err(err) => {
                warn!(%peer, %err, dropped = pending.len(), "Failed to reconnect to peer");

                shared.connection_lost(peer, id).await;
                return;
            }
        };

        let next_id = shared.next_id();
        let next_shutdown = CancellationToken::new();
        let (frames, next_receiver) = mpsc::unbounded_channel();

        let forwarded = match shared.outbound.entry(peer.clone()) {
            Entry::Occupied(occupant) => {
                for envelope in pending {
                    let _ignored = occupant.get().frames.send(envelope);
                }
                true
            }
            Entry::Vacant(vacant) => {
                for envelope in pending {
                    let _ignored = frames.send(envelope);
                }

                let _entry = vacant.insert(Outbound {
                    id: next_id,
                    frames,
                    shutdown: next_shutdown.clone(),
                });
                false
            }
        };

        if forwarded {
            drop(reconnected);

            shared.connection_lost(peer, id).await;
            return;
        }

        // The new connection takes over the lost one's link.
        debug!(%peer, connection = %next_id, replaces = %id, "Reconnected to deliver queued frames");

        shared
            .emit(NetworkEvent::Connected {
                peer: peer.clone(),
                connection: next_id,
            })
            .await;

        stream = reconnected;
        receiver = next_receiver;
        id = next_id;
        shutdown = next_shutdown;
    }
}
