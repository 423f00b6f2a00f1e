use core::fmt;

use agora_primitives::address::NodeAddress;
use async_trait::async_trait;
use borsh::{BorshDeserialize, BorshSerialize};
use thiserror::Error;

use crate::messages::WireMessage;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize)]
pub struct ConnectionId(u64);

impl ConnectionId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Debug for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectionId({})", self.0)
    }
}

/// Handle to the connection a message went out on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Connection {
    pub id: ConnectionId,
    pub peer: NodeAddress,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    #[error("peer '{0}' is unreachable")]
    Unreachable(NodeAddress),

    #[error("connection to '{peer}' failed: {reason}")]
    ConnectionFailed { peer: NodeAddress, reason: String },

    #[error("connection to '{0}' closed")]
    Closed(NodeAddress),
}

/// Point-to-point message delivery.
///
/// Inbound traffic and connection lifecycle arrive separately as
/// [`crate::events::NetworkEvent`]s.
#[async_trait]
pub trait Transport: fmt::Debug + Send + Sync + 'static {
    fn local_address(&self) -> &NodeAddress;

    async fn send(
        &self,
        address: &NodeAddress,
        message: WireMessage,
    ) -> Result<Connection, TransportError>;

    async fn close(&self, connection: ConnectionId);
}
