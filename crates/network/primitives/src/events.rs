use actix::Message;
use agora_primitives::address::NodeAddress;

use crate::messages::WireMessage;
use crate::transport::ConnectionId;

#[derive(Message, Clone, Debug)]
#[rtype("()")]
#[non_exhaustive]
pub enum NetworkEvent {
    ListeningOn {
        address: NodeAddress,
    },
    Connected {
        peer: NodeAddress,
        connection: ConnectionId,
    },
    Message {
        from: NodeAddress,
        connection: ConnectionId,
        message: WireMessage,
    },
    Disconnected {
        peer: NodeAddress,
        connection: ConnectionId,
    },
    Error {
        peer: Option<NodeAddress>,
        reason: String,
    },
}
