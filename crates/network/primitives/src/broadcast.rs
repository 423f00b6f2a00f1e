use core::fmt;

use agora_primitives::address::NodeAddress;

use crate::messages::WireMessage;

/// Fire-and-forget fan-out of a message to every admitted peer.
///
/// `exclude` is the peer a mutation arrived from; it already has the data.
pub trait Broadcaster: fmt::Debug + Send + Sync + 'static {
    fn broadcast(&self, message: WireMessage, exclude: Option<&NodeAddress>);
}
