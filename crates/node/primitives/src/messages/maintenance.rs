use actix::Message;
use agora_primitives::address::NodeAddress;

/// Runs the expiration sweep now instead of waiting for the next tick.
#[derive(Clone, Copy, Debug)]
pub struct SweepExpiredRequest;

impl Message for SweepExpiredRequest {
    type Result = usize;
}

#[derive(Clone, Debug)]
pub struct RemoveLiveOwnerDataRequest {
    pub address: NodeAddress,
}

impl Message for RemoveLiveOwnerDataRequest {
    type Result = usize;
}
