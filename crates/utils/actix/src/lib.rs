use actix::dev::MessageResponse;
use actix::{Actor, Handler, Message};
use tokio::sync::oneshot;

/// Runs `msg` through `act`'s own handler and delivers the result to
/// `receiver`, so one request/outcome enum can fan out to per-message
/// handlers.
pub fn forward_handler<A, M>(
    act: &mut A,
    ctx: &mut A::Context,
    msg: M,
    receiver: oneshot::Sender<M::Result>,
) where
    A: Actor + Handler<M>,
    M: Message,
{
    act.handle(msg, ctx).handle(ctx, Some(receiver));
}
