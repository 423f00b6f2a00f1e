pub mod broadcast;
pub mod events;
pub mod messages;
pub mod transport;
