pub mod address;
pub mod clock;
pub mod entry;
pub mod hash;
pub mod identity;
