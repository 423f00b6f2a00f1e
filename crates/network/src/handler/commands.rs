pub mod authenticate;
pub mod bootstrap;
pub mod expand;
