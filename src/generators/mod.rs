//! Resolver functions behind each placeholder

pub mod clock;
pub mod command;
pub mod identity;
pub mod random;
