//! Ports (interfaces) implemented by the infrastructure layer

pub mod audit;
pub mod roster;
