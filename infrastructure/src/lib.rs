//! Infrastructure layer for plenum
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, plus configuration file loading and
//! the TCP keypad listener.

pub mod audit;
pub mod config;
pub mod keypad;
pub mod roster;

// Re-export commonly used types
pub use audit::LeveledFileAudit;
pub use config::{ConfigLoader, FileConfig};
pub use keypad::KeypadListener;
pub use roster::TomlRosterSource;
