//! Audit sink adapters.

mod leveled_log;

pub use leveled_log::LeveledFileAudit;
