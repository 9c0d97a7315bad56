//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Path of the TOML member roster
    pub roster_file: PathBuf,
    /// Directory for the leveled audit files
    pub log_dir: PathBuf,
    /// Minimum present members to open a roll call
    pub quorum: usize,
    /// In-memory audit tail size served by the `tail` command
    pub tail_capacity: usize,
    /// Bind address of the TCP keypad listener; `None` disables it
    pub listen_addr: Option<String>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            roster_file: PathBuf::from("roster.toml"),
            log_dir: PathBuf::from("logs"),
            quorum: 1,
            tail_capacity: 100,
            listen_addr: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FileConfig::default();
        assert_eq!(config.roster_file, PathBuf::from("roster.toml"));
        assert_eq!(config.quorum, 1);
        assert_eq!(config.tail_capacity, 100);
        assert!(config.listen_addr.is_none());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: FileConfig =
            toml::from_str("quorum = 12\nlisten_addr = \"127.0.0.1:9000\"\n").unwrap();
        assert_eq!(config.quorum, 12);
        assert_eq!(config.listen_addr.as_deref(), Some("127.0.0.1:9000"));
        assert_eq!(config.tail_capacity, 100);
    }
}
