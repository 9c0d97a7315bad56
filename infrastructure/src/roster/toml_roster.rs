//! TOML roster file reader.
//!
//! The roster is a plain TOML file of `[[member]]` tables:
//!
//! ```toml
//! [[member]]
//! national_id = "30123456"
//! first_name = "Ana"
//! surname = "Ruiz"
//! bloc = "Norte"
//! seat = 4
//! device_id = "pad-04"   # optional
//! present = false        # optional, defaults to false
//! ```

use plenum_application::ports::roster::{RosterError, RosterSource};
use plenum_domain::Member;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize)]
struct RosterFile {
    #[serde(default)]
    member: Vec<Member>,
}

/// Roster source reading a TOML file on every load.
///
/// Re-read per session opening on purpose: the roster can be edited
/// between sittings without restarting the process.
pub struct TomlRosterSource {
    path: PathBuf,
}

impl TomlRosterSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RosterSource for TomlRosterSource {
    fn load(&self) -> Result<Vec<Member>, RosterError> {
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| RosterError::Io(format!("{}: {}", self.path.display(), e)))?;
        let parsed: RosterFile = toml::from_str(&raw)
            .map_err(|e| RosterError::Parse(format!("{}: {}", self.path.display(), e)))?;
        debug!(
            path = %self.path.display(),
            members = parsed.member.len(),
            "roster loaded"
        );
        Ok(parsed.member)
    }
}
