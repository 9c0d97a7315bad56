//! Port for loading the member roster.

use plenum_domain::Member;
use thiserror::Error;

/// Errors a roster source can produce.
#[derive(Error, Debug)]
pub enum RosterError {
    #[error("Could not read roster: {0}")]
    Io(String),

    #[error("Could not parse roster: {0}")]
    Parse(String),
}

/// Port producing the ordered member list for a session.
///
/// Consumed once per session opening; the loaded list becomes that
/// session's roster snapshot. The on-disk format belongs to the
/// implementation.
pub trait RosterSource: Send + Sync {
    fn load(&self) -> Result<Vec<Member>, RosterError>;
}
