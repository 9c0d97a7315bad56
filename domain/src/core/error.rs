//! Domain error types

use thiserror::Error;

/// Domain-level errors.
///
/// The taxonomy is closed and operation-scoped: every failing operation
/// surfaces one of these named conditions, never a generic failure, so a
/// presentation layer can render operator-facing messages. All variants are
/// recoverable by the caller: validation precedes mutation, so no failing
/// operation leaves state half-changed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("A session is already open")]
    AlreadyOpen,

    #[error("Member roster unavailable: {0}")]
    RosterUnavailable(String),

    #[error("Member roster is empty")]
    EmptyRoster,

    #[error("No session is open")]
    NoOpenSession,

    #[error("Quorum not met: {present} present, {quorum} required")]
    QuorumNotMet { present: usize, quorum: usize },

    #[error("A roll call is already in progress")]
    RollCallAlreadyOpen,

    #[error("No roll call is open")]
    NoOpenRollCall,

    #[error("Roll call is not in progress")]
    RollCallNotInProgress,

    #[error("Member {0} already voted in this roll call")]
    DuplicateBallot(String),

    #[error("Current roll call is not tied")]
    NoTieToBreak,

    #[error("No member is assigned to device {0}")]
    UnassignedDevice(String),

    #[error("Member {0} is not present")]
    MemberAbsent(String),

    #[error("Unsupported key {0:?}")]
    UnsupportedKey(String),

    #[error("No member {0} in the roster")]
    UnknownMember(String),
}

impl DomainError {
    /// Short machine-readable name of the condition, used in audit lines.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::AlreadyOpen => "already_open",
            DomainError::RosterUnavailable(_) => "roster_unavailable",
            DomainError::EmptyRoster => "empty_roster",
            DomainError::NoOpenSession => "no_open_session",
            DomainError::QuorumNotMet { .. } => "quorum_not_met",
            DomainError::RollCallAlreadyOpen => "roll_call_already_open",
            DomainError::NoOpenRollCall => "no_open_roll_call",
            DomainError::RollCallNotInProgress => "roll_call_not_in_progress",
            DomainError::DuplicateBallot(_) => "duplicate_ballot",
            DomainError::NoTieToBreak => "no_tie_to_break",
            DomainError::UnassignedDevice(_) => "unassigned_device",
            DomainError::MemberAbsent(_) => "member_absent",
            DomainError::UnsupportedKey(_) => "unsupported_key",
            DomainError::UnknownMember(_) => "unknown_member",
        }
    }
}
