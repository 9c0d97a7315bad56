//! Domain layer for plenum
//!
//! This crate contains the core business logic of a live legislative
//! session: the member roster, the roll-call voting state machine with
//! its majority arithmetic, and the floor (speaking-turn) queue.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Session
//!
//! One sitting of the deliberative body. A session owns a snapshot of the
//! member roster, the chronological list of roll calls held, and the floor
//! queue. At most one session is open system-wide at any time; that
//! invariant is enforced one layer up, by the application services.
//!
//! ## Roll Call
//!
//! One yes/no/abstain vote. A roll call moves from `InProgress` to exactly
//! one of `Approved`, `Rejected`, `Tied` or `Inconclusive`; a `Tied` round
//! can still be resolved to `Approved` or `Rejected` by a tie-break ballot.
//! All other terminal states are absorbing.

pub mod core;
pub mod floor;
pub mod member;
pub mod roll_call;
pub mod sequence;
pub mod session;

// Re-export commonly used types
pub use core::error::DomainError;
pub use floor::{FloorQueue, FloorToggle};
pub use member::Member;
pub use roll_call::{Ballot, BallotValue, RollCall, RollCallState};
pub use sequence::SequenceGenerator;
pub use session::{
    entities::{Attendance, Session},
    view::{BallotView, MemberView, RollCallView, SessionView},
};
