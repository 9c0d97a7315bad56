//! Roll-call voting: ballots, the round state machine and its majority
//! arithmetic.

pub mod ballot;
pub mod round;

pub use ballot::{Ballot, BallotValue};
pub use round::{RollCall, RollCallState};
