//! Session aggregate and its read-only projections

pub mod entities;
pub mod view;

pub use entities::{Attendance, Session};
pub use view::{BallotView, MemberView, RollCallView, SessionView};
