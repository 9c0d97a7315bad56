//! Application layer for plenum
//!
//! Services orchestrating the domain state machine behind one
//! mutual-exclusion boundary, plus the ports infrastructure adapters
//! implement:
//!
//! - [`SessionService`]: the single authoritative handle on the one
//!   allowed open session, and the floor-queue operations.
//! - [`RollCallService`]: lifecycle and majority arithmetic gatekeeping
//!   for the single current roll call.
//! - [`PulsationProcessor`]: translates decoded hardware `(device, key)`
//!   pairs into domain actions.
//!
//! All three share an `Arc<Mutex<ChamberState>>`; every public operation
//! takes the lock exactly once, so state transitions are atomic with
//! respect to each other and safe under many concurrent callers.

pub mod ports;
pub mod pulsation;
pub mod roll_call_service;
pub mod session_service;
pub mod state;

pub use ports::audit::{AuditLevel, AuditSink, NoAuditSink};
pub use ports::roster::{RosterError, RosterSource};
pub use pulsation::{PulsationAction, PulsationProcessor, PulsationResult};
pub use roll_call_service::RollCallService;
pub use session_service::SessionService;
pub use state::{lock_state, ChamberState, SharedState};
