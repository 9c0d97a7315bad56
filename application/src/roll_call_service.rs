//! Roll-Call Manager service
//!
//! Gatekeeps the lifecycle of the single current roll call: opening under
//! quorum, ballot casting with auto-closure, forced closure, and tie-break.

use crate::ports::audit::{AuditLevel, AuditSink};
use crate::state::{lock_state, ClosedRound, SharedState};
use plenum_domain::{BallotValue, DomainError, RollCallView, SessionView};
use std::sync::Arc;
use tracing::info;

pub struct RollCallService {
    state: SharedState,
    audit: Arc<dyn AuditSink>,
}

impl RollCallService {
    pub fn new(state: SharedState, audit: Arc<dyn AuditSink>) -> Self {
        Self { state, audit }
    }

    /// Open a new roll call in the current session.
    pub fn open(
        &self,
        number: u32,
        kind: &str,
        topic: &str,
        over_present: bool,
        special_majority: f64,
    ) -> Result<RollCallView, DomainError> {
        let view = {
            let mut state = lock_state(&self.state);
            state.open_roll_call(number, kind, topic, over_present, special_majority)?;
            self.current_view(&state)
                .ok_or(DomainError::NoOpenRollCall)?
        };

        info!(round = number, topic, "roll call opened");
        self.audit.emit(
            "VOTE",
            AuditLevel::Milestone,
            &format!(
                "Roll call {} ({}) opened on topic: {}",
                view.number, view.kind, view.topic
            ),
        );
        Ok(view)
    }

    /// Cast a member's ballot.
    ///
    /// Once every present member has voted the round closes automatically;
    /// it stays current only when the result is a tie pending tie-break.
    pub fn cast(&self, member_id: &str, value: BallotValue) -> Result<RollCallView, DomainError> {
        let (outcome, view) = {
            let mut state = lock_state(&self.state);
            let outcome = state.cast_ballot(member_id, value).inspect_err(|e| {
                self.audit.emit(
                    "BALLOT",
                    AuditLevel::Routine,
                    &format!("Ballot refused ({}) for member {}", e.code(), member_id),
                );
            })?;
            let view = self
                .last_round_view(&state)
                .ok_or(DomainError::NoOpenRollCall)?;
            (outcome, view)
        };

        self.audit.emit(
            "BALLOT",
            AuditLevel::Routine,
            &format!("{} voted {}", outcome.member_label, outcome.value),
        );
        if let Some(closed) = &outcome.closed {
            self.emit_result(outcome.round_number, closed);
        }
        Ok(view)
    }

    /// Force the current roll call closed, logging who had not voted.
    pub fn force_close(&self) -> Result<RollCallView, DomainError> {
        let (outcome, view) = {
            let mut state = lock_state(&self.state);
            let outcome = state.force_close_roll_call()?;
            let view = self
                .last_round_view(&state)
                .ok_or(DomainError::NoOpenRollCall)?;
            (outcome, view)
        };

        self.audit.emit(
            "VOTE",
            AuditLevel::Routine,
            &format!(
                "Forced close of roll call {} - without voting: {}",
                outcome.round_number,
                if outcome.non_voters.is_empty() {
                    "nobody".to_string()
                } else {
                    outcome.non_voters.join(", ")
                }
            ),
        );
        self.audit.emit(
            "VOTE",
            AuditLevel::Milestone,
            &format!(
                "Roll call {} closed: {} - {}",
                outcome.round_number, outcome.state, outcome.summary
            ),
        );
        Ok(view)
    }

    /// Resolve a tied roll call.
    pub fn tie_break(&self, value: BallotValue) -> Result<RollCallView, DomainError> {
        let (outcome, view) = {
            let mut state = lock_state(&self.state);
            let outcome = state.tie_break(value)?;
            let view = self
                .last_round_view(&state)
                .ok_or(DomainError::NoTieToBreak)?;
            (outcome, view)
        };

        info!(round = outcome.round_number, state = %outcome.state, "tie broken");
        self.audit.emit(
            "VOTE",
            AuditLevel::Milestone,
            &format!(
                "Roll call {} tie broken: {} - {}",
                outcome.round_number, outcome.state, outcome.summary
            ),
        );
        Ok(view)
    }

    /// The current roll call (in progress or tied), if any. Pure read.
    pub fn current(&self) -> Option<RollCallView> {
        let state = lock_state(&self.state);
        self.current_view(&state)
    }

    /// Re-check the auto-close condition after a presence change. Callers
    /// must only invoke this while a roll call is in progress.
    pub fn recalculate_on_presence_change(&self) -> Result<(), DomainError> {
        lock_state(&self.state).recalculate_on_presence_change()?;
        Ok(())
    }

    fn emit_result(&self, round_number: u32, closed: &ClosedRound) {
        if closed.tie_pending {
            self.audit.emit(
                "VOTE",
                AuditLevel::Milestone,
                &format!(
                    "Roll call {} tied ({}) - awaiting tie-break",
                    round_number, closed.summary
                ),
            );
        } else {
            self.audit.emit(
                "VOTE",
                AuditLevel::Milestone,
                &format!(
                    "Roll call {} completed: {} - {}",
                    round_number, closed.state, closed.summary
                ),
            );
        }
    }

    fn current_view(&self, state: &crate::state::ChamberState) -> Option<RollCallView> {
        let session = state.session()?;
        let round = state.current_round()?;
        Some(RollCallView::project(round, session))
    }

    /// View of the most recent round, current or just closed.
    fn last_round_view(&self, state: &crate::state::ChamberState) -> Option<RollCallView> {
        let session = state.session()?;
        let round = session.roll_calls.last()?;
        Some(RollCallView::project(round, session))
    }
}

/// Convenience projection of the whole session, used by callers that want
/// the full picture after a roll-call mutation.
pub fn session_view(state: &SharedState) -> Option<SessionView> {
    lock_state(state).session().map(SessionView::from)
}
