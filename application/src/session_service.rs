//! Session Manager service
//!
//! The single authoritative handle on the one allowed open session, plus
//! the floor-queue operations. Mutation happens under one lock acquisition
//! per operation; audit lines are emitted in source-event order and never
//! block a state transition.

use crate::ports::audit::{AuditLevel, AuditSink};
use crate::ports::roster::RosterSource;
use crate::state::{lock_state, SharedState};
use plenum_domain::{DomainError, FloorToggle, MemberView, SessionView};
use std::sync::Arc;
use tracing::{debug, info};

pub struct SessionService {
    state: SharedState,
    roster: Arc<dyn RosterSource>,
    audit: Arc<dyn AuditSink>,
    /// Quorum attached to every session this service opens
    quorum: usize,
}

impl SessionService {
    pub fn new(
        state: SharedState,
        roster: Arc<dyn RosterSource>,
        audit: Arc<dyn AuditSink>,
        quorum: usize,
    ) -> Self {
        Self {
            state,
            roster,
            audit,
            quorum,
        }
    }

    /// Open a session under the given public number.
    ///
    /// Loads the roster through the [`RosterSource`] port. The roster read
    /// happens outside the lock; the open check is re-run when installing,
    /// so two concurrent opens still resolve to one success.
    pub fn open(&self, session_number: u32) -> Result<SessionView, DomainError> {
        if lock_state(&self.state).session().is_some() {
            self.audit.emit(
                "SESSION",
                AuditLevel::Routine,
                "Session open refused: a session is already open",
            );
            return Err(DomainError::AlreadyOpen);
        }

        let members = self.roster.load().map_err(|e| {
            self.audit.emit(
                "SESSION",
                AuditLevel::Routine,
                &format!("Session open refused: roster unavailable ({})", e),
            );
            DomainError::RosterUnavailable(e.to_string())
        })?;

        let view = {
            let mut state = lock_state(&self.state);
            let session = state.open_session(session_number, members, self.quorum)?;
            SessionView::from(session)
        };

        info!(session = session_number, "session opened");
        self.audit.emit(
            "SESSION",
            AuditLevel::Milestone,
            &format!(
                "Session {} opened with {} members ({} present, quorum {})",
                view.number, view.total_count, view.present_count, view.quorum
            ),
        );
        Ok(view)
    }

    /// Close the current session, force-closing any in-progress roll call
    /// first.
    pub fn close(&self) -> Result<SessionView, DomainError> {
        let closed = lock_state(&self.state).close_session().inspect_err(|_| {
            self.audit.emit(
                "SESSION",
                AuditLevel::Routine,
                "Session close refused: no session is open",
            );
        })?;

        if let Some(forced) = &closed.forced {
            self.audit.emit(
                "VOTE",
                AuditLevel::Milestone,
                &format!(
                    "Roll call {} force-closed on session close: {} - {}",
                    forced.round_number, forced.state, forced.summary
                ),
            );
        }

        let view = SessionView::from(&closed.session);
        info!(session = view.number, "session closed");
        self.audit.emit(
            "SESSION",
            AuditLevel::Milestone,
            &format!(
                "Session {} closed (opened {}, closed {})",
                view.number,
                view.opened_at.format("%Y-%m-%d %H:%M:%S"),
                view.closed_at
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "?".to_string()),
            ),
        );
        Ok(view)
    }

    /// The current session, if one is open. Pure read.
    pub fn current(&self) -> Option<SessionView> {
        lock_state(&self.state).session().map(SessionView::from)
    }

    pub fn present_count(&self) -> usize {
        lock_state(&self.state).present_count()
    }

    pub fn total_count(&self) -> usize {
        lock_state(&self.state).total_count()
    }

    // ------------------------------------------------------------------
    // Floor queue
    // ------------------------------------------------------------------

    /// Toggle a member's floor request: queue them if absent from the
    /// queue, withdraw them if queued. Toggling is the only operation;
    /// there is no separate cancel.
    pub fn toggle_floor_request(&self, member_id: &str) -> Result<FloorToggle, DomainError> {
        let (toggle, label) = lock_state(&self.state).toggle_floor(member_id)?;
        let message = match toggle {
            FloorToggle::Requested => format!("{} requested the floor", label),
            FloorToggle::Withdrawn => format!("{} withdrew their floor request", label),
        };
        self.audit.emit("FLOOR", AuditLevel::Routine, &message);
        Ok(toggle)
    }

    /// Grant the floor to the head of the queue; clears the holder when
    /// the queue is empty.
    pub fn grant_floor(&self) -> Result<Option<MemberView>, DomainError> {
        let granted = lock_state(&self.state).grant_floor()?;
        match &granted {
            Some(member) => self.audit.emit(
                "FLOOR",
                AuditLevel::Routine,
                &format!("Floor granted to {}", member.short_label()),
            ),
            None => {
                debug!("floor grant with empty queue");
                self.audit
                    .emit("FLOOR", AuditLevel::Routine, "Floor queue empty, holder cleared");
            }
        }
        Ok(granted)
    }

    /// Revoke the floor unconditionally.
    pub fn revoke_floor(&self) -> Result<(), DomainError> {
        lock_state(&self.state).revoke_floor()?;
        self.audit.emit("FLOOR", AuditLevel::Routine, "Floor revoked");
        Ok(())
    }
}
