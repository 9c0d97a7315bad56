//! Shared chamber state
//!
//! [`ChamberState`] is the single mutable aggregate behind the services:
//! the current session (if any), the pointer to the roll call in progress,
//! and the id sequence. Services wrap it in an `Arc<Mutex<_>>` and hold the
//! lock for exactly one logical operation, which makes every transition
//! atomic and lets concurrent exclusive mutations (two simultaneous session
//! opens, two roll-call opens) resolve deterministically to one success.
//!
//! Methods validate before mutating, so a failed call never leaves the
//! aggregate half-changed.

use plenum_domain::{
    Ballot, BallotValue, DomainError, FloorToggle, Member, MemberView, RollCall, RollCallState,
    SequenceGenerator, Session,
};
use std::sync::{Arc, Mutex, MutexGuard};

/// Handle shared by all services.
pub type SharedState = Arc<Mutex<ChamberState>>;

/// Take the state lock, recovering from poisoning.
///
/// A poisoned lock means a panic in a previous critical section; the
/// aggregate validates before mutating, so the state is still consistent
/// and the sitting can continue.
pub fn lock_state(state: &SharedState) -> MutexGuard<'_, ChamberState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Outcome of closing a roll call, kept as owned data so audit lines can be
/// written after the lock is released.
#[derive(Debug, Clone)]
pub struct ClosedRound {
    pub state: RollCallState,
    /// Tally summary, e.g. `"5 of 7 ballots - 3 positive, ..."`
    pub summary: String,
    /// The round landed on `Tied` and stays current pending a tie-break
    pub tie_pending: bool,
}

#[derive(Debug, Clone)]
pub struct CastOutcome {
    pub round_number: u32,
    pub member_label: String,
    pub value: BallotValue,
    /// Present when the cast auto-closed the round
    pub closed: Option<ClosedRound>,
}

#[derive(Debug, Clone)]
pub struct PresenceOutcome {
    pub member_label: String,
    pub present: bool,
    /// Present when the presence flip auto-closed the round
    pub closed: Option<ClosedRound>,
}

#[derive(Debug, Clone)]
pub struct ForceCloseOutcome {
    pub round_number: u32,
    pub state: RollCallState,
    pub summary: String,
    /// Labels of present members who had not voted, for the audit trail
    pub non_voters: Vec<String>,
}

#[derive(Debug)]
pub struct ClosedSession {
    pub session: Session,
    /// Set when closing the session force-closed an in-progress roll call
    pub forced: Option<ForceCloseOutcome>,
}

/// The single source of truth for "is there an open session" and "is there
/// an open roll call".
#[derive(Debug, Default)]
pub struct ChamberState {
    session: Option<Session>,
    /// Index into the session's roll-call history; stays set while the
    /// round is `InProgress` or `Tied` (awaiting tie-break)
    current_roll_call: Option<usize>,
    seq: SequenceGenerator,
}

impl ChamberState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedState {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    fn require_session(&self) -> Result<&Session, DomainError> {
        self.session.as_ref().ok_or(DomainError::NoOpenSession)
    }

    fn require_session_mut(&mut self) -> Result<&mut Session, DomainError> {
        self.session.as_mut().ok_or(DomainError::NoOpenSession)
    }

    /// The current roll call, if one is `InProgress` or `Tied`.
    pub fn current_round(&self) -> Option<&RollCall> {
        let idx = self.current_roll_call?;
        self.session.as_ref()?.roll_calls.get(idx)
    }

    fn round_in_progress(&self) -> bool {
        self.current_round().is_some_and(RollCall::is_in_progress)
    }

    /// Drop the current pointer once the round reached a state that no
    /// longer accepts input (anything but `InProgress` and `Tied`).
    fn sync_current_round(&mut self) {
        if let Some(round) = self.current_round() {
            if !round.is_in_progress() && round.state != RollCallState::Tied {
                self.current_roll_call = None;
            }
        }
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// Install a new session from a loaded roster.
    pub fn open_session(
        &mut self,
        number: u32,
        members: Vec<Member>,
        quorum: usize,
    ) -> Result<&Session, DomainError> {
        if self.session.is_some() {
            return Err(DomainError::AlreadyOpen);
        }
        if members.is_empty() {
            return Err(DomainError::EmptyRoster);
        }
        Ok(self.session.insert(Session::open(number, members, quorum)))
    }

    /// Close the current session, force-closing an `InProgress` roll call
    /// first. A `Tied` round is left tied in the history; its unresolved
    /// state is the record of the sitting.
    pub fn close_session(&mut self) -> Result<ClosedSession, DomainError> {
        self.require_session()?;

        let forced = if self.round_in_progress() {
            Some(self.force_close_roll_call()?)
        } else {
            self.current_roll_call = None;
            None
        };

        // Guarded above; the option is still set
        let mut session = self.session.take().ok_or(DomainError::NoOpenSession)?;
        session.close();
        Ok(ClosedSession { session, forced })
    }

    pub fn present_count(&self) -> usize {
        self.session.as_ref().map_or(0, Session::present_count)
    }

    pub fn total_count(&self) -> usize {
        self.session.as_ref().map_or(0, Session::total_count)
    }

    // ------------------------------------------------------------------
    // Roll-call lifecycle
    // ------------------------------------------------------------------

    /// Open a new roll call in the current session.
    pub fn open_roll_call(
        &mut self,
        number: u32,
        kind: &str,
        topic: &str,
        over_present: bool,
        special_majority: f64,
    ) -> Result<&RollCall, DomainError> {
        let session = self.session.as_ref().ok_or(DomainError::NoOpenSession)?;

        let present = session.present_count();
        if present < session.quorum {
            return Err(DomainError::QuorumNotMet {
                present,
                quorum: session.quorum,
            });
        }
        if self.round_in_progress() {
            return Err(DomainError::RollCallAlreadyOpen);
        }

        let id = self.seq.next_id();
        let round = RollCall::open(id, number, kind, topic, over_present, special_majority);

        let session = self.require_session_mut()?;
        session.roll_calls.push(round);
        let idx = session.roll_calls.len() - 1;
        self.current_roll_call = Some(idx);

        self.current_round().ok_or(DomainError::NoOpenRollCall)
    }

    /// Cast a member's ballot in the current roll call.
    ///
    /// Auto-closes the round once every present member has voted; the round
    /// stays current only when the close landed on `Tied`.
    pub fn cast_ballot(
        &mut self,
        member_id: &str,
        value: BallotValue,
    ) -> Result<CastOutcome, DomainError> {
        let session = self.require_session()?;

        let member_label = session
            .member_by_id(member_id)
            .ok_or_else(|| DomainError::UnknownMember(member_id.to_string()))?
            .short_label();
        if !self.round_in_progress() {
            return Err(DomainError::NoOpenRollCall);
        }

        let ballot_id = self.seq.next_id();
        let idx = self.current_roll_call.ok_or(DomainError::NoOpenRollCall)?;
        let session = self.require_session_mut()?;
        let attendance = session.attendance();
        let total = session.total_count();
        let round = session
            .roll_calls
            .get_mut(idx)
            .ok_or(DomainError::NoOpenRollCall)?;

        round.cast(Ballot::new(ballot_id, member_id, value), &attendance)?;

        let round_number = round.number;
        let closed = (!round.is_in_progress()).then(|| ClosedRound {
            state: round.state,
            summary: round.tally_line(total),
            tie_pending: round.state == RollCallState::Tied,
        });
        self.sync_current_round();

        Ok(CastOutcome {
            round_number,
            member_label,
            value,
            closed,
        })
    }

    /// Force the current roll call closed through the ordinary decision
    /// policy, recording which present members had not voted.
    pub fn force_close_roll_call(&mut self) -> Result<ForceCloseOutcome, DomainError> {
        self.require_session()?;
        if !self.round_in_progress() {
            return Err(DomainError::NoOpenRollCall);
        }

        let idx = self.current_roll_call.ok_or(DomainError::NoOpenRollCall)?;
        let session = self.require_session_mut()?;
        let attendance = session.attendance();
        let total = session.total_count();

        let non_voters: Vec<String> = {
            let round = session
                .roll_calls
                .get(idx)
                .ok_or(DomainError::NoOpenRollCall)?;
            let voted = round.voted_ids();
            session
                .members
                .iter()
                .filter(|m| m.present && !voted.contains(m.national_id.as_str()))
                .map(Member::short_label)
                .collect()
        };

        let round = session
            .roll_calls
            .get_mut(idx)
            .ok_or(DomainError::NoOpenRollCall)?;
        let state = round.close(&attendance)?;
        let outcome = ForceCloseOutcome {
            round_number: round.number,
            state,
            summary: round.tally_line(total),
            non_voters,
        };

        // A forced close clears the pointer even on a tie; the operator
        // chose to end the round.
        self.current_roll_call = None;
        Ok(outcome)
    }

    /// Resolve a tied roll call with a tie-break ballot.
    pub fn tie_break(&mut self, value: BallotValue) -> Result<ForceCloseOutcome, DomainError> {
        self.require_session()?;

        let tied = self
            .current_round()
            .is_some_and(|r| r.state == RollCallState::Tied);
        if !tied {
            return Err(DomainError::NoTieToBreak);
        }

        let ballot_id = self.seq.next_id();
        let idx = self.current_roll_call.ok_or(DomainError::NoTieToBreak)?;
        let session = self.require_session_mut()?;
        let total = session.total_count();
        let round = session
            .roll_calls
            .get_mut(idx)
            .ok_or(DomainError::NoTieToBreak)?;

        let state = round.break_tie(&Ballot::tie_break(ballot_id, value))?;
        let outcome = ForceCloseOutcome {
            round_number: round.number,
            state,
            summary: round.tally_line(total),
            non_voters: Vec::new(),
        };
        self.current_roll_call = None;
        Ok(outcome)
    }

    /// Re-run the auto-close check after a presence change.
    pub fn recalculate_on_presence_change(&mut self) -> Result<RollCallState, DomainError> {
        self.require_session()?;
        if !self.round_in_progress() {
            return Err(DomainError::NoOpenRollCall);
        }

        let idx = self.current_roll_call.ok_or(DomainError::NoOpenRollCall)?;
        let session = self.require_session_mut()?;
        let attendance = session.attendance();
        let round = session
            .roll_calls
            .get_mut(idx)
            .ok_or(DomainError::NoOpenRollCall)?;
        let state = round.recalculate(&attendance)?;
        self.sync_current_round();
        Ok(state)
    }

    // ------------------------------------------------------------------
    // Members, presence, floor
    // ------------------------------------------------------------------

    /// Flip a member's presence flag, re-checking the auto-close condition
    /// when a roll call is in progress.
    pub fn toggle_presence(&mut self, member_id: &str) -> Result<PresenceOutcome, DomainError> {
        let session = self.require_session_mut()?;
        let member = session
            .member_by_id_mut(member_id)
            .ok_or_else(|| DomainError::UnknownMember(member_id.to_string()))?;
        member.present = !member.present;
        let present = member.present;
        let member_label = member.short_label();

        let closed = if self.round_in_progress() {
            let total = self.total_count();
            let state = self.recalculate_on_presence_change()?;
            (state != RollCallState::InProgress).then(|| {
                let summary = self
                    .session()
                    .and_then(|s| s.roll_calls.last())
                    .map(|r| r.tally_line(total))
                    .unwrap_or_default();
                ClosedRound {
                    state,
                    summary,
                    tie_pending: state == RollCallState::Tied,
                }
            })
        } else {
            None
        };

        Ok(PresenceOutcome {
            member_label,
            present,
            closed,
        })
    }

    /// Toggle a member's floor request.
    pub fn toggle_floor(&mut self, member_id: &str) -> Result<(FloorToggle, String), DomainError> {
        let session = self.require_session_mut()?;
        let label = session
            .member_by_id(member_id)
            .ok_or_else(|| DomainError::UnknownMember(member_id.to_string()))?
            .short_label();
        Ok((session.floor.toggle(member_id), label))
    }

    /// Grant the floor to the head of the queue.
    pub fn grant_floor(&mut self) -> Result<Option<MemberView>, DomainError> {
        let session = self.require_session_mut()?;
        let granted = session.floor.grant().map(str::to_string);
        Ok(granted
            .as_deref()
            .and_then(|id| session.member_by_id(id))
            .map(MemberView::from))
    }

    /// Revoke the floor from whoever holds it.
    pub fn revoke_floor(&mut self) -> Result<(), DomainError> {
        self.require_session_mut()?.floor.revoke();
        Ok(())
    }

    /// Resolve the member assigned to a device.
    pub fn resolve_device(&self, device_id: &str) -> Result<MemberView, DomainError> {
        let session = self.require_session()?;
        session
            .member_by_device(device_id)
            .map(MemberView::from)
            .ok_or_else(|| DomainError::UnassignedDevice(device_id.to_string()))
    }
}
