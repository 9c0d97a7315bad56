//! The roll-call round state machine
//!
//! A round opens `InProgress`, accumulates ballots (at most one per member),
//! and closes through a fixed decision policy: simple majority or a
//! configured special-majority fraction, with a quorum/turnout override to
//! `Inconclusive`. A simple-majority round can land on `Tied`, which stays
//! open until a tie-break ballot resolves it.
//!
//! Closing needs aggregates owned by the session (who is present, roster
//! size, quorum). Those are passed in explicitly as [`Attendance`] rather
//! than held as a back-reference.

use crate::core::error::DomainError;
use crate::roll_call::ballot::{Ballot, BallotValue};
use crate::session::entities::Attendance;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// State of a roll call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RollCallState {
    InProgress,
    Approved,
    Rejected,
    Tied,
    Inconclusive,
}

impl fmt::Display for RollCallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RollCallState::InProgress => "IN_PROGRESS",
            RollCallState::Approved => "APPROVED",
            RollCallState::Rejected => "REJECTED",
            RollCallState::Tied => "TIED",
            RollCallState::Inconclusive => "INCONCLUSIVE",
        };
        write!(f, "{}", s)
    }
}

/// One roll-call vote within a session.
#[derive(Debug, Clone)]
pub struct RollCall {
    /// Process-wide sequence id
    pub id: u64,
    /// Caller-supplied round number
    pub number: u32,
    /// Free-text kind, e.g. "ordinary"
    pub kind: String,
    /// Free-text topic under vote
    pub topic: String,
    /// Whether a special majority is computed over cast ballots rather than
    /// the full roster
    pub over_present: bool,
    /// Special-majority fraction; 0 means simple majority
    pub special_majority: f64,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub state: RollCallState,
    pub ballots: Vec<Ballot>,
}

impl RollCall {
    pub fn open(
        id: u64,
        number: u32,
        kind: impl Into<String>,
        topic: impl Into<String>,
        over_present: bool,
        special_majority: f64,
    ) -> Self {
        Self {
            id,
            number,
            kind: kind.into(),
            topic: topic.into(),
            over_present,
            special_majority,
            opened_at: Utc::now(),
            closed_at: None,
            state: RollCallState::InProgress,
            ballots: Vec::new(),
        }
    }

    pub fn is_in_progress(&self) -> bool {
        self.state == RollCallState::InProgress
    }

    /// Count ballots with the given value. Unattributed tie-break ballots
    /// are never stored, so this is the per-member tally.
    pub fn tally(&self, value: BallotValue) -> usize {
        self.ballots.iter().filter(|b| b.value == value).count()
    }

    /// Ids of the members who have voted so far.
    pub fn voted_ids(&self) -> BTreeSet<&str> {
        self.ballots
            .iter()
            .filter_map(|b| b.member_id.as_deref())
            .collect()
    }

    fn all_present_have_voted(&self, attendance: &Attendance) -> bool {
        let voted = self.voted_ids();
        attendance
            .present_ids
            .iter()
            .all(|id| voted.contains(id.as_str()))
    }

    /// Record a member's ballot.
    ///
    /// Fails with [`DomainError::RollCallNotInProgress`] on a closed round
    /// and [`DomainError::DuplicateBallot`] on a second ballot from the same
    /// member. After appending, the round closes automatically once every
    /// present member has voted.
    pub fn cast(&mut self, ballot: Ballot, attendance: &Attendance) -> Result<(), DomainError> {
        if !self.is_in_progress() {
            return Err(DomainError::RollCallNotInProgress);
        }

        if let Some(member_id) = &ballot.member_id {
            if self.voted_ids().contains(member_id.as_str()) {
                return Err(DomainError::DuplicateBallot(member_id.clone()));
            }
        }

        self.ballots.push(ballot);

        if self.all_present_have_voted(attendance) {
            self.close(attendance)?;
        }
        Ok(())
    }

    /// Close the round and decide its outcome.
    ///
    /// Decision policy, in order:
    /// 1. Simple majority (fraction 0): approved iff positive > negative,
    ///    tied iff positive == negative, otherwise rejected.
    /// 2. Special majority: the denominator is the cast-ballot count when
    ///    `over_present`, otherwise the roster size; approved iff
    ///    positive / denominator >= fraction, otherwise rejected. No tie is
    ///    possible on this branch.
    /// 3. Turnout override: fewer ballots than present members, fewer than
    ///    quorum, or zero ballots forces `Inconclusive`.
    pub fn close(&mut self, attendance: &Attendance) -> Result<RollCallState, DomainError> {
        if !self.is_in_progress() {
            return Err(DomainError::RollCallNotInProgress);
        }

        let positive = self.tally(BallotValue::Positive);
        let negative = self.tally(BallotValue::Negative);
        let cast = self.ballots.len();

        self.state = if self.special_majority == 0.0 {
            if positive == negative {
                RollCallState::Tied
            } else if positive > negative {
                RollCallState::Approved
            } else {
                RollCallState::Rejected
            }
        } else {
            let denominator = if self.over_present {
                cast
            } else {
                attendance.total
            };
            if denominator > 0 && positive as f64 / denominator as f64 >= self.special_majority {
                RollCallState::Approved
            } else {
                RollCallState::Rejected
            }
        };

        if cast < attendance.present() || cast < attendance.quorum || cast == 0 {
            self.state = RollCallState::Inconclusive;
        }

        self.closed_at = Some(Utc::now());
        Ok(self.state)
    }

    /// Resolve a tied round with a tie-break ballot.
    ///
    /// Only valid from `Tied`. The tie-break ballot decides the outcome but
    /// is not added to the member tally.
    pub fn break_tie(&mut self, ballot: &Ballot) -> Result<RollCallState, DomainError> {
        if self.state != RollCallState::Tied {
            return Err(DomainError::NoTieToBreak);
        }

        self.state = if ballot.value == BallotValue::Positive {
            RollCallState::Approved
        } else {
            RollCallState::Rejected
        };
        self.closed_at = Some(Utc::now());
        Ok(self.state)
    }

    /// Re-evaluate the auto-close condition after a presence flip.
    ///
    /// Closes the round when every (still) present member has voted; no-op
    /// otherwise.
    pub fn recalculate(&mut self, attendance: &Attendance) -> Result<RollCallState, DomainError> {
        if !self.is_in_progress() {
            return Err(DomainError::RollCallNotInProgress);
        }

        if self.all_present_have_voted(attendance) {
            self.close(attendance)
        } else {
            Ok(self.state)
        }
    }

    /// One-line tally summary for the audit log, e.g.
    /// `"5 of 7 ballots - 3 positive, 2 negative, 0 abstentions"`.
    pub fn tally_line(&self, total: usize) -> String {
        format!(
            "{} of {} ballots - {} positive, {} negative, {} abstentions",
            self.ballots.len(),
            total,
            self.tally(BallotValue::Positive),
            self.tally(BallotValue::Negative),
            self.tally(BallotValue::Abstain),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attendance(present: &[&str], total: usize, quorum: usize) -> Attendance {
        Attendance {
            present_ids: present.iter().map(|s| s.to_string()).collect(),
            total,
            quorum,
        }
    }

    fn cast_all(round: &mut RollCall, votes: &[(&str, BallotValue)], att: &Attendance) {
        for (i, (member, value)) in votes.iter().enumerate() {
            round
                .cast(Ballot::new(i as u64 + 1, *member, *value), att)
                .unwrap();
        }
    }

    fn simple_round() -> RollCall {
        RollCall::open(1, 1, "ordinary", "budget", false, 0.0)
    }

    #[test]
    fn test_simple_majority_approved() {
        // 3 positive / 2 negative over 5 present, quorum 3
        let att = attendance(&["a", "b", "c", "d", "e"], 5, 3);
        let mut round = simple_round();
        cast_all(
            &mut round,
            &[
                ("a", BallotValue::Positive),
                ("b", BallotValue::Positive),
                ("c", BallotValue::Positive),
                ("d", BallotValue::Negative),
                ("e", BallotValue::Negative),
            ],
            &att,
        );
        // Auto-closed: all present voted
        assert_eq!(round.state, RollCallState::Approved);
        assert!(round.closed_at.is_some());
    }

    #[test]
    fn test_simple_majority_tied() {
        let att = attendance(&["a", "b", "c", "d"], 5, 3);
        let mut round = simple_round();
        cast_all(
            &mut round,
            &[
                ("a", BallotValue::Positive),
                ("b", BallotValue::Positive),
                ("c", BallotValue::Negative),
                ("d", BallotValue::Negative),
            ],
            &att,
        );
        assert_eq!(round.state, RollCallState::Tied);
    }

    #[test]
    fn test_simple_majority_rejected() {
        let att = attendance(&["a", "b", "c", "d", "e"], 5, 3);
        let mut round = simple_round();
        cast_all(
            &mut round,
            &[
                ("a", BallotValue::Positive),
                ("b", BallotValue::Negative),
                ("c", BallotValue::Negative),
                ("d", BallotValue::Negative),
                ("e", BallotValue::Negative),
            ],
            &att,
        );
        assert_eq!(round.state, RollCallState::Rejected);
    }

    #[test]
    fn test_special_majority_over_present() {
        // Fraction 0.66 over cast ballots: 3/5 = 0.6 falls short
        let att = attendance(&["a", "b", "c", "d", "e"], 5, 3);
        let mut round = RollCall::open(1, 1, "special", "charter change", true, 0.66);
        cast_all(
            &mut round,
            &[
                ("a", BallotValue::Positive),
                ("b", BallotValue::Positive),
                ("c", BallotValue::Positive),
                ("d", BallotValue::Negative),
                ("e", BallotValue::Negative),
            ],
            &att,
        );
        assert_eq!(round.state, RollCallState::Rejected);

        // 4/5 = 0.8 clears it
        let mut round = RollCall::open(2, 2, "special", "charter change", true, 0.66);
        cast_all(
            &mut round,
            &[
                ("a", BallotValue::Positive),
                ("b", BallotValue::Positive),
                ("c", BallotValue::Positive),
                ("d", BallotValue::Positive),
                ("e", BallotValue::Negative),
            ],
            &att,
        );
        assert_eq!(round.state, RollCallState::Approved);
    }

    #[test]
    fn test_special_majority_over_roster() {
        // 4 positive over a roster of 8 with fraction 0.5: 4/8 >= 0.5
        let att = attendance(&["a", "b", "c", "d"], 8, 3);
        let mut round = RollCall::open(1, 1, "special", "land use", false, 0.5);
        cast_all(
            &mut round,
            &[
                ("a", BallotValue::Positive),
                ("b", BallotValue::Positive),
                ("c", BallotValue::Positive),
                ("d", BallotValue::Positive),
            ],
            &att,
        );
        assert_eq!(round.state, RollCallState::Approved);
    }

    #[test]
    fn test_quorum_shortfall_forces_inconclusive() {
        // Only 2 ballots cast with quorum 3: result overridden
        let att = attendance(&["a", "b"], 5, 3);
        let mut round = simple_round();
        cast_all(
            &mut round,
            &[("a", BallotValue::Positive), ("b", BallotValue::Positive)],
            &att,
        );
        assert_eq!(round.state, RollCallState::Inconclusive);
    }

    #[test]
    fn test_zero_ballots_forced_close_is_inconclusive() {
        let att = attendance(&[], 5, 0);
        let mut round = simple_round();
        assert_eq!(round.close(&att).unwrap(), RollCallState::Inconclusive);
    }

    #[test]
    fn test_duplicate_ballot_rejected() {
        let att = attendance(&["a", "b", "c"], 5, 1);
        let mut round = simple_round();
        round
            .cast(Ballot::new(1, "a", BallotValue::Positive), &att)
            .unwrap();
        let err = round
            .cast(Ballot::new(2, "a", BallotValue::Negative), &att)
            .unwrap_err();
        assert_eq!(err, DomainError::DuplicateBallot("a".into()));
        assert_eq!(round.ballots.len(), 1);
    }

    #[test]
    fn test_cast_on_closed_round_fails() {
        let att = attendance(&["a"], 3, 1);
        let mut round = simple_round();
        round
            .cast(Ballot::new(1, "a", BallotValue::Positive), &att)
            .unwrap();
        assert!(!round.is_in_progress());

        let err = round
            .cast(Ballot::new(2, "b", BallotValue::Positive), &att)
            .unwrap_err();
        assert_eq!(err, DomainError::RollCallNotInProgress);
    }

    #[test]
    fn test_tie_break_resolves_and_becomes_immutable() {
        let att = attendance(&["a", "b"], 4, 2);
        let mut round = simple_round();
        cast_all(
            &mut round,
            &[("a", BallotValue::Positive), ("b", BallotValue::Negative)],
            &att,
        );
        assert_eq!(round.state, RollCallState::Tied);

        let state = round
            .break_tie(&Ballot::tie_break(9, BallotValue::Positive))
            .unwrap();
        assert_eq!(state, RollCallState::Approved);
        // Tie-break ballot is not part of the member tally
        assert_eq!(round.ballots.len(), 2);

        let err = round
            .break_tie(&Ballot::tie_break(10, BallotValue::Negative))
            .unwrap_err();
        assert_eq!(err, DomainError::NoTieToBreak);
        assert_eq!(round.state, RollCallState::Approved);
    }

    #[test]
    fn test_tie_break_negative_rejects() {
        let att = attendance(&["a", "b"], 4, 2);
        let mut round = simple_round();
        cast_all(
            &mut round,
            &[("a", BallotValue::Positive), ("b", BallotValue::Negative)],
            &att,
        );
        let state = round
            .break_tie(&Ballot::tie_break(9, BallotValue::Abstain))
            .unwrap();
        // Anything but positive rejects
        assert_eq!(state, RollCallState::Rejected);
    }

    #[test]
    fn test_tie_break_from_inconclusive_fails() {
        let att = attendance(&["a", "b", "c"], 5, 3);
        let mut round = simple_round();
        round
            .cast(Ballot::new(1, "a", BallotValue::Positive), &att)
            .unwrap();
        round.close(&att).unwrap();
        assert_eq!(round.state, RollCallState::Inconclusive);
        assert!(round
            .break_tie(&Ballot::tie_break(9, BallotValue::Positive))
            .is_err());
    }

    #[test]
    fn test_recalculate_closes_after_presence_drop() {
        let att = attendance(&["a", "b", "c"], 3, 1);
        let mut round = simple_round();
        cast_all(
            &mut round,
            &[("a", BallotValue::Positive), ("b", BallotValue::Positive)],
            &att,
        );
        assert!(round.is_in_progress());

        // "c" leaves the chamber; everyone still present has voted
        let att = attendance(&["a", "b"], 3, 1);
        let state = round.recalculate(&att).unwrap();
        assert_eq!(state, RollCallState::Approved);
    }

    #[test]
    fn test_recalculate_is_noop_while_votes_missing() {
        let att = attendance(&["a", "b"], 3, 1);
        let mut round = simple_round();
        round
            .cast(Ballot::new(1, "a", BallotValue::Positive), &att)
            .unwrap();
        assert_eq!(round.recalculate(&att).unwrap(), RollCallState::InProgress);
    }

    #[test]
    fn test_tally_line() {
        let att = attendance(&["a", "b", "c", "d", "e"], 7, 1);
        let mut round = simple_round();
        cast_all(
            &mut round,
            &[
                ("a", BallotValue::Positive),
                ("b", BallotValue::Negative),
                ("c", BallotValue::Abstain),
            ],
            &att,
        );
        assert_eq!(
            round.tally_line(7),
            "3 of 7 ballots - 1 positive, 1 negative, 1 abstentions"
        );
    }
}
