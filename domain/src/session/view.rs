//! Read-only projections of the session aggregate
//!
//! Views are what leaves the mutual-exclusion boundary: plain serializable
//! snapshots with the derived counts callers want, detached from the live
//! state.

use crate::member::Member;
use crate::roll_call::{BallotValue, RollCall, RollCallState};
use crate::session::entities::Session;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MemberView {
    pub national_id: String,
    pub first_name: String,
    pub surname: String,
    pub bloc: String,
    pub seat: u32,
    pub device_id: Option<String>,
    pub present: bool,
}

impl From<&Member> for MemberView {
    fn from(member: &Member) -> Self {
        Self {
            national_id: member.national_id.clone(),
            first_name: member.first_name.clone(),
            surname: member.surname.clone(),
            bloc: member.bloc.clone(),
            seat: member.seat,
            device_id: member.device_id.clone(),
            present: member.present,
        }
    }
}

impl MemberView {
    pub fn short_label(&self) -> String {
        format!("{} {} (seat {})", self.first_name, self.surname, self.seat)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BallotView {
    pub id: u64,
    /// `None` only for an unattributed tie-break ballot
    pub member_id: Option<String>,
    pub member_label: Option<String>,
    pub value: BallotValue,
    pub cast_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RollCallView {
    pub id: u64,
    pub number: u32,
    pub kind: String,
    pub topic: String,
    pub over_present: bool,
    pub special_majority: f64,
    pub state: RollCallState,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub positive: usize,
    pub negative: usize,
    pub abstain: usize,
    pub ballots: Vec<BallotView>,
}

impl RollCallView {
    /// Project a roll call, joining member labels from the session roster.
    pub fn project(roll_call: &RollCall, session: &Session) -> Self {
        let ballots = roll_call
            .ballots
            .iter()
            .map(|b| BallotView {
                id: b.id,
                member_id: b.member_id.clone(),
                member_label: b
                    .member_id
                    .as_deref()
                    .and_then(|id| session.member_by_id(id))
                    .map(Member::short_label),
                value: b.value,
                cast_at: b.cast_at,
            })
            .collect();

        Self {
            id: roll_call.id,
            number: roll_call.number,
            kind: roll_call.kind.clone(),
            topic: roll_call.topic.clone(),
            over_present: roll_call.over_present,
            special_majority: roll_call.special_majority,
            state: roll_call.state,
            opened_at: roll_call.opened_at,
            closed_at: roll_call.closed_at,
            positive: roll_call.tally(BallotValue::Positive),
            negative: roll_call.tally(BallotValue::Negative),
            abstain: roll_call.tally(BallotValue::Abstain),
            ballots,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub number: u32,
    pub open: bool,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub quorum: usize,
    pub present_count: usize,
    pub total_count: usize,
    pub members: Vec<MemberView>,
    pub roll_calls: Vec<RollCallView>,
    pub floor_queue: Vec<MemberView>,
    pub floor_holder: Option<MemberView>,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        let floor_queue = session
            .floor
            .queued_ids()
            .filter_map(|id| session.member_by_id(id))
            .map(MemberView::from)
            .collect();
        let floor_holder = session
            .floor
            .holder()
            .and_then(|id| session.member_by_id(id))
            .map(MemberView::from);

        Self {
            number: session.number,
            open: session.open,
            opened_at: session.opened_at,
            closed_at: session.closed_at,
            quorum: session.quorum,
            present_count: session.present_count(),
            total_count: session.total_count(),
            members: session.members.iter().map(MemberView::from).collect(),
            roll_calls: session
                .roll_calls
                .iter()
                .map(|rc| RollCallView::project(rc, session))
                .collect(),
            floor_queue,
            floor_holder,
        }
    }
}
