//! Session domain entities

use crate::floor::FloorQueue;
use crate::member::Member;
use crate::roll_call::RollCall;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Read-only attendance aggregates handed to the roll-call closing
/// algorithm.
///
/// Carries exactly what the decision policy needs (who is present, the
/// roster size, the quorum) so the roll call never holds a reference back
/// into the mutable session.
#[derive(Debug, Clone)]
pub struct Attendance {
    pub present_ids: BTreeSet<String>,
    pub total: usize,
    pub quorum: usize,
}

impl Attendance {
    pub fn present(&self) -> usize {
        self.present_ids.len()
    }
}

/// One sitting of the deliberative body.
///
/// Owns the roster snapshot taken at opening, the chronological roll-call
/// history and the floor queue. The "at most one open session" invariant is
/// enforced by the application layer, which holds the single current
/// session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Public session number, supplied by the operator
    pub number: u32,
    pub open: bool,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    /// Minimum present count required to conduct a roll call
    pub quorum: usize,
    pub members: Vec<Member>,
    pub roll_calls: Vec<RollCall>,
    pub floor: FloorQueue,
}

impl Session {
    pub fn open(number: u32, members: Vec<Member>, quorum: usize) -> Self {
        Self {
            number,
            open: true,
            opened_at: Utc::now(),
            closed_at: None,
            quorum,
            members,
            roll_calls: Vec::new(),
            floor: FloorQueue::new(),
        }
    }

    /// Close the session and fix the end timestamp. Idempotent.
    pub fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        self.closed_at = Some(Utc::now());
    }

    pub fn present_count(&self) -> usize {
        self.members.iter().filter(|m| m.present).count()
    }

    pub fn total_count(&self) -> usize {
        self.members.len()
    }

    /// Snapshot of the aggregates the roll-call closing algorithm needs.
    pub fn attendance(&self) -> Attendance {
        Attendance {
            present_ids: self
                .members
                .iter()
                .filter(|m| m.present)
                .map(|m| m.national_id.clone())
                .collect(),
            total: self.members.len(),
            quorum: self.quorum,
        }
    }

    pub fn member_by_id(&self, national_id: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.national_id == national_id)
    }

    pub fn member_by_id_mut(&mut self, national_id: &str) -> Option<&mut Member> {
        self.members
            .iter_mut()
            .find(|m| m.national_id == national_id)
    }

    /// Resolve the member assigned to a hardware device.
    pub fn member_by_device(&self, device_id: &str) -> Option<&Member> {
        self.members
            .iter()
            .find(|m| m.device_id.as_deref() == Some(device_id))
    }
}
