//! Floor (speaking-turn) queue

use serde::Serialize;
use std::collections::{HashSet, VecDeque};

/// Result of toggling a member's floor request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FloorToggle {
    /// The member was not queued and has been appended.
    Requested,
    /// The member was queued and has been removed.
    Withdrawn,
}

/// FIFO queue of members waiting for the floor, plus the current holder.
///
/// The queue is duplicate-free: a member id appears at most once at a time.
/// Requesting the floor is a toggle: a second request from a queued member
/// withdraws the first one. Membership is tracked in a side index so the
/// toggle test is O(1); queue order stays insertion order.
#[derive(Debug, Clone, Default)]
pub struct FloorQueue {
    queue: VecDeque<String>,
    queued: HashSet<String>,
    holder: Option<String>,
}

impl FloorQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle a member's floor request.
    pub fn toggle(&mut self, member_id: &str) -> FloorToggle {
        if self.queued.remove(member_id) {
            self.queue.retain(|id| id != member_id);
            FloorToggle::Withdrawn
        } else {
            self.queue.push_back(member_id.to_string());
            self.queued.insert(member_id.to_string());
            FloorToggle::Requested
        }
    }

    /// Pop the head of the queue into the holder slot.
    ///
    /// When the queue is empty the holder is cleared.
    pub fn grant(&mut self) -> Option<&str> {
        self.holder = self.queue.pop_front();
        if let Some(id) = &self.holder {
            self.queued.remove(id);
        }
        self.holder.as_deref()
    }

    /// Clear the holder unconditionally. Not an error if nobody holds it.
    pub fn revoke(&mut self) {
        self.holder = None;
    }

    pub fn holds(&self, member_id: &str) -> bool {
        self.holder.as_deref() == Some(member_id)
    }

    pub fn in_queue(&self, member_id: &str) -> bool {
        self.queued.contains(member_id)
    }

    pub fn holder(&self) -> Option<&str> {
        self.holder.as_deref()
    }

    pub fn queued_ids(&self) -> impl Iterator<Item = &str> {
        self.queue.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
