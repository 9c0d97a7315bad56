//! Monotonic id generation for roll calls and ballots

use serde::{Deserialize, Serialize};

/// Explicit sequence generator for in-memory entity ids.
///
/// Owned by the chamber state and shared by roll calls and ballots, so ids
/// are unique and monotonically increasing across the process lifetime.
/// Sequences restart at 1 on process start; nothing is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceGenerator {
    next: u64,
}

impl SequenceGenerator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Return the next id and advance the counter.
    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

impl Default for SequenceGenerator {
    fn default() -> Self {
        Self::new()
    }
}
