//! Port for the append-only audit trail.
//!
//! This is separate from `tracing`-based diagnostics: tracing carries
//! developer-facing messages, while the audit sink records the operator
//! record of the sitting: one human-readable line per event, fanned out to
//! verbosity-tiered destinations plus a bounded in-memory tail.

/// Verbosity level of an audit event.
///
/// A sink destination with threshold `t` receives every event whose level
/// is at least `t`, so `Detail` lines land only in the most verbose
/// destination and `Milestone` lines land everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AuditLevel {
    /// Raw event detail, e.g. every pulsation received
    Detail = 1,
    /// Routine operations: ballots, floor movements, rejected requests
    Routine = 2,
    /// Session and roll-call lifecycle milestones and results
    Milestone = 3,
}

impl AuditLevel {
    pub fn as_number(&self) -> u8 {
        *self as u8
    }
}

/// Port for recording audit events.
///
/// `emit` is intentionally synchronous and non-fallible: audit I/O must
/// never block or fail a user-facing operation, so implementations swallow
/// write errors (log-and-continue). Each event is recorded exactly once per
/// destination whose threshold it meets.
pub trait AuditSink: Send + Sync {
    /// Record one audit event.
    ///
    /// `tag` identifies the subsystem ("SESSION", "VOTE", "BALLOT",
    /// "FLOOR", "INPUT"); `message` is free text.
    fn emit(&self, tag: &str, level: AuditLevel, message: &str);

    /// Most recent audit lines, newest last.
    ///
    /// Served from a bounded in-memory ring; sinks without one return an
    /// empty list.
    fn tail(&self) -> Vec<String> {
        Vec::new()
    }
}

/// No-op implementation for tests and when auditing is disabled.
pub struct NoAuditSink;

impl AuditSink for NoAuditSink {
    fn emit(&self, _tag: &str, _level: AuditLevel, _message: &str) {}
}
