//! Pulsation processing
//!
//! Translates one decoded hardware event, a `(device id, key label)` pair
//! from a vote-pad, into exactly one domain action. The processor itself
//! is stateless; the whole key policy runs under a single acquisition of
//! the shared state lock, so concurrent pads cannot interleave half-applied
//! transitions.
//!
//! Key map (vote-pad layout):
//!
//! | key | action                                   |
//! |-----|------------------------------------------|
//! | `1` | vote POSITIVE                            |
//! | `2` | vote ABSTAIN                             |
//! | `3` | vote NEGATIVE                            |
//! | `7` | toggle own presence                      |
//! | `9` | request/withdraw floor (revoke if held)  |

use crate::ports::audit::{AuditLevel, AuditSink};
use crate::state::{lock_state, ChamberState, SharedState};
use plenum_domain::{BallotValue, DomainError, MemberView, RollCallState};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Key labels the vote-pads produce.
pub const KEY_VOTE_POSITIVE: &str = "1";
pub const KEY_VOTE_ABSTAIN: &str = "2";
pub const KEY_VOTE_NEGATIVE: &str = "3";
pub const KEY_PRESENCE: &str = "7";
pub const KEY_FLOOR: &str = "9";

/// The domain action a pulsation resolved to.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PulsationAction {
    PresenceToggled {
        present: bool,
        /// Set when the presence flip auto-closed the running roll call
        round_closed: Option<RollCallState>,
    },
    FloorRequested,
    FloorWithdrawn,
    FloorRevoked,
    BallotCast {
        value: BallotValue,
        round_state: RollCallState,
    },
}

/// Accepted pulsation: the resolved member and the action taken.
#[derive(Debug, Clone, Serialize)]
pub struct PulsationResult {
    pub device: String,
    pub key: String,
    pub member: MemberView,
    pub action: PulsationAction,
}

/// Stateless translator from pulsations to domain actions.
pub struct PulsationProcessor {
    state: SharedState,
    audit: Arc<dyn AuditSink>,
}

impl PulsationProcessor {
    pub fn new(state: SharedState, audit: Arc<dyn AuditSink>) -> Self {
        Self { state, audit }
    }

    /// Process one pulsation.
    ///
    /// The raw event is audited before any validation. Rejections come back
    /// as the typed [`DomainError`] so callers can render them; every
    /// branch, accepted or not, leaves a descriptive audit line.
    pub fn process(&self, device_id: &str, key: &str) -> Result<PulsationResult, DomainError> {
        self.audit.emit(
            "INPUT",
            AuditLevel::Detail,
            &format!("Pulsation received: device {} key {}", device_id, key),
        );
        debug!(device = device_id, key, "pulsation received");

        let outcome = {
            let mut state = lock_state(&self.state);
            self.dispatch(&mut state, device_id, key)
        };

        match &outcome {
            Ok(result) => self.audit.emit(
                "INPUT",
                AuditLevel::Routine,
                &format!(
                    "Pulsation accepted: {} key {} -> {}",
                    result.member.short_label(),
                    key,
                    describe(&result.action)
                ),
            ),
            Err(e) => self.audit.emit(
                "INPUT",
                AuditLevel::Routine,
                &format!(
                    "Pulsation rejected ({}): device {} key {}",
                    e.code(),
                    device_id,
                    key
                ),
            ),
        }
        outcome
    }

    /// The key policy proper. Runs with the state lock held.
    fn dispatch(
        &self,
        state: &mut ChamberState,
        device_id: &str,
        key: &str,
    ) -> Result<PulsationResult, DomainError> {
        if state.session().is_none() {
            return Err(DomainError::NoOpenSession);
        }
        let member = state.resolve_device(device_id)?;

        let action = match key {
            // Presence toggle is always accepted for a resolved member,
            // whatever the rest of the state looks like.
            KEY_PRESENCE => {
                let outcome = state.toggle_presence(&member.national_id)?;
                PulsationAction::PresenceToggled {
                    present: outcome.present,
                    round_closed: outcome.closed.map(|c| c.state),
                }
            }
            KEY_FLOOR => {
                if !member.present {
                    return Err(DomainError::MemberAbsent(member.short_label()));
                }
                if state
                    .session()
                    .is_some_and(|s| s.floor.holds(&member.national_id))
                {
                    state.revoke_floor()?;
                    PulsationAction::FloorRevoked
                } else {
                    let (toggle, _) = state.toggle_floor(&member.national_id)?;
                    match toggle {
                        plenum_domain::FloorToggle::Requested => PulsationAction::FloorRequested,
                        plenum_domain::FloorToggle::Withdrawn => PulsationAction::FloorWithdrawn,
                    }
                }
            }
            KEY_VOTE_POSITIVE | KEY_VOTE_ABSTAIN | KEY_VOTE_NEGATIVE => {
                let value = match key {
                    KEY_VOTE_POSITIVE => BallotValue::Positive,
                    KEY_VOTE_NEGATIVE => BallotValue::Negative,
                    _ => BallotValue::Abstain,
                };
                if state.current_round().is_none_or(|r| !r.is_in_progress()) {
                    return Err(DomainError::NoOpenRollCall);
                }
                if !member.present {
                    return Err(DomainError::MemberAbsent(member.short_label()));
                }
                let outcome = state.cast_ballot(&member.national_id, value)?;
                let round_state = outcome
                    .closed
                    .as_ref()
                    .map(|c| c.state)
                    .unwrap_or(RollCallState::InProgress);
                PulsationAction::BallotCast { value, round_state }
            }
            _ => return Err(DomainError::UnsupportedKey(key.to_string())),
        };

        // Snapshot taken after the action, so a presence toggle is visible
        // in the returned member as well
        let member = state.resolve_device(device_id)?;
        Ok(PulsationResult {
            device: device_id.to_string(),
            key: key.to_string(),
            member,
            action,
        })
    }
}

fn describe(action: &PulsationAction) -> String {
    match action {
        PulsationAction::PresenceToggled { present: true, .. } => "now present".to_string(),
        PulsationAction::PresenceToggled { present: false, .. } => "now absent".to_string(),
        PulsationAction::FloorRequested => "floor requested".to_string(),
        PulsationAction::FloorWithdrawn => "floor request withdrawn".to_string(),
        PulsationAction::FloorRevoked => "floor revoked".to_string(),
        PulsationAction::BallotCast { value, .. } => format!("voted {}", value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::audit::NoAuditSink;
    use plenum_domain::Member;
    use std::sync::Mutex;

    fn member(id: &str, present: bool, device: &str) -> Member {
        Member {
            national_id: id.into(),
            first_name: "M".into(),
            surname: id.to_uppercase(),
            bloc: "B".into(),
            seat: 1,
            device_id: Some(device.into()),
            present,
        }
    }

    fn processor_with_session() -> (PulsationProcessor, SharedState) {
        let state = ChamberState::shared();
        lock_state(&state)
            .open_session(
                1,
                vec![
                    member("a", true, "dev01"),
                    member("b", true, "dev02"),
                    member("c", false, "dev03"),
                ],
                2,
            )
            .unwrap();
        (
            PulsationProcessor::new(state.clone(), Arc::new(NoAuditSink)),
            state,
        )
    }

    /// Audit sink that records every line, for trail assertions.
    struct RecordingSink(Mutex<Vec<(String, u8, String)>>);

    impl AuditSink for RecordingSink {
        fn emit(&self, tag: &str, level: AuditLevel, message: &str) {
            self.0.lock().unwrap().push((
                tag.to_string(),
                level.as_number(),
                message.to_string(),
            ));
        }
    }

    #[test]
    fn test_rejected_without_session() {
        let processor = PulsationProcessor::new(ChamberState::shared(), Arc::new(NoAuditSink));
        assert_eq!(
            processor.process("dev01", "1").unwrap_err(),
            DomainError::NoOpenSession
        );
    }

    #[test]
    fn test_rejected_for_unassigned_device() {
        let (processor, _state) = processor_with_session();
        assert_eq!(
            processor.process("dev99", "1").unwrap_err(),
            DomainError::UnassignedDevice("dev99".into())
        );
    }

    #[test]
    fn test_presence_key_always_toggles() {
        let (processor, _state) = processor_with_session();

        // Absent member, no roll call open: still accepted
        let result = processor.process("dev03", KEY_PRESENCE).unwrap();
        assert_eq!(
            result.action,
            PulsationAction::PresenceToggled {
                present: true,
                round_closed: None
            }
        );
        let result = processor.process("dev03", KEY_PRESENCE).unwrap();
        assert_eq!(
            result.action,
            PulsationAction::PresenceToggled {
                present: false,
                round_closed: None
            }
        );
    }

    #[test]
    fn test_result_member_carries_post_toggle_presence() {
        let (processor, _state) = processor_with_session();

        // dev01's member starts present; the reply must show the new state
        let result = processor.process("dev01", KEY_PRESENCE).unwrap();
        assert!(!result.member.present);
        match result.action {
            PulsationAction::PresenceToggled { present, .. } => {
                assert_eq!(present, result.member.present);
            }
            other => panic!("unexpected action: {:?}", other),
        }

        let result = processor.process("dev01", KEY_PRESENCE).unwrap();
        assert!(result.member.present);
    }

    #[test]
    fn test_floor_key_toggles_and_revokes() {
        let (processor, state) = processor_with_session();

        let result = processor.process("dev01", KEY_FLOOR).unwrap();
        assert_eq!(result.action, PulsationAction::FloorRequested);
        let result = processor.process("dev01", KEY_FLOOR).unwrap();
        assert_eq!(result.action, PulsationAction::FloorWithdrawn);

        // Holder pressing the key gives the floor back
        processor.process("dev01", KEY_FLOOR).unwrap();
        lock_state(&state).grant_floor().unwrap();
        let result = processor.process("dev01", KEY_FLOOR).unwrap();
        assert_eq!(result.action, PulsationAction::FloorRevoked);
    }

    #[test]
    fn test_floor_key_requires_presence() {
        let (processor, _state) = processor_with_session();
        assert!(matches!(
            processor.process("dev03", KEY_FLOOR).unwrap_err(),
            DomainError::MemberAbsent(_)
        ));
    }

    #[test]
    fn test_vote_keys_require_open_round() {
        let (processor, _state) = processor_with_session();
        for key in ["1", "2", "3"] {
            assert_eq!(
                processor.process("dev01", key).unwrap_err(),
                DomainError::NoOpenRollCall
            );
        }
    }

    #[test]
    fn test_vote_keys_cast_and_auto_close() {
        let (processor, state) = processor_with_session();
        lock_state(&state)
            .open_roll_call(1, "ordinary", "t", false, 0.0)
            .unwrap();

        let result = processor.process("dev01", KEY_VOTE_POSITIVE).unwrap();
        assert_eq!(
            result.action,
            PulsationAction::BallotCast {
                value: BallotValue::Positive,
                round_state: RollCallState::InProgress
            }
        );

        // Duplicate from the same pad
        assert!(matches!(
            processor.process("dev01", KEY_VOTE_NEGATIVE).unwrap_err(),
            DomainError::DuplicateBallot(_)
        ));

        // Second present member completes the round
        let result = processor.process("dev02", KEY_VOTE_ABSTAIN).unwrap();
        assert_eq!(
            result.action,
            PulsationAction::BallotCast {
                value: BallotValue::Abstain,
                round_state: RollCallState::Approved
            }
        );
    }

    #[test]
    fn test_vote_key_requires_presence() {
        let (processor, state) = processor_with_session();
        lock_state(&state)
            .open_roll_call(1, "ordinary", "t", false, 0.0)
            .unwrap();
        assert!(matches!(
            processor.process("dev03", KEY_VOTE_POSITIVE).unwrap_err(),
            DomainError::MemberAbsent(_)
        ));
    }

    #[test]
    fn test_presence_toggle_closes_running_round() {
        let (processor, state) = processor_with_session();
        lock_state(&state)
            .open_roll_call(1, "ordinary", "t", false, 0.0)
            .unwrap();
        processor.process("dev01", KEY_VOTE_POSITIVE).unwrap();

        // dev02's member leaves; only voters remain present
        let result = processor.process("dev02", KEY_PRESENCE).unwrap();
        match result.action {
            PulsationAction::PresenceToggled {
                present,
                round_closed,
            } => {
                assert!(!present);
                // 1 ballot < quorum 2: closed but inconclusive
                assert_eq!(round_closed, Some(RollCallState::Inconclusive));
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_key() {
        let (processor, _state) = processor_with_session();
        assert_eq!(
            processor.process("dev01", "5").unwrap_err(),
            DomainError::UnsupportedKey("5".into())
        );
    }

    #[test]
    fn test_raw_audit_line_precedes_validation() {
        let sink = Arc::new(RecordingSink(Mutex::new(Vec::new())));
        let processor = PulsationProcessor::new(ChamberState::shared(), sink.clone());
        let _ = processor.process("dev01", "1");

        let lines = sink.0.lock().unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].2.starts_with("Pulsation received"));
        assert_eq!(lines[0].1, 1);
        assert!(lines[1].2.contains("no_open_session"));
    }

    #[test]
    fn test_concurrent_pads_serialize() {
        let state = ChamberState::shared();
        let roster: Vec<Member> = (0..8)
            .map(|i| member(&format!("m{}", i), true, &format!("dev{:02}", i)))
            .collect();
        lock_state(&state).open_session(1, roster, 1).unwrap();
        lock_state(&state)
            .open_roll_call(1, "ordinary", "t", false, 0.0)
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let state = state.clone();
            handles.push(std::thread::spawn(move || {
                PulsationProcessor::new(state, Arc::new(NoAuditSink))
                    .process(&format!("dev{:02}", i), KEY_VOTE_POSITIVE)
                    .is_ok()
            }));
        }
        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        // Every pad voted once; the last one closed the round
        assert_eq!(accepted, 8);

        let guard = lock_state(&state);
        let round = guard.session().unwrap().roll_calls.last().unwrap();
        assert_eq!(round.state, RollCallState::Approved);
        assert_eq!(round.ballots.len(), 8);
    }
}
