//! Council member entity

use serde::{Deserialize, Serialize};

/// A council member within one session's roster snapshot.
///
/// Members are created in bulk when a session opens and are never deleted
/// mid-session. `present` is the only field that mutates afterwards, flipped
/// by presence-toggle events from the member's vote-pad.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Member {
    /// Stable identifier (national ID)
    pub national_id: String,
    pub first_name: String,
    pub surname: String,
    /// Political-bloc label
    pub bloc: String,
    /// Seat number in the chamber
    pub seat: u32,
    /// Identifier of the assigned hardware vote-pad, if any
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub present: bool,
}

impl Member {
    /// Short display form used in audit lines, e.g. `"Ana Ruiz (seat 4)"`.
    pub fn short_label(&self) -> String {
        format!("{} {} (seat {})", self.first_name, self.surname, self.seat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_label() {
        let member = Member {
            national_id: "30111222".into(),
            first_name: "Ana".into(),
            surname: "Ruiz".into(),
            bloc: "North".into(),
            seat: 4,
            device_id: Some("dev04".into()),
            present: true,
        };
        assert_eq!(member.short_label(), "Ana Ruiz (seat 4)");
    }

    #[test]
    fn test_deserialize_defaults() {
        let member: Member = serde_json::from_str(
            r#"{"national_id":"1","first_name":"A","surname":"B","bloc":"X","seat":1}"#,
        )
        .unwrap();
        assert!(member.device_id.is_none());
        assert!(!member.present);
    }
}
