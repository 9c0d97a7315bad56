//! Ballot types for roll-call votes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The value of a single ballot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BallotValue {
    Positive,
    Negative,
    Abstain,
}

impl fmt::Display for BallotValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BallotValue::Positive => "POSITIVE",
            BallotValue::Negative => "NEGATIVE",
            BallotValue::Abstain => "ABSTAIN",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for BallotValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "positive" | "pos" | "yes" => Ok(BallotValue::Positive),
            "negative" | "neg" | "no" => Ok(BallotValue::Negative),
            "abstain" => Ok(BallotValue::Abstain),
            _ => Err(format!(
                "Unknown ballot value: {}. Valid: positive, negative, abstain",
                s
            )),
        }
    }
}

/// One member's recorded choice within a roll call.
///
/// Immutable once created, never deleted. `member_id` is `None` only for an
/// unattributed tie-break ballot.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Ballot {
    pub id: u64,
    pub member_id: Option<String>,
    pub value: BallotValue,
    pub cast_at: DateTime<Utc>,
}

impl Ballot {
    /// Create a ballot attributed to a member, timestamped now.
    pub fn new(id: u64, member_id: impl Into<String>, value: BallotValue) -> Self {
        Self {
            id,
            member_id: Some(member_id.into()),
            value,
            cast_at: Utc::now(),
        }
    }

    /// Create an unattributed tie-break ballot.
    pub fn tie_break(id: u64, value: BallotValue) -> Self {
        Self {
            id,
            member_id: None,
            value,
            cast_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ballot_value() {
        assert_eq!("positive".parse::<BallotValue>(), Ok(BallotValue::Positive));
        assert_eq!("NEG".parse::<BallotValue>(), Ok(BallotValue::Negative));
        assert_eq!("abstain".parse::<BallotValue>(), Ok(BallotValue::Abstain));
        assert!("maybe".parse::<BallotValue>().is_err());
    }

    #[test]
    fn test_tie_break_ballot_has_no_member() {
        let ballot = Ballot::tie_break(9, BallotValue::Positive);
        assert!(ballot.member_id.is_none());
    }
}
