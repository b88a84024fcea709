use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lifecycle of a submitted sequence.
///
/// The vocabulary is closed: `created`, `processing`, `step_N_completed`
/// (N in 1..=4), `analyzed`, `completed`. Statuses are ordered by [`rank`],
/// and persistence only ever moves a sequence forward along that order.
///
/// [`rank`]: SequenceStatus::rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SequenceStatus {
    #[default]
    Created,
    Processing,
    StepCompleted(u8),
    Analyzed,
    Completed,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown sequence status: {0}")]
pub struct StatusParseError(pub String);

impl SequenceStatus {
    pub const FIRST_RECORDED_STEP: u8 = 1;
    pub const LAST_RECORDED_STEP: u8 = 4;

    /// `step_N_completed` for a step that persists its own result.
    #[must_use]
    pub const fn step_completed(step: u8) -> Option<Self> {
        if step >= Self::FIRST_RECORDED_STEP && step <= Self::LAST_RECORDED_STEP {
            Some(Self::StepCompleted(step))
        } else {
            None
        }
    }

    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Created => 0,
            Self::Processing => 1,
            Self::StepCompleted(n) => 1 + n,
            Self::Analyzed => 6,
            Self::Completed => 7,
        }
    }

    /// Whether moving from `self` to `next` goes strictly forward.
    #[must_use]
    pub const fn can_promote_to(self, next: Self) -> bool {
        next.rank() > self.rank()
    }

    /// Analysis results are complete (final summary stored or later).
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Analyzed | Self::Completed)
    }
}

impl fmt::Display for SequenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => f.write_str("created"),
            Self::Processing => f.write_str("processing"),
            Self::StepCompleted(n) => write!(f, "step_{n}_completed"),
            Self::Analyzed => f.write_str("analyzed"),
            Self::Completed => f.write_str("completed"),
        }
    }
}

impl FromStr for SequenceStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "processing" => Ok(Self::Processing),
            "analyzed" => Ok(Self::Analyzed),
            "completed" => Ok(Self::Completed),
            other => other
                .strip_prefix("step_")
                .and_then(|rest| rest.strip_suffix("_completed"))
                .and_then(|n| n.parse::<u8>().ok())
                .and_then(Self::step_completed)
                .ok_or_else(|| StatusParseError(other.to_string())),
        }
    }
}

impl TryFrom<String> for SequenceStatus {
    type Error = StatusParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SequenceStatus> for String {
    fn from(status: SequenceStatus) -> Self {
        status.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_whole_vocabulary() {
        for text in [
            "created",
            "processing",
            "step_1_completed",
            "step_4_completed",
            "analyzed",
            "completed",
        ] {
            let status: SequenceStatus = text.parse().unwrap();
            assert_eq!(status.to_string(), text);
        }
    }

    #[test]
    fn rejects_unknown_statuses() {
        assert!("step_0_completed".parse::<SequenceStatus>().is_err());
        assert!("step_5_completed".parse::<SequenceStatus>().is_err());
        assert!("done".parse::<SequenceStatus>().is_err());
        assert!("step_x_completed".parse::<SequenceStatus>().is_err());
    }

    #[test]
    fn ranks_are_strictly_increasing() {
        let ordered = [
            SequenceStatus::Created,
            SequenceStatus::Processing,
            SequenceStatus::StepCompleted(1),
            SequenceStatus::StepCompleted(2),
            SequenceStatus::StepCompleted(3),
            SequenceStatus::StepCompleted(4),
            SequenceStatus::Analyzed,
            SequenceStatus::Completed,
        ];
        for pair in ordered.windows(2) {
            assert!(pair[0].can_promote_to(pair[1]));
            assert!(!pair[1].can_promote_to(pair[0]));
        }
        assert!(!SequenceStatus::Processing.can_promote_to(SequenceStatus::Processing));
    }

    #[test]
    fn serializes_as_text() {
        let json = serde_json::to_string(&SequenceStatus::StepCompleted(2)).unwrap();
        assert_eq!(json, "\"step_2_completed\"");
        let back: SequenceStatus = serde_json::from_str("\"analyzed\"").unwrap();
        assert_eq!(back, SequenceStatus::Analyzed);
    }
}
