//! Submission model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Submission status
///
/// `Judging` is the only non-terminal state. Every other variant is a final
/// verdict, either for a whole submission or for a single test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubmissionStatus {
    #[serde(rename = "Judging")]
    Judging,
    #[serde(rename = "Accepted")]
    Accepted,
    #[serde(rename = "Wrong Answer")]
    WrongAnswer,
    #[serde(rename = "Time Limit Exceeded")]
    TimeLimitExceeded,
    #[serde(rename = "Memory Limit Exceeded")]
    MemoryLimitExceeded,
    #[serde(rename = "Compile Error")]
    CompileError,
    #[serde(rename = "Runtime Error")]
    RuntimeError,
    #[serde(rename = "Internal Error")]
    InternalError,
}

impl SubmissionStatus {
    /// Get status as the string stored in the database and sent to clients
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Judging => "Judging",
            Self::Accepted => "Accepted",
            Self::WrongAnswer => "Wrong Answer",
            Self::TimeLimitExceeded => "Time Limit Exceeded",
            Self::MemoryLimitExceeded => "Memory Limit Exceeded",
            Self::CompileError => "Compile Error",
            Self::RuntimeError => "Runtime Error",
            Self::InternalError => "Internal Error",
        }
    }

    /// Check if this is a final verdict (judging complete)
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Judging)
    }

    /// Check if this verdict means the solution was accepted
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a stored status string is not part of the taxonomy
#[derive(Debug, thiserror::Error)]
#[error("unknown submission status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for SubmissionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Judging" => Ok(Self::Judging),
            "Accepted" => Ok(Self::Accepted),
            "Wrong Answer" => Ok(Self::WrongAnswer),
            "Time Limit Exceeded" => Ok(Self::TimeLimitExceeded),
            "Memory Limit Exceeded" => Ok(Self::MemoryLimitExceeded),
            "Compile Error" => Ok(Self::CompileError),
            "Runtime Error" => Ok(Self::RuntimeError),
            "Internal Error" => Ok(Self::InternalError),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for SubmissionStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Submission database model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub case_id: Uuid,
    pub user_id: Uuid,
    pub language_id: i32,
    #[sqlx(try_from = "String")]
    pub status: SubmissionStatus,
    #[serde(skip_serializing)]
    pub source_code_path: String,
    pub score: i32,
    pub contest_id: Option<Uuid>,
    pub class_transaction_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything intake needs to create a submission
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub source_code: String,
    pub language_id: i32,
    pub case_id: Uuid,
    pub user_id: Uuid,
    pub contest_id: Option<Uuid>,
    pub class_transaction_id: Option<Uuid>,
}

/// Outcome of one test case, keyed by (submission_id, testcase_number)
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub submission_id: Uuid,
    pub testcase_number: i32,
    #[sqlx(try_from = "String")]
    pub status: SubmissionStatus,
    pub time_seconds: f64,
    pub memory_kb: i32,
    pub input: String,
    pub expected_output: String,
    pub actual_output: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_string_round_trip() {
        for status in [
            SubmissionStatus::Judging,
            SubmissionStatus::Accepted,
            SubmissionStatus::WrongAnswer,
            SubmissionStatus::TimeLimitExceeded,
            SubmissionStatus::MemoryLimitExceeded,
            SubmissionStatus::CompileError,
            SubmissionStatus::RuntimeError,
            SubmissionStatus::InternalError,
        ] {
            assert_eq!(status.as_str().parse::<SubmissionStatus>().unwrap(), status);
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn test_unknown_status_rejected() {
        assert!("Pending".parse::<SubmissionStatus>().is_err());
        assert!(SubmissionStatus::try_from("accepted".to_string()).is_err());
    }

    #[test]
    fn test_only_judging_is_non_final() {
        assert!(!SubmissionStatus::Judging.is_final());
        assert!(SubmissionStatus::WrongAnswer.is_final());
        assert!(SubmissionStatus::InternalError.is_final());
    }
}
