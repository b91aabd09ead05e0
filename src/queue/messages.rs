//! Queue message types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{SubmissionResult, SubmissionStatus};

/// Intake -> judge stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeRequest {
    pub submission_id: Uuid,
}

/// Judge stage -> result stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeResultMessage {
    pub submission_id: Uuid,
    pub final_status: SubmissionStatus,
    /// Advisory; the result stage recomputes the persisted score
    pub score: i32,
    /// Results in test-case order, ending at the first failure
    pub results: Vec<SubmissionResult>,
}
