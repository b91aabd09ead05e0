//! Payloads pushed to live listeners

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    models::{SubmissionResult, SubmissionStatus},
    utils::time::seconds_to_millis,
};

/// Status update for one submission.
///
/// While judging, `test_cases` is empty and `score` absent. The terminal
/// update carries the final status, score and ordered verdicts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionUpdate {
    pub submission_id: Uuid,
    pub final_status: SubmissionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,
    pub test_cases: Vec<TestCaseUpdate>,
}

impl SubmissionUpdate {
    /// Sent when the judge stage picks a submission up
    pub fn judging(submission_id: Uuid) -> Self {
        Self {
            submission_id,
            final_status: SubmissionStatus::Judging,
            score: None,
            test_cases: Vec::new(),
        }
    }

    /// Sent once the final verdict is persisted
    pub fn finished(
        submission_id: Uuid,
        status: SubmissionStatus,
        score: i32,
        results: &[SubmissionResult],
    ) -> Self {
        Self {
            submission_id,
            final_status: status,
            score: Some(score),
            test_cases: results.iter().map(TestCaseUpdate::from).collect(),
        }
    }
}

/// Verdict of one test case as shown to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseUpdate {
    pub number: i32,
    pub verdict: SubmissionStatus,
    pub input: String,
    pub expected_output: String,
    pub actual_output: String,
    pub time_ms: i64,
    pub memory_kb: i32,
}

impl From<&SubmissionResult> for TestCaseUpdate {
    fn from(result: &SubmissionResult) -> Self {
        Self {
            number: result.testcase_number,
            verdict: result.status,
            input: result.input.clone(),
            expected_output: result.expected_output.clone(),
            actual_output: result.actual_output.clone(),
            time_ms: seconds_to_millis(result.time_seconds),
            memory_kb: result.memory_kb,
        }
    }
}
