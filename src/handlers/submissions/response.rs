//! Submission response DTOs

use serde::Serialize;
use uuid::Uuid;

use crate::models::{Submission, SubmissionResult, SubmissionStatus};

/// Returned when a submission is accepted for judging
#[derive(Debug, Serialize)]
pub struct CreateSubmissionResponse {
    pub submission_id: Uuid,
    pub status: SubmissionStatus,
}

/// A submission with its per-test-case results
#[derive(Debug, Serialize)]
pub struct SubmissionDetailResponse {
    #[serde(flatten)]
    pub submission: Submission,
    pub results: Vec<SubmissionResult>,
}

/// Submission listing
#[derive(Debug, Serialize)]
pub struct SubmissionsListResponse {
    pub submissions: Vec<Submission>,
    pub total: usize,
}

impl From<Vec<Submission>> for SubmissionsListResponse {
    fn from(submissions: Vec<Submission>) -> Self {
        Self {
            total: submissions.len(),
            submissions,
        }
    }
}
