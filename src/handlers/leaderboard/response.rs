//! Leaderboard response DTOs

use serde::Serialize;
use uuid::Uuid;

use crate::models::{ContestCase, LeaderboardRow};

/// A problem column of the leaderboard
#[derive(Debug, Serialize)]
pub struct ProblemColumn {
    pub case_id: Uuid,
    pub problem_code: String,
}

impl From<ContestCase> for ProblemColumn {
    fn from(case: ContestCase) -> Self {
        Self {
            case_id: case.case_id,
            problem_code: case.problem_code,
        }
    }
}

/// Leaderboard response
#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub class_id: Uuid,
    pub contest_id: Uuid,
    pub problems: Vec<ProblemColumn>,
    pub rows: Vec<LeaderboardRow>,
}
