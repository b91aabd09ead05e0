//! Leaderboard models (derived, never persisted)

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ContestCase;

/// Per-problem outcome shown on the leaderboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProblemStatus {
    /// No submission in the contest window
    #[serde(rename = "Unsolved")]
    Unsolved,
    /// Solved
    #[serde(rename = "AC")]
    Accepted,
    /// Attempted but never accepted
    #[serde(rename = "WA")]
    Attempted,
}

/// One participant's result for one problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    pub case_id: Uuid,
    /// The accepted submission, or the best wrong answer when unsolved
    pub submission_id: Option<Uuid>,
    pub status: ProblemStatus,
    pub score: i32,
    pub is_solved: bool,
    pub solve_time_minutes: i64,
    /// Attempts up to and including the accepted one (all attempts when unsolved)
    pub wrong_attempts: i64,
}

impl CaseResult {
    /// Result for a problem the participant never submitted to
    pub fn unsolved(case_id: Uuid) -> Self {
        Self {
            case_id,
            submission_id: None,
            status: ProblemStatus::Unsolved,
            score: 0,
            is_solved: false,
            solve_time_minutes: 0,
            wrong_attempts: 0,
        }
    }
}

/// One participant's standing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub user_id: Uuid,
    pub username: String,
    pub name: String,
    pub solved_count: i64,
    pub total_penalty: i64,
    /// Keyed by problem display code
    #[serde(rename = "case_results")]
    pub problem_results: BTreeMap<String, CaseResult>,
}

/// Standings of one class in one contest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leaderboard {
    pub problems: Vec<ContestCase>,
    pub rows: Vec<LeaderboardRow>,
}
