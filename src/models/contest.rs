//! Contest models consumed by the leaderboard

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A contest assigned to a class, with its own time window
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ClassContest {
    pub class_transaction_id: Uuid,
    pub contest_id: Uuid,
    /// Penalty clock origin
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// A problem in a contest with its display code ("A", "B", ...)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ContestCase {
    pub contest_id: Uuid,
    pub case_id: Uuid,
    pub problem_code: String,
}

/// A student enrolled in a class
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: Uuid,
    pub username: String,
    pub name: String,
}
