//! Contest repository
//!
//! Read-only access to the class/contest metadata and rosters owned by the
//! catalogue and roster services.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{ClassContest, ContestCase, Participant},
};

/// Contest and roster lookups needed by the leaderboard
#[async_trait]
pub trait ContestDirectory: Send + Sync {
    /// The assignment of a contest to a class, if any
    async fn find_class_contest(
        &self,
        class_transaction_id: Uuid,
        contest_id: Uuid,
    ) -> AppResult<Option<ClassContest>>;

    /// Problems of a contest ordered by display code
    async fn find_contest_cases(&self, contest_id: Uuid) -> AppResult<Vec<ContestCase>>;

    /// Students enrolled in a class, `None` when the class is unknown
    async fn find_roster(&self, class_transaction_id: Uuid) -> AppResult<Option<Vec<Participant>>>;
}

/// PostgreSQL-backed contest directory
#[derive(Clone)]
pub struct ContestRepository {
    pool: PgPool,
}

impl ContestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContestDirectory for ContestRepository {
    async fn find_class_contest(
        &self,
        class_transaction_id: Uuid,
        contest_id: Uuid,
    ) -> AppResult<Option<ClassContest>> {
        let class_contest = sqlx::query_as::<_, ClassContest>(
            r#"
            SELECT class_transaction_id, contest_id, start_time, end_time
            FROM class_contests
            WHERE class_transaction_id = $1 AND contest_id = $2
            "#,
        )
        .bind(class_transaction_id)
        .bind(contest_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(class_contest)
    }

    async fn find_contest_cases(&self, contest_id: Uuid) -> AppResult<Vec<ContestCase>> {
        let cases = sqlx::query_as::<_, ContestCase>(
            r#"
            SELECT contest_id, case_id, problem_code
            FROM contest_cases
            WHERE contest_id = $1
            ORDER BY problem_code ASC
            "#,
        )
        .bind(contest_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(cases)
    }

    async fn find_roster(&self, class_transaction_id: Uuid) -> AppResult<Option<Vec<Participant>>> {
        let class_exists: bool = sqlx::query_scalar(
            r#"SELECT EXISTS (SELECT 1 FROM class_contests WHERE class_transaction_id = $1)"#,
        )
        .bind(class_transaction_id)
        .fetch_one(&self.pool)
        .await?;

        let students = sqlx::query_as::<_, Participant>(
            r#"
            SELECT u.id AS user_id, u.username, u.name
            FROM class_students cs
            JOIN users u ON u.id = cs.user_id
            WHERE cs.class_transaction_id = $1
            ORDER BY u.username ASC
            "#,
        )
        .bind(class_transaction_id)
        .fetch_all(&self.pool)
        .await?;

        if students.is_empty() && !class_exists {
            return Ok(None);
        }

        Ok(Some(students))
    }
}
